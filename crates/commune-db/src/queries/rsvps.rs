//! Event RSVP queries.
//!
//! RSVPs are insert-once under the natural key (tenant, event, user):
//! setting a new status overwrites the previous one in a single atomic
//! upsert backed by the unique index, so concurrent callers can never
//! produce duplicate rows and one tenant's upsert can never touch
//! another's row.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, EventId, Result, RsvpStatus, TenantId, UserId};

use crate::models::EventRsvp;

const COLS: &str = "id, tenant_id, event_id, user_id, status, created_at, updated_at";

/// Set (or overwrite) a user's RSVP status for an event.
///
/// Exactly one row exists per (tenant, event, user) triple afterwards; the
/// latest status wins. Returns the stored row.
pub fn set_rsvp(
    conn: &Connection,
    tenant: TenantId,
    event: EventId,
    user: UserId,
    status: RsvpStatus,
) -> Result<EventRsvp> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO event_rsvps (tenant_id, event_id, user_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(tenant_id, event_id, user_id) DO UPDATE SET
            status = excluded.status,
            updated_at = excluded.updated_at",
        rusqlite::params![
            tenant.as_i64(),
            event.as_i64(),
            user.as_i64(),
            status.to_string(),
            &now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    // Re-read to get the surviving row (id and created_at of the original).
    get_rsvp(conn, tenant, event, user)?
        .ok_or_else(|| Error::internal("rsvp row missing after upsert"))
}

/// Get the full RSVP row for a (event, user) pair.
pub fn get_rsvp(
    conn: &Connection,
    tenant: TenantId,
    event: EventId,
    user: UserId,
) -> Result<Option<EventRsvp>> {
    let q = format!(
        "SELECT {COLS} FROM event_rsvps
         WHERE tenant_id = ?1 AND event_id = ?2 AND user_id = ?3"
    );
    let result = conn.query_row(
        &q,
        rusqlite::params![tenant.as_i64(), event.as_i64(), user.as_i64()],
        EventRsvp::from_row,
    );

    match result {
        Ok(rsvp) => Ok(Some(rsvp)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user's RSVP status for an event, if any.
pub fn user_status(
    conn: &Connection,
    tenant: TenantId,
    event: EventId,
    user: UserId,
) -> Result<Option<RsvpStatus>> {
    Ok(get_rsvp(conn, tenant, event, user)?.map(|r| r.status))
}

/// Count RSVPs for an event with the given status. Computed live, never
/// cached.
pub fn count_by_status(
    conn: &Connection,
    tenant: TenantId,
    event: EventId,
    status: RsvpStatus,
) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM event_rsvps
         WHERE tenant_id = ?1 AND event_id = ?2 AND status = ?3",
        rusqlite::params![tenant.as_i64(), event.as_i64(), status.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Remove a user's RSVP for an event. Returns whether a row was deleted.
pub fn remove_rsvp(
    conn: &Connection,
    tenant: TenantId,
    event: EventId,
    user: UserId,
) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM event_rsvps
             WHERE tenant_id = ?1 AND event_id = ?2 AND user_id = ?3",
            rusqlite::params![tenant.as_i64(), event.as_i64(), user.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;

    const TENANT: TenantId = TenantId::new(1);

    #[test]
    fn test_set_rsvp_creates_row() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let rsvp = set_rsvp(&conn, TENANT, EventId::new(10), user.id, RsvpStatus::Going).unwrap();
        assert_eq!(rsvp.status, RsvpStatus::Going);
        assert_eq!(rsvp.event_id, EventId::new(10));
    }

    #[test]
    fn test_set_rsvp_overwrites_status() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let event = EventId::new(10);

        set_rsvp(&conn, TENANT, event, user.id, RsvpStatus::Going).unwrap();
        set_rsvp(&conn, TENANT, event, user.id, RsvpStatus::Declined).unwrap();

        // Latest status wins.
        let status = user_status(&conn, TENANT, event, user.id).unwrap();
        assert_eq!(status, Some(RsvpStatus::Declined));

        // Exactly one row for the pair.
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM event_rsvps WHERE event_id = ?1 AND user_id = ?2",
                rusqlite::params![event.as_i64(), user.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_user_status_absent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let status = user_status(&conn, TENANT, EventId::new(99), user.id).unwrap();
        assert!(status.is_none());
    }

    #[test]
    fn test_count_by_status() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let event = EventId::new(7);

        for name in ["a", "b", "c"] {
            let user = users::create_user(&conn, TENANT, name).unwrap();
            set_rsvp(&conn, TENANT, event, user.id, RsvpStatus::Going).unwrap();
        }
        let lurker = users::create_user(&conn, TENANT, "d").unwrap();
        set_rsvp(&conn, TENANT, event, lurker.id, RsvpStatus::Interested).unwrap();

        assert_eq!(
            count_by_status(&conn, TENANT, event, RsvpStatus::Going).unwrap(),
            3
        );
        assert_eq!(
            count_by_status(&conn, TENANT, event, RsvpStatus::Interested).unwrap(),
            1
        );
        assert_eq!(
            count_by_status(&conn, TENANT, event, RsvpStatus::Declined).unwrap(),
            0
        );
    }

    #[test]
    fn test_remove_rsvp() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let event = EventId::new(5);

        set_rsvp(&conn, TENANT, event, user.id, RsvpStatus::Going).unwrap();
        assert!(remove_rsvp(&conn, TENANT, event, user.id).unwrap());
        assert!(!remove_rsvp(&conn, TENANT, event, user.id).unwrap());
        assert!(user_status(&conn, TENANT, event, user.id).unwrap().is_none());
    }

    #[test]
    fn test_rsvp_tenant_scoping() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let event = EventId::new(5);

        set_rsvp(&conn, TENANT, event, user.id, RsvpStatus::Going).unwrap();

        // Another tenant cannot see or remove the RSVP.
        let other = TenantId::new(2);
        assert!(user_status(&conn, other, event, user.id).unwrap().is_none());
        assert!(!remove_rsvp(&conn, other, event, user.id).unwrap());
        assert_eq!(count_by_status(&conn, other, event, RsvpStatus::Going).unwrap(), 0);
    }

    #[test]
    fn test_set_rsvp_does_not_cross_tenants() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let event = EventId::new(10);
        let other = TenantId::new(2);

        set_rsvp(&conn, TENANT, event, user.id, RsvpStatus::Going).unwrap();

        // The same (event, user) pair under another tenant gets its own row
        // and leaves the first tenant's status alone.
        let foreign = set_rsvp(&conn, other, event, user.id, RsvpStatus::Declined).unwrap();
        assert_eq!(foreign.tenant_id, other);
        assert_eq!(
            user_status(&conn, TENANT, event, user.id).unwrap(),
            Some(RsvpStatus::Going)
        );
        assert_eq!(
            user_status(&conn, other, event, user.id).unwrap(),
            Some(RsvpStatus::Declined)
        );
    }
}
