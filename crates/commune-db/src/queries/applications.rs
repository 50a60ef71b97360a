//! Volunteer application queries.
//!
//! Applications are insert-once under the natural key (opportunity, user):
//! applying twice is a no-op reported as `None`. Shift capacity only counts
//! approved applications, so a pending pile-up never blocks signups.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{
    ApplicationId, ApplicationStatus, Error, OpportunityId, Result, ShiftId, TenantId, UserId,
};

use crate::models::VolApplication;
use crate::queries::{clamp_limit, opportunities};

const COLS: &str = "id, opportunity_id, user_id, shift_id, message, status, created_at";

/// Tenant guard for application rows, which carry no tenant column of their
/// own: the chain runs application -> opportunity -> organization.
const TENANT_SCOPE: &str = "opportunity_id IN
    (SELECT o.id FROM vol_opportunities o
     JOIN vol_organizations org ON org.id = o.organization_id
     WHERE org.tenant_id = ?)";

fn shift_has_room(conn: &Connection, shift: ShiftId, opportunity: OpportunityId) -> Result<()> {
    let capacity: Option<i64> = conn
        .query_row(
            "SELECT capacity FROM vol_shifts WHERE id = ?1 AND opportunity_id = ?2",
            rusqlite::params![shift.as_i64(), opportunity.as_i64()],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                Error::invalid_input("shift does not belong to this opportunity")
            }
            other => Error::database(other.to_string()),
        })?;

    if let Some(cap) = capacity {
        if opportunities::shift_signup_count(conn, shift)? >= cap {
            return Err(Error::invalid_input("shift is full"));
        }
    }
    Ok(())
}

/// Apply to an opportunity, optionally for a specific shift.
///
/// Returns `None` when the user already has an application for this
/// opportunity, whatever its status. Fails with `InvalidInput` when the
/// opportunity is inactive, the shift belongs elsewhere, or the shift is
/// full.
pub fn apply(
    conn: &Connection,
    tenant: TenantId,
    opportunity: OpportunityId,
    user: UserId,
    message: &str,
    shift: Option<ShiftId>,
) -> Result<Option<VolApplication>> {
    let opp = opportunities::get_opportunity(conn, tenant, opportunity)?
        .ok_or_else(|| Error::not_found("opportunity"))?;
    if !opp.is_active {
        return Err(Error::invalid_input("opportunity is no longer active"));
    }

    if let Some(shift) = shift {
        shift_has_room(conn, shift, opportunity)?;
    }

    let now = Utc::now();

    let n = conn
        .execute(
            "INSERT INTO vol_applications (opportunity_id, user_id, shift_id, message, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(opportunity_id, user_id) DO NOTHING",
            rusqlite::params![
                opportunity.as_i64(),
                user.as_i64(),
                shift.map(ShiftId::as_i64),
                message,
                ApplicationStatus::Pending.to_string(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if n == 0 {
        return Ok(None);
    }

    Ok(Some(VolApplication {
        id: ApplicationId::new(conn.last_insert_rowid()),
        opportunity_id: opportunity,
        user_id: user,
        shift_id: shift,
        message: message.to_string(),
        status: ApplicationStatus::Pending,
        created_at: now,
    }))
}

/// Whether a user already has an application for an opportunity.
pub fn has_applied(conn: &Connection, opportunity: OpportunityId, user: UserId) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM vol_applications WHERE opportunity_id = ?1 AND user_id = ?2",
            rusqlite::params![opportunity.as_i64(), user.as_i64()],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(count > 0)
}

/// Get an application by id, scoped to the tenant through its opportunity.
pub fn get_application(
    conn: &Connection,
    tenant: TenantId,
    id: ApplicationId,
) -> Result<Option<VolApplication>> {
    let q = format!(
        "SELECT {COLS} FROM vol_applications WHERE id = ?1 AND {}",
        TENANT_SCOPE.replace('?', "?2")
    );
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        VolApplication::from_row,
    );

    match result {
        Ok(application) => Ok(Some(application)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Set an application's status. Returns whether a row was updated.
pub fn set_status(
    conn: &Connection,
    tenant: TenantId,
    id: ApplicationId,
    status: ApplicationStatus,
) -> Result<bool> {
    let q = format!(
        "UPDATE vol_applications SET status = ?1 WHERE id = ?2 AND {}",
        TENANT_SCOPE.replace('?', "?3")
    );
    let n = conn
        .execute(
            &q,
            rusqlite::params![status.to_string(), id.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Withdraw an application. Only the applicant can withdraw; the row stays
/// with `Withdrawn` status so the apply-once key keeps holding.
pub fn withdraw(
    conn: &Connection,
    tenant: TenantId,
    id: ApplicationId,
    user: UserId,
) -> Result<bool> {
    let q = format!(
        "UPDATE vol_applications SET status = ?1 WHERE id = ?2 AND user_id = ?3 AND {}",
        TENANT_SCOPE.replace('?', "?4")
    );
    let n = conn
        .execute(
            &q,
            rusqlite::params![
                ApplicationStatus::Withdrawn.to_string(),
                id.as_i64(),
                user.as_i64(),
                tenant.as_i64(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// List an opportunity's applications, oldest first.
pub fn list_for_opportunity(
    conn: &Connection,
    tenant: TenantId,
    opportunity: OpportunityId,
) -> Result<Vec<VolApplication>> {
    let q = format!(
        "SELECT {COLS} FROM vol_applications
         WHERE opportunity_id = ?1 AND {}
         ORDER BY created_at ASC, id ASC",
        TENANT_SCOPE.replace('?', "?2")
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![opportunity.as_i64(), tenant.as_i64()],
            VolApplication::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List a user's applications across opportunities, newest first.
pub fn list_for_user(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    limit: i64,
) -> Result<Vec<VolApplication>> {
    let q = format!(
        "SELECT {COLS} FROM vol_applications
         WHERE user_id = ?1 AND {}
         ORDER BY created_at DESC, id DESC LIMIT ?3",
        TENANT_SCOPE.replace('?', "?2")
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![user.as_i64(), tenant.as_i64(), clamp_limit(limit)],
            VolApplication::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Move an application onto a shift. The shift must belong to the same
/// opportunity and have room.
pub fn assign_shift(
    conn: &Connection,
    tenant: TenantId,
    id: ApplicationId,
    shift: ShiftId,
) -> Result<bool> {
    let Some(application) = get_application(conn, tenant, id)? else {
        return Ok(false);
    };
    shift_has_room(conn, shift, application.opportunity_id)?;

    let n = conn
        .execute(
            "UPDATE vol_applications SET shift_id = ?1 WHERE id = ?2",
            rusqlite::params![shift.as_i64(), id.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Take an application off its shift. Returns whether a row was updated.
pub fn clear_shift(conn: &Connection, tenant: TenantId, id: ApplicationId) -> Result<bool> {
    let q = format!(
        "UPDATE vol_applications SET shift_id = NULL WHERE id = ?1 AND {}",
        TENANT_SCOPE.replace('?', "?2")
    );
    let n = conn
        .execute(&q, rusqlite::params![id.as_i64(), tenant.as_i64()])
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}
