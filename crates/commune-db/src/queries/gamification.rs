//! Gamification points and levels.
//!
//! Every award appends a `points_log` row and bumps the counters on the user
//! row in the same call. Awards are best-effort: a failure is logged and
//! swallowed so the action that earned the points never rolls back over a
//! bookkeeping error. `verify_schema` runs at boot so a deployment with a
//! broken gamification schema fails loudly instead of dropping awards.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{level_for_points, Action, Error, Result, TenantId, UserId};

use crate::models::PointsEntry;
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, user_id, points, action, description, created_at";

/// Award points to a user for an action. Best-effort: on failure a warning
/// is logged and nothing is returned.
pub fn award_points(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    action: Action,
    description: &str,
) {
    if let Err(e) = try_award(conn, tenant, user, action, description) {
        tracing::warn!(
            user = user.as_i64(),
            action = %action,
            error = %e,
            "failed to award points"
        );
    }
}

fn try_award(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    action: Action,
    description: &str,
) -> Result<()> {
    let points = action.points();

    let new_total: i64 = conn
        .query_row(
            "UPDATE users SET points = points + ?1
             WHERE id = ?2 AND tenant_id = ?3
             RETURNING points",
            rusqlite::params![points, user.as_i64(), tenant.as_i64()],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::not_found("user"),
            other => Error::database(other.to_string()),
        })?;

    conn.execute(
        "UPDATE users SET level = ?1 WHERE id = ?2 AND tenant_id = ?3",
        rusqlite::params![
            i64::from(level_for_points(new_total)),
            user.as_i64(),
            tenant.as_i64(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    conn.execute(
        "INSERT INTO points_log (tenant_id, user_id, points, action, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            tenant.as_i64(),
            user.as_i64(),
            points,
            action.as_str(),
            description,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// A user's current points total.
pub fn user_points(conn: &Connection, tenant: TenantId, user: UserId) -> Result<i64> {
    let result = conn.query_row(
        "SELECT points FROM users WHERE id = ?1 AND tenant_id = ?2",
        rusqlite::params![user.as_i64(), tenant.as_i64()],
        |row| row.get(0),
    );

    match result {
        Ok(points) => Ok(points),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::not_found("user")),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// A user's points history, newest first.
pub fn history(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    limit: i64,
) -> Result<Vec<PointsEntry>> {
    let q = format!(
        "SELECT {COLS} FROM points_log
         WHERE tenant_id = ?1 AND user_id = ?2
         ORDER BY created_at DESC, id DESC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), user.as_i64(), clamp_limit(limit)],
            PointsEntry::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Check at boot that the gamification columns and log table exist.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info('users')")
        .map_err(|e| Error::database(e.to_string()))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    for required in ["points", "level"] {
        if !columns.iter().any(|c| c == required) {
            return Err(Error::internal(format!(
                "users table is missing the {} column",
                required
            )));
        }
    }

    let log_exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'points_log'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if log_exists == 0 {
        return Err(Error::internal("points_log table is missing"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;

    const TENANT: TenantId = TenantId::new(1);

    #[test]
    fn test_award_points_updates_user_and_log() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        award_points(&conn, TENANT, user.id, Action::CreateGroup, "started a group");
        award_points(&conn, TENANT, user.id, Action::CreateGroup, "another one");

        let updated = users::get_user(&conn, TENANT, user.id).unwrap().unwrap();
        assert_eq!(updated.points, 100);
        assert_eq!(updated.level, 2);

        assert_eq!(user_points(&conn, TENANT, user.id).unwrap(), 100);

        let log = history(&conn, TENANT, user.id, 50).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].points, 50);
        assert_eq!(log[0].action, "create_group");
    }

    #[test]
    fn test_award_points_missing_user_is_swallowed() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        // No panic, no log row.
        award_points(&conn, TENANT, UserId::new(999), Action::DailyLogin, "");
        let log = history(&conn, TENANT, UserId::new(999), 10).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_award_points_tenant_scoping() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        award_points(&conn, TenantId::new(2), user.id, Action::DailyLogin, "");

        let unchanged = users::get_user(&conn, TENANT, user.id).unwrap().unwrap();
        assert_eq!(unchanged.points, 0);
    }

    #[test]
    fn test_verify_schema_passes_on_migrated_db() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        verify_schema(&conn).unwrap();
    }

    #[test]
    fn test_verify_schema_detects_missing_column() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        conn.execute_batch("ALTER TABLE users DROP COLUMN level").unwrap();
        assert!(verify_schema(&conn).is_err());
    }
}
