//! Minimal user row operations.
//!
//! Account management proper (credentials, sessions, profiles) lives outside
//! this layer; these helpers exist because almost every other table keys on a
//! user row, and the gamification counters live on it.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, Result, TenantId, UserId};

use crate::models::User;

const COLS: &str = "id, tenant_id, display_name, points, level, created_at";

/// Create a new user for a tenant.
pub fn create_user(conn: &Connection, tenant: TenantId, display_name: &str) -> Result<User> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO users (tenant_id, display_name, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![tenant.as_i64(), display_name, now.to_rfc3339()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let id = UserId::new(conn.last_insert_rowid());

    Ok(User {
        id,
        tenant_id: tenant,
        display_name: display_name.to_string(),
        points: 0,
        level: 1,
        created_at: now,
    })
}

/// Get a user by id, scoped to the tenant.
pub fn get_user(conn: &Connection, tenant: TenantId, id: UserId) -> Result<Option<User>> {
    let q = format!("SELECT {COLS} FROM users WHERE id = ?1 AND tenant_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        User::from_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    #[test]
    fn test_create_user() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let user = create_user(&conn, TenantId::new(1), "ada").unwrap();
        assert_eq!(user.display_name, "ada");
        assert_eq!(user.points, 0);
        assert_eq!(user.level, 1);
    }

    #[test]
    fn test_get_user() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let created = create_user(&conn, TenantId::new(1), "ada").unwrap();
        let found = get_user(&conn, TenantId::new(1), created.id).unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_get_user_wrong_tenant() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let created = create_user(&conn, TenantId::new(1), "ada").unwrap();
        let found = get_user(&conn, TenantId::new(2), created.id).unwrap();
        assert!(found.is_none());
    }
}
