//! Abuse report queries.
//!
//! A report points at one of a closed set of target kinds through a
//! (type tag, id) pair. Status changes are unrestricted; moderation flow
//! lives above this layer.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, ReportId, ReportStatus, ReportTarget, Result, TenantId, UserId};

use crate::models::Report;
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, reporter_id, target_type, target_id, reason, status, created_at";

/// File a new report. Opens in `Open` status.
pub fn create_report(
    conn: &Connection,
    tenant: TenantId,
    reporter: UserId,
    target: ReportTarget,
    reason: &str,
) -> Result<Report> {
    if reason.trim().is_empty() {
        return Err(Error::invalid_input("report needs a reason"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO reports (tenant_id, reporter_id, target_type, target_id, reason, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tenant.as_i64(),
            reporter.as_i64(),
            target.kind(),
            target.raw_id(),
            reason,
            ReportStatus::Open.to_string(),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Report {
        id: ReportId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        reporter_id: reporter,
        target,
        reason: reason.to_string(),
        status: ReportStatus::Open,
        created_at: now,
    })
}

/// Get a report by id, scoped to the tenant.
pub fn get_report(conn: &Connection, tenant: TenantId, id: ReportId) -> Result<Option<Report>> {
    let q = format!("SELECT {COLS} FROM reports WHERE id = ?1 AND tenant_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        Report::from_row,
    );

    match result {
        Ok(report) => Ok(Some(report)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a tenant's reports in one status, newest first.
pub fn list_by_status(
    conn: &Connection,
    tenant: TenantId,
    status: ReportStatus,
    limit: i64,
) -> Result<Vec<Report>> {
    let q = format!(
        "SELECT {COLS} FROM reports
         WHERE tenant_id = ?1 AND status = ?2
         ORDER BY created_at DESC, id DESC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), status.to_string(), clamp_limit(limit)],
            Report::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Set a report's status. Returns whether a row was updated.
pub fn set_status(
    conn: &Connection,
    tenant: TenantId,
    id: ReportId,
    status: ReportStatus,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE reports SET status = ?1 WHERE id = ?2 AND tenant_id = ?3",
            rusqlite::params![status.to_string(), id.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;
    use commune_common::PostId;

    const TENANT: TenantId = TenantId::new(1);

    #[test]
    fn test_create_and_get_report() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let target = ReportTarget::Post(PostId::new(7));
        let report = create_report(&conn, TENANT, user.id, target, "spam").unwrap();
        assert_eq!(report.status, ReportStatus::Open);

        let fetched = get_report(&conn, TENANT, report.id).unwrap().unwrap();
        assert_eq!(fetched, report);
        assert_eq!(fetched.target, target);
    }

    #[test]
    fn test_create_report_requires_reason() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let result =
            create_report(&conn, TENANT, user.id, ReportTarget::User(user.id), "  ");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_status_transitions_are_unrestricted() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let report = create_report(
            &conn,
            TENANT,
            user.id,
            ReportTarget::Comment(PostId::new(3)),
            "rude",
        )
        .unwrap();

        assert!(set_status(&conn, TENANT, report.id, ReportStatus::Resolved).unwrap());
        // Back to open is allowed.
        assert!(set_status(&conn, TENANT, report.id, ReportStatus::Open).unwrap());
        let fetched = get_report(&conn, TENANT, report.id).unwrap().unwrap();
        assert_eq!(fetched.status, ReportStatus::Open);
    }

    #[test]
    fn test_list_by_status() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let a = create_report(&conn, TENANT, user.id, ReportTarget::User(user.id), "a").unwrap();
        let b = create_report(&conn, TENANT, user.id, ReportTarget::User(user.id), "b").unwrap();
        set_status(&conn, TENANT, a.id, ReportStatus::Dismissed).unwrap();

        let open = list_by_status(&conn, TENANT, ReportStatus::Open, 50).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, b.id);

        let dismissed = list_by_status(&conn, TENANT, ReportStatus::Dismissed, 50).unwrap();
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].id, a.id);
    }

    #[test]
    fn test_tenant_scoping() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let report =
            create_report(&conn, TENANT, user.id, ReportTarget::User(user.id), "x").unwrap();

        let other = TenantId::new(2);
        assert!(get_report(&conn, other, report.id).unwrap().is_none());
        assert!(!set_status(&conn, other, report.id, ReportStatus::Resolved).unwrap());
    }
}
