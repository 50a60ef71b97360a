//! SEO redirect queries.
//!
//! One rule per (tenant, source URL); saving again overwrites the
//! destination in place. Lookup and hit counting are a single UPDATE with
//! RETURNING, so concurrent lookups never lose a hit.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, RedirectId, Result, TenantId};

use crate::models::SeoRedirect;
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, source_url, destination_url, hits, created_at";

/// Create or overwrite a redirect rule. Returns the stored row.
pub fn upsert_redirect(
    conn: &Connection,
    tenant: TenantId,
    source_url: &str,
    destination_url: &str,
) -> Result<SeoRedirect> {
    if source_url.trim().is_empty() || destination_url.trim().is_empty() {
        return Err(Error::invalid_input("redirect needs a source and a destination"));
    }
    if source_url == destination_url {
        return Err(Error::invalid_input("redirect cannot point at itself"));
    }

    conn.execute(
        "INSERT INTO seo_redirects (tenant_id, source_url, destination_url, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(tenant_id, source_url) DO UPDATE SET
            destination_url = excluded.destination_url",
        rusqlite::params![
            tenant.as_i64(),
            source_url,
            destination_url,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let q = format!(
        "SELECT {COLS} FROM seo_redirects WHERE tenant_id = ?1 AND source_url = ?2"
    );
    conn.query_row(
        &q,
        rusqlite::params![tenant.as_i64(), source_url],
        SeoRedirect::from_row,
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Look up the destination for a source URL, counting the hit. Returns
/// `None` when no rule matches.
pub fn check_redirect(
    conn: &Connection,
    tenant: TenantId,
    source_url: &str,
) -> Result<Option<String>> {
    let result = conn.query_row(
        "UPDATE seo_redirects SET hits = hits + 1
         WHERE tenant_id = ?1 AND source_url = ?2
         RETURNING destination_url",
        rusqlite::params![tenant.as_i64(), source_url],
        |row| row.get(0),
    );

    match result {
        Ok(destination) => Ok(Some(destination)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a tenant's redirect rules, most hit first.
pub fn list_redirects(conn: &Connection, tenant: TenantId, limit: i64) -> Result<Vec<SeoRedirect>> {
    let q = format!(
        "SELECT {COLS} FROM seo_redirects WHERE tenant_id = ?1
         ORDER BY hits DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), clamp_limit(limit)],
            SeoRedirect::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a redirect rule. Returns whether a row was removed.
pub fn delete_redirect(conn: &Connection, tenant: TenantId, id: RedirectId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM seo_redirects WHERE id = ?1 AND tenant_id = ?2",
            rusqlite::params![id.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    const TENANT: TenantId = TenantId::new(1);

    #[test]
    fn test_upsert_creates_then_overwrites() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let first = upsert_redirect(&conn, TENANT, "/old", "/new").unwrap();
        assert_eq!(first.hits, 0);

        let second = upsert_redirect(&conn, TENANT, "/old", "/newer").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.destination_url, "/newer");
    }

    #[test]
    fn test_upsert_rejects_self_redirect() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let result = upsert_redirect(&conn, TENANT, "/loop", "/loop");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_check_redirect_counts_hits() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let rule = upsert_redirect(&conn, TENANT, "/old", "/new").unwrap();

        assert_eq!(
            check_redirect(&conn, TENANT, "/old").unwrap().as_deref(),
            Some("/new")
        );
        assert_eq!(
            check_redirect(&conn, TENANT, "/old").unwrap().as_deref(),
            Some("/new")
        );
        assert!(check_redirect(&conn, TENANT, "/missing").unwrap().is_none());

        let listed = list_redirects(&conn, TENANT, 50).unwrap();
        assert_eq!(listed[0].id, rule.id);
        assert_eq!(listed[0].hits, 2);
    }

    #[test]
    fn test_check_redirect_tenant_scoping() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        upsert_redirect(&conn, TENANT, "/old", "/new").unwrap();

        assert!(check_redirect(&conn, TenantId::new(2), "/old").unwrap().is_none());
    }

    #[test]
    fn test_delete_redirect() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let rule = upsert_redirect(&conn, TENANT, "/old", "/new").unwrap();

        assert!(delete_redirect(&conn, TENANT, rule.id).unwrap());
        assert!(!delete_redirect(&conn, TENANT, rule.id).unwrap());
        assert!(check_redirect(&conn, TENANT, "/old").unwrap().is_none());
    }
}
