//! SEO metadata queries.
//!
//! One row per (tenant, entity type, entity id); `save` is a single atomic
//! upsert. An entity id of `None` addresses the site-wide default row for
//! its entity type, persisted as 0 so the unique index covers it.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, Result, TenantId};

use crate::models::SeoMetadata;

const COLS: &str = "id, tenant_id, entity_type, entity_id, meta_title, meta_description, \
                    og_image, noindex, updated_at";

/// Metadata fields written by `save`.
#[derive(Debug, Clone, Default)]
pub struct SeoFields<'a> {
    pub meta_title: &'a str,
    pub meta_description: &'a str,
    pub og_image: Option<&'a str>,
    pub noindex: bool,
}

// Entity ids are row ids, always positive; 0 is reserved for the site-wide
// row, so letting `Some(0)` (or a negative id) through would alias it.
fn entity_key(entity_id: Option<i64>) -> Result<i64> {
    match entity_id {
        None => Ok(0),
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(Error::invalid_input("entity id must be positive")),
    }
}

/// Create or overwrite the metadata for an entity (or the site-wide default
/// when `entity_id` is `None`). Returns the stored row.
pub fn save(
    conn: &Connection,
    tenant: TenantId,
    entity_type: &str,
    entity_id: Option<i64>,
    fields: &SeoFields<'_>,
) -> Result<SeoMetadata> {
    if entity_type.trim().is_empty() {
        return Err(Error::invalid_input("entity type is required"));
    }
    let key = entity_key(entity_id)?;

    conn.execute(
        "INSERT INTO seo_metadata (tenant_id, entity_type, entity_id, meta_title, meta_description, og_image, noindex, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(tenant_id, entity_type, entity_id) DO UPDATE SET
            meta_title = excluded.meta_title,
            meta_description = excluded.meta_description,
            og_image = excluded.og_image,
            noindex = excluded.noindex,
            updated_at = excluded.updated_at",
        rusqlite::params![
            tenant.as_i64(),
            entity_type,
            key,
            fields.meta_title,
            fields.meta_description,
            fields.og_image,
            i64::from(fields.noindex),
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get(conn, tenant, entity_type, entity_id)?
        .ok_or_else(|| Error::internal("seo metadata row missing after upsert"))
}

/// Fetch the metadata for an entity, or the site-wide row when `entity_id`
/// is `None`.
pub fn get(
    conn: &Connection,
    tenant: TenantId,
    entity_type: &str,
    entity_id: Option<i64>,
) -> Result<Option<SeoMetadata>> {
    let q = format!(
        "SELECT {COLS} FROM seo_metadata
         WHERE tenant_id = ?1 AND entity_type = ?2 AND entity_id = ?3"
    );
    let result = conn.query_row(
        &q,
        rusqlite::params![tenant.as_i64(), entity_type, entity_key(entity_id)?],
        SeoMetadata::from_row,
    );

    match result {
        Ok(meta) => Ok(Some(meta)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete an entity's metadata. Returns whether a row was removed.
pub fn delete(
    conn: &Connection,
    tenant: TenantId,
    entity_type: &str,
    entity_id: Option<i64>,
) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM seo_metadata
             WHERE tenant_id = ?1 AND entity_type = ?2 AND entity_id = ?3",
            rusqlite::params![tenant.as_i64(), entity_type, entity_key(entity_id)?],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}
