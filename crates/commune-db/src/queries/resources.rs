//! Resource library queries.
//!
//! Resources reference uploaded files by a path relative to the uploads
//! root. Deletion removes the row first, then best-effort removes the file,
//! but only after the path has been resolved and proven to live under the
//! uploads root. A path that escapes the root deletes the row and leaves the
//! filesystem alone.

use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{paths, CategoryId, Error, ResourceId, Result, TenantId, UserId};

use crate::models::{Category, ResourceItem};
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, user_id, title, description, file_path, file_type, \
                    file_size, category_id, downloads, created_at";

/// Fields for a new resource.
#[derive(Debug, Clone)]
pub struct NewResource<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub file_path: &'a str,
    pub file_type: &'a str,
    pub file_size: i64,
    pub category_id: Option<CategoryId>,
}

/// Listing filters. `search` matches title or description with a substring
/// match.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter<'a> {
    pub search: Option<&'a str>,
    pub category: Option<CategoryId>,
    pub limit: Option<i64>,
}

/// Create a resource category.
pub fn create_category(conn: &Connection, tenant: TenantId, name: &str) -> Result<Category> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("category needs a name"));
    }

    conn.execute(
        "INSERT INTO categories (tenant_id, name) VALUES (?1, ?2)",
        rusqlite::params![tenant.as_i64(), name],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Category {
        id: CategoryId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        name: name.to_string(),
    })
}

/// Register an uploaded file in the library.
pub fn create_resource(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    resource: &NewResource<'_>,
) -> Result<ResourceItem> {
    if resource.title.trim().is_empty() {
        return Err(Error::invalid_input("resource needs a title"));
    }
    if resource.file_path.trim().is_empty() {
        return Err(Error::invalid_input("resource needs a file path"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO resources (tenant_id, user_id, title, description, file_path, file_type, file_size, category_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            tenant.as_i64(),
            user.as_i64(),
            resource.title,
            resource.description,
            resource.file_path,
            resource.file_type,
            resource.file_size,
            resource.category_id.map(CategoryId::as_i64),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(ResourceItem {
        id: ResourceId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        user_id: user,
        title: resource.title.to_string(),
        description: resource.description.to_string(),
        file_path: resource.file_path.to_string(),
        file_type: resource.file_type.to_string(),
        file_size: resource.file_size,
        category_id: resource.category_id,
        downloads: 0,
        created_at: now,
    })
}

/// Get a resource by id, scoped to the tenant.
pub fn get_resource(
    conn: &Connection,
    tenant: TenantId,
    id: ResourceId,
) -> Result<Option<ResourceItem>> {
    let q = format!("SELECT {COLS} FROM resources WHERE id = ?1 AND tenant_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        ResourceItem::from_row,
    );

    match result {
        Ok(resource) => Ok(Some(resource)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List resources, newest first, with optional search and category filters.
pub fn list_resources(
    conn: &Connection,
    tenant: TenantId,
    filter: &ResourceFilter<'_>,
) -> Result<Vec<ResourceItem>> {
    let mut sql = format!("SELECT {COLS} FROM resources WHERE tenant_id = ?1");
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(tenant.as_i64())];

    if let Some(term) = filter.search {
        params.push(Box::new(format!("%{}%", term)));
        let n = params.len();
        sql.push_str(&format!(" AND (title LIKE ?{n} OR description LIKE ?{n})"));
    }
    if let Some(category) = filter.category {
        params.push(Box::new(category.as_i64()));
        sql.push_str(&format!(" AND category_id = ?{}", params.len()));
    }

    params.push(Box::new(clamp_limit(filter.limit.unwrap_or(crate::queries::MAX_PAGE_SIZE))));
    sql.push_str(&format!(
        " ORDER BY created_at DESC, id DESC LIMIT ?{}",
        params.len()
    ));

    let mut stmt = conn.prepare(&sql).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            ResourceItem::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Bump the download counter. Returns the new count.
pub fn increment_downloads(conn: &Connection, tenant: TenantId, id: ResourceId) -> Result<i64> {
    let result = conn.query_row(
        "UPDATE resources SET downloads = downloads + 1
         WHERE id = ?1 AND tenant_id = ?2
         RETURNING downloads",
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        |row| row.get(0),
    );

    match result {
        Ok(count) => Ok(count),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::not_found("resource")),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete a resource row and best-effort remove its file from disk.
///
/// Returns `None` when the resource does not exist, otherwise whether the
/// backing file was actually removed. The file is only touched when its
/// stored path resolves to a real location strictly inside `uploads_root`;
/// anything else (escape attempts, already-gone files) leaves the filesystem
/// alone. The row is deleted in every case.
pub fn delete_resource(
    conn: &Connection,
    tenant: TenantId,
    id: ResourceId,
    uploads_root: &Path,
) -> Result<Option<bool>> {
    let Some(resource) = get_resource(conn, tenant, id)? else {
        return Ok(None);
    };

    conn.execute(
        "DELETE FROM resources WHERE id = ?1 AND tenant_id = ?2",
        rusqlite::params![id.as_i64(), tenant.as_i64()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let removed = match paths::resolve_under(uploads_root, &resource.file_path) {
        Some(path) => match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    resource = id.as_i64(),
                    path = %path.display(),
                    error = %e,
                    "failed to remove resource file"
                );
                false
            }
        },
        None => {
            tracing::warn!(
                resource = id.as_i64(),
                path = resource.file_path,
                "resource file path does not resolve under the uploads root"
            );
            false
        }
    };

    Ok(Some(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;

    const TENANT: TenantId = TenantId::new(1);

    fn pdf<'a>(title: &'a str, file_path: &'a str) -> NewResource<'a> {
        NewResource {
            title,
            description: "",
            file_path,
            file_type: "application/pdf",
            file_size: 1024,
            category_id: None,
        }
    }

    #[test]
    fn test_create_and_get_resource() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let created =
            create_resource(&conn, TENANT, user.id, &pdf("handbook", "docs/handbook.pdf"))
                .unwrap();
        let fetched = get_resource(&conn, TENANT, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.downloads, 0);
    }

    #[test]
    fn test_list_resources_filters() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let guides = create_category(&conn, TENANT, "guides").unwrap();

        create_resource(
            &conn,
            TENANT,
            user.id,
            &NewResource {
                category_id: Some(guides.id),
                ..pdf("starter guide", "a.pdf")
            },
        )
        .unwrap();
        create_resource(&conn, TENANT, user.id, &pdf("budget sheet", "b.pdf")).unwrap();

        let by_term = list_resources(
            &conn,
            TENANT,
            &ResourceFilter {
                search: Some("guide"),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_term.len(), 1);
        assert_eq!(by_term[0].title, "starter guide");

        let by_category = list_resources(
            &conn,
            TENANT,
            &ResourceFilter {
                category: Some(guides.id),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_category.len(), 1);

        let all = list_resources(&conn, TENANT, &ResourceFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_increment_downloads() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let resource =
            create_resource(&conn, TENANT, user.id, &pdf("handbook", "h.pdf")).unwrap();

        assert_eq!(increment_downloads(&conn, TENANT, resource.id).unwrap(), 1);
        assert_eq!(increment_downloads(&conn, TENANT, resource.id).unwrap(), 2);
        assert!(increment_downloads(&conn, TENANT, ResourceId::new(999)).is_err());
    }

    #[test]
    fn test_delete_resource_removes_file() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("doc.pdf"), b"data").unwrap();

        let resource = create_resource(&conn, TENANT, user.id, &pdf("doc", "doc.pdf")).unwrap();
        let removed = delete_resource(&conn, TENANT, resource.id, root.path()).unwrap();
        assert_eq!(removed, Some(true));
        assert!(!root.path().join("doc.pdf").exists());
        assert!(get_resource(&conn, TENANT, resource.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_resource_refuses_escaping_path() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("uploads");
        std::fs::create_dir(&root).unwrap();
        let secret = parent.path().join("secret.txt");
        std::fs::write(&secret, b"keep me").unwrap();

        let resource =
            create_resource(&conn, TENANT, user.id, &pdf("sneaky", "../secret.txt")).unwrap();
        let removed = delete_resource(&conn, TENANT, resource.id, &root).unwrap();

        // The row goes, the file outside the root stays.
        assert_eq!(removed, Some(false));
        assert!(secret.exists());
        assert!(get_resource(&conn, TENANT, resource.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_resource_missing_row() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let root = tempfile::tempdir().unwrap();

        let removed = delete_resource(&conn, TENANT, ResourceId::new(42), root.path()).unwrap();
        assert!(removed.is_none());
    }
}
