//! Social feed queries.
//!
//! Posts and comments share the `feed_posts` table; a comment points at its
//! parent through a (type tag, id) pair. Like counters are advisory and
//! clamped at zero on the way down.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, FeedParent, PostId, Result, TenantId, UserId, Visibility};

use crate::models::FeedPost;
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, user_id, content, emoji, image_url, parent_id, parent_type, \
                    visibility, likes_count, created_at";

/// Fields for a new top-level post.
#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub content: &'a str,
    pub emoji: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub visibility: Visibility,
}

/// Create a new top-level feed post.
///
/// A post needs either text content or an image.
pub fn create_post(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    post: &NewPost<'_>,
) -> Result<FeedPost> {
    if post.content.trim().is_empty() && post.image_url.is_none() {
        return Err(Error::invalid_input("post needs content or an image"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO feed_posts (tenant_id, user_id, content, emoji, image_url, visibility, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tenant.as_i64(),
            user.as_i64(),
            post.content,
            post.emoji,
            post.image_url,
            post.visibility.to_string(),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let id = PostId::new(conn.last_insert_rowid());

    Ok(FeedPost {
        id,
        tenant_id: tenant,
        user_id: user,
        content: post.content.to_string(),
        emoji: post.emoji.map(str::to_string),
        image_url: post.image_url.map(str::to_string),
        parent: None,
        visibility: post.visibility,
        likes_count: 0,
        created_at: now,
    })
}

/// Create a comment under a post or another comment.
///
/// The comment inherits the parent's visibility. Fails with `NotFound` when
/// the parent does not exist in this tenant.
pub fn create_comment(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    parent: FeedParent,
    content: &str,
) -> Result<FeedPost> {
    if content.trim().is_empty() {
        return Err(Error::invalid_input("comment needs content"));
    }

    let parent_post =
        get_post(conn, tenant, parent.id())?.ok_or_else(|| Error::not_found("parent post"))?;

    let now = Utc::now();

    conn.execute(
        "INSERT INTO feed_posts (tenant_id, user_id, content, parent_id, parent_type, visibility, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tenant.as_i64(),
            user.as_i64(),
            content,
            parent.id().as_i64(),
            parent.kind(),
            parent_post.visibility.to_string(),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let id = PostId::new(conn.last_insert_rowid());

    Ok(FeedPost {
        id,
        tenant_id: tenant,
        user_id: user,
        content: content.to_string(),
        emoji: None,
        image_url: None,
        parent: Some(parent),
        visibility: parent_post.visibility,
        likes_count: 0,
        created_at: now,
    })
}

/// Get a single post or comment by id, scoped to the tenant.
pub fn get_post(conn: &Connection, tenant: TenantId, id: PostId) -> Result<Option<FeedPost>> {
    let q = format!("SELECT {COLS} FROM feed_posts WHERE id = ?1 AND tenant_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        FeedPost::from_row,
    );

    match result {
        Ok(post) => Ok(Some(post)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List recent public top-level posts for a tenant, newest first.
pub fn recent(conn: &Connection, tenant: TenantId, limit: i64) -> Result<Vec<FeedPost>> {
    let q = format!(
        "SELECT {COLS} FROM feed_posts
         WHERE tenant_id = ?1 AND visibility = 'public' AND parent_id IS NULL
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), clamp_limit(limit)],
            FeedPost::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List one author's public top-level posts, newest first.
pub fn user_posts(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    limit: i64,
) -> Result<Vec<FeedPost>> {
    let q = format!(
        "SELECT {COLS} FROM feed_posts
         WHERE tenant_id = ?1 AND user_id = ?2 AND visibility = 'public' AND parent_id IS NULL
         ORDER BY created_at DESC, id DESC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), user.as_i64(), clamp_limit(limit)],
            FeedPost::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List direct replies to a post or comment, oldest first.
pub fn replies(conn: &Connection, tenant: TenantId, parent: PostId) -> Result<Vec<FeedPost>> {
    let q = format!(
        "SELECT {COLS} FROM feed_posts
         WHERE tenant_id = ?1 AND parent_id = ?2
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), parent.as_i64()],
            FeedPost::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Increment a post's like counter. Returns the new count.
///
/// Lost updates under concurrency are tolerated; likes are advisory.
pub fn like(conn: &Connection, tenant: TenantId, post: PostId) -> Result<i64> {
    let result = conn.query_row(
        "UPDATE feed_posts SET likes_count = likes_count + 1
         WHERE id = ?1 AND tenant_id = ?2
         RETURNING likes_count",
        rusqlite::params![post.as_i64(), tenant.as_i64()],
        |row| row.get(0),
    );

    match result {
        Ok(count) => Ok(count),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::not_found("post")),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Decrement a post's like counter, clamped at zero. Returns the new count.
pub fn unlike(conn: &Connection, tenant: TenantId, post: PostId) -> Result<i64> {
    let result = conn.query_row(
        "UPDATE feed_posts SET likes_count = MAX(likes_count - 1, 0)
         WHERE id = ?1 AND tenant_id = ?2
         RETURNING likes_count",
        rusqlite::params![post.as_i64(), tenant.as_i64()],
        |row| row.get(0),
    );

    match result {
        Ok(count) => Ok(count),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::not_found("post")),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete a post and its comments. Returns whether the post existed.
pub fn delete_post(conn: &Connection, tenant: TenantId, post: PostId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM feed_posts WHERE id = ?1 AND tenant_id = ?2",
            rusqlite::params![post.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}
