//! Group discussion queries.
//!
//! Reply counts and last-reply timestamps are derived per request with
//! correlated subqueries, never stored. Listing orders pinned threads first,
//! then by most recent activity (last reply, falling back to the thread's own
//! creation time).

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{DiscussionId, Error, GroupId, GroupPostId, Result, TenantId, UserId};

use crate::models::{GroupDiscussion, GroupPost};
use crate::queries::clamp_limit;

const COLS: &str = "d.id, d.tenant_id, d.group_id, d.user_id, d.title, d.body, d.is_pinned, \
     d.created_at, \
     (SELECT COUNT(*) FROM group_posts p WHERE p.discussion_id = d.id) AS reply_count, \
     (SELECT MAX(p.created_at) FROM group_posts p WHERE p.discussion_id = d.id) AS last_reply_at";

const POST_COLS: &str = "id, tenant_id, discussion_id, user_id, body, created_at";

/// Start a new discussion thread in a group.
pub fn create_discussion(
    conn: &Connection,
    tenant: TenantId,
    group: GroupId,
    user: UserId,
    title: &str,
    body: &str,
) -> Result<GroupDiscussion> {
    if title.trim().is_empty() {
        return Err(Error::invalid_input("discussion needs a title"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO group_discussions (tenant_id, group_id, user_id, title, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            tenant.as_i64(),
            group.as_i64(),
            user.as_i64(),
            title,
            body,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(GroupDiscussion {
        id: DiscussionId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        group_id: group,
        user_id: user,
        title: title.to_string(),
        body: body.to_string(),
        is_pinned: false,
        created_at: now,
        reply_count: 0,
        last_reply_at: None,
    })
}

/// Add a reply to a discussion. Fails with `NotFound` when the discussion
/// does not exist in this tenant.
pub fn add_post(
    conn: &Connection,
    tenant: TenantId,
    discussion: DiscussionId,
    user: UserId,
    body: &str,
) -> Result<GroupPost> {
    if body.trim().is_empty() {
        return Err(Error::invalid_input("reply needs content"));
    }

    get_discussion(conn, tenant, discussion)?.ok_or_else(|| Error::not_found("discussion"))?;

    let now = Utc::now();

    conn.execute(
        "INSERT INTO group_posts (tenant_id, discussion_id, user_id, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            tenant.as_i64(),
            discussion.as_i64(),
            user.as_i64(),
            body,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(GroupPost {
        id: GroupPostId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        discussion_id: discussion,
        user_id: user,
        body: body.to_string(),
        created_at: now,
    })
}

/// Get one discussion with its derived aggregates.
pub fn get_discussion(
    conn: &Connection,
    tenant: TenantId,
    id: DiscussionId,
) -> Result<Option<GroupDiscussion>> {
    let q = format!(
        "SELECT {COLS} FROM group_discussions d WHERE d.id = ?1 AND d.tenant_id = ?2"
    );
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        GroupDiscussion::from_row,
    );

    match result {
        Ok(discussion) => Ok(Some(discussion)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a group's discussions: pinned first, then by latest activity.
pub fn list_discussions(
    conn: &Connection,
    tenant: TenantId,
    group: GroupId,
    limit: i64,
) -> Result<Vec<GroupDiscussion>> {
    let q = format!(
        "SELECT {COLS} FROM group_discussions d
         WHERE d.tenant_id = ?1 AND d.group_id = ?2
         ORDER BY d.is_pinned DESC,
             COALESCE((SELECT MAX(p.created_at) FROM group_posts p
                       WHERE p.discussion_id = d.id), d.created_at) DESC,
             d.id DESC
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), group.as_i64(), clamp_limit(limit)],
            GroupDiscussion::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List a discussion's replies, oldest first.
pub fn posts(
    conn: &Connection,
    tenant: TenantId,
    discussion: DiscussionId,
) -> Result<Vec<GroupPost>> {
    let q = format!(
        "SELECT {POST_COLS} FROM group_posts
         WHERE tenant_id = ?1 AND discussion_id = ?2
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), discussion.as_i64()],
            GroupPost::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Pin or unpin a discussion. Returns whether a row was updated.
pub fn set_pinned(
    conn: &Connection,
    tenant: TenantId,
    id: DiscussionId,
    pinned: bool,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE group_discussions SET is_pinned = ?1 WHERE id = ?2 AND tenant_id = ?3",
            rusqlite::params![i64::from(pinned), id.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Delete a discussion and its replies. Returns whether the thread existed.
pub fn delete_discussion(conn: &Connection, tenant: TenantId, id: DiscussionId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM group_discussions WHERE id = ?1 AND tenant_id = ?2",
            rusqlite::params![id.as_i64(), tenant.as_i64()],
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
    const GROUP: GroupId = GroupId::new(1);

    #[test]
    fn test_create_and_get_discussion() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let created =
            create_discussion(&conn, TENANT, GROUP, user.id, "welcome", "say hi").unwrap();
        let fetched = get_discussion(&conn, TENANT, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.reply_count, 0);
        assert!(fetched.last_reply_at.is_none());
    }

    #[test]
    fn test_reply_aggregates_are_derived() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let thread =
            create_discussion(&conn, TENANT, GROUP, user.id, "thread", "body").unwrap();
        add_post(&conn, TENANT, thread.id, user.id, "first").unwrap();
        let second = add_post(&conn, TENANT, thread.id, user.id, "second").unwrap();

        let fetched = get_discussion(&conn, TENANT, thread.id).unwrap().unwrap();
        assert_eq!(fetched.reply_count, 2);
        assert_eq!(fetched.last_reply_at, Some(second.created_at));

        let replies = posts(&conn, TENANT, thread.id).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].body, "first");
    }

    #[test]
    fn test_add_post_missing_discussion() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let result = add_post(&conn, TENANT, DiscussionId::new(42), user.id, "hello");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_orders_pinned_then_activity() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let quiet = create_discussion(&conn, TENANT, GROUP, user.id, "quiet", "").unwrap();
        let busy = create_discussion(&conn, TENANT, GROUP, user.id, "busy", "").unwrap();
        let pinned = create_discussion(&conn, TENANT, GROUP, user.id, "rules", "").unwrap();

        set_pinned(&conn, TENANT, pinned.id, true).unwrap();
        // A reply bumps "busy" above "quiet" even though "quiet" is older.
        add_post(&conn, TENANT, busy.id, user.id, "bump").unwrap();

        let listed = list_discussions(&conn, TENANT, GROUP, 50).unwrap();
        let ids: Vec<_> = listed.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![pinned.id, busy.id, quiet.id]);
    }

    #[test]
    fn test_delete_discussion_cascades() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();

        let thread = create_discussion(&conn, TENANT, GROUP, user.id, "bye", "").unwrap();
        add_post(&conn, TENANT, thread.id, user.id, "reply").unwrap();

        assert!(delete_discussion(&conn, TENANT, thread.id).unwrap());
        assert!(get_discussion(&conn, TENANT, thread.id).unwrap().is_none());
        assert!(posts(&conn, TENANT, thread.id).unwrap().is_empty());
    }

    #[test]
    fn test_tenant_scoping() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, TENANT, "ada").unwrap();
        let thread = create_discussion(&conn, TENANT, GROUP, user.id, "mine", "").unwrap();

        let other = TenantId::new(2);
        assert!(get_discussion(&conn, other, thread.id).unwrap().is_none());
        assert!(!set_pinned(&conn, other, thread.id, true).unwrap());
        assert!(list_discussions(&conn, other, GROUP, 50).unwrap().is_empty());
    }
}
