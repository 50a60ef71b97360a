//! Poll queries.
//!
//! Voting is insert-once under the natural key (poll, user), backed by a
//! unique index: casting a second vote is a no-op reported as `false`, never
//! an overwrite. Vote totals are counted live from the votes table.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, PollId, PollOptionId, Result, TenantId, UserId};

use crate::models::{Poll, PollOption, PollOptionResult};
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, created_by, question, created_at";

/// Create a poll with its options. At least two options are required.
pub fn create_poll(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    question: &str,
    options: &[&str],
) -> Result<Poll> {
    if question.trim().is_empty() {
        return Err(Error::invalid_input("poll needs a question"));
    }
    if options.len() < 2 {
        return Err(Error::invalid_input("poll needs at least two options"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO polls (tenant_id, created_by, question, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            tenant.as_i64(),
            user.as_i64(),
            question,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let poll_id = conn.last_insert_rowid();

    for (position, label) in options.iter().enumerate() {
        conn.execute(
            "INSERT INTO poll_options (poll_id, label, position) VALUES (?1, ?2, ?3)",
            rusqlite::params![poll_id, label, position as i64],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(Poll {
        id: PollId::new(poll_id),
        tenant_id: tenant,
        created_by: user,
        question: question.to_string(),
        created_at: now,
    })
}

/// Get a poll by id, scoped to the tenant.
pub fn get_poll(conn: &Connection, tenant: TenantId, id: PollId) -> Result<Option<Poll>> {
    let q = format!("SELECT {COLS} FROM polls WHERE id = ?1 AND tenant_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        Poll::from_row,
    );

    match result {
        Ok(poll) => Ok(Some(poll)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a tenant's polls, newest first.
pub fn list_polls(conn: &Connection, tenant: TenantId, limit: i64) -> Result<Vec<Poll>> {
    let q = format!(
        "SELECT {COLS} FROM polls WHERE tenant_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![tenant.as_i64(), clamp_limit(limit)],
            Poll::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Cast a vote. Returns `true` if the vote was recorded, `false` if the user
/// had already voted in this poll. Fails with `InvalidInput` when the option
/// does not belong to the poll (or the poll to the tenant).
pub fn cast_vote(
    conn: &Connection,
    tenant: TenantId,
    poll: PollId,
    option: PollOptionId,
    user: UserId,
) -> Result<bool> {
    let valid: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM poll_options o
             JOIN polls p ON p.id = o.poll_id
             WHERE o.id = ?1 AND o.poll_id = ?2 AND p.tenant_id = ?3",
            rusqlite::params![option.as_i64(), poll.as_i64(), tenant.as_i64()],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if valid == 0 {
        return Err(Error::invalid_input("option does not belong to this poll"));
    }

    let n = conn
        .execute(
            "INSERT INTO poll_votes (poll_id, option_id, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(poll_id, user_id) DO NOTHING",
            rusqlite::params![
                poll.as_i64(),
                option.as_i64(),
                user.as_i64(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Whether a user has already voted in a poll.
pub fn has_voted(
    conn: &Connection,
    tenant: TenantId,
    poll: PollId,
    user: UserId,
) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM poll_votes v
             JOIN polls p ON p.id = v.poll_id
             WHERE v.poll_id = ?1 AND v.user_id = ?2 AND p.tenant_id = ?3",
            rusqlite::params![poll.as_i64(), user.as_i64(), tenant.as_i64()],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(count > 0)
}

/// Per-option live vote totals, in option order.
pub fn results(
    conn: &Connection,
    tenant: TenantId,
    poll: PollId,
) -> Result<Vec<PollOptionResult>> {
    let mut stmt = conn
        .prepare(
            "SELECT o.id, o.poll_id, o.label, o.position, COUNT(v.id)
             FROM poll_options o
             JOIN polls p ON p.id = o.poll_id
             LEFT JOIN poll_votes v ON v.option_id = o.id
             WHERE o.poll_id = ?1 AND p.tenant_id = ?2
             GROUP BY o.id, o.poll_id, o.label, o.position
             ORDER BY o.position ASC",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![poll.as_i64(), tenant.as_i64()],
            PollOptionResult::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List a poll's options in position order, without vote totals.
pub fn options(conn: &Connection, tenant: TenantId, poll: PollId) -> Result<Vec<PollOption>> {
    let mut stmt = conn
        .prepare(
            "SELECT o.id, o.poll_id, o.label, o.position FROM poll_options o
             JOIN polls p ON p.id = o.poll_id
             WHERE o.poll_id = ?1 AND p.tenant_id = ?2
             ORDER BY o.position ASC",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![poll.as_i64(), tenant.as_i64()],
            PollOption::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
