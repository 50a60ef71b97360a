//! Volunteer review queries.
//!
//! Reviews point at an organization, an opportunity, or a volunteer through
//! a (type tag, id) pair. Ratings are 1 to 5; averages are computed live.

use chrono::Utc;
use rusqlite::Connection;

use commune_common::{Error, Result, ReviewId, ReviewTarget, TenantId, UserId};

use crate::models::VolReview;
use crate::queries::clamp_limit;

const COLS: &str = "id, tenant_id, reviewer_id, target_type, target_id, rating, comment, created_at";

/// Leave a review. Ratings outside 1..=5 are rejected.
pub fn create_review(
    conn: &Connection,
    tenant: TenantId,
    reviewer: UserId,
    target: ReviewTarget,
    rating: i64,
    comment: &str,
) -> Result<VolReview> {
    if !(1..=5).contains(&rating) {
        return Err(Error::invalid_input("rating must be between 1 and 5"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO vol_reviews (tenant_id, reviewer_id, target_type, target_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tenant.as_i64(),
            reviewer.as_i64(),
            target.kind(),
            target.raw_id(),
            rating,
            comment,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VolReview {
        id: ReviewId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        reviewer_id: reviewer,
        target,
        rating,
        comment: comment.to_string(),
        created_at: now,
    })
}

/// List reviews for one target, newest first.
pub fn list_for_target(
    conn: &Connection,
    tenant: TenantId,
    target: ReviewTarget,
    limit: i64,
) -> Result<Vec<VolReview>> {
    let q = format!(
        "SELECT {COLS} FROM vol_reviews
         WHERE tenant_id = ?1 AND target_type = ?2 AND target_id = ?3
         ORDER BY created_at DESC, id DESC LIMIT ?4"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                tenant.as_i64(),
                target.kind(),
                target.raw_id(),
                clamp_limit(limit)
            ],
            VolReview::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Live average rating for a target, `None` when it has no reviews.
pub fn average_rating(
    conn: &Connection,
    tenant: TenantId,
    target: ReviewTarget,
) -> Result<Option<f64>> {
    conn.query_row(
        "SELECT AVG(rating) FROM vol_reviews
         WHERE tenant_id = ?1 AND target_type = ?2 AND target_id = ?3",
        rusqlite::params![tenant.as_i64(), target.kind(), target.raw_id()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
