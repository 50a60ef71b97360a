//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. The column order expected by `from_row` matches the
//! `COLS` constant of the corresponding query module.

use chrono::{DateTime, Utc};
use commune_common::{
    ApplicationId, ApplicationStatus, CategoryId, DiscussionId, EventId, FeedParent, GroupId,
    GroupPostId, OpportunityId, OrganizationId, OrganizationStatus, PollId, PollOptionId, PostId,
    RedirectId, ReportId, ReportStatus, ReportTarget, ResourceId, ReviewId, ReviewTarget,
    RsvpStatus, ShiftId, TenantId, UserId, Visibility,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Parse an RFC 3339 timestamp from a text column.
fn parse_dt(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_dt(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(v) => DateTime::parse_from_rfc3339(&v)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
        None => Ok(None),
    }
}

/// Parse a closed-set tag (status, visibility, ...) from a text column.
fn parse_tag<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// User account row. Only the columns this layer touches are modeled;
/// authentication lives outside the data-access layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub display_name: String,
    pub points: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: UserId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            display_name: row.get(2)?,
            points: row.get(3)?,
            level: row.get(4)?,
            created_at: parse_dt(row, 5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// EventRsvp
// ---------------------------------------------------------------------------

/// RSVP row: exactly one per (event, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRsvp {
    pub id: i64,
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRsvp {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: TenantId::new(row.get(1)?),
            event_id: EventId::new(row.get(2)?),
            user_id: UserId::new(row.get(3)?),
            status: parse_tag(row, 4)?,
            created_at: parse_dt(row, 5)?,
            updated_at: parse_dt(row, 6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// FeedPost
// ---------------------------------------------------------------------------

/// Feed post or comment. Comments carry a polymorphic parent reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedPost {
    pub id: PostId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub content: String,
    pub emoji: Option<String>,
    pub image_url: Option<String>,
    pub parent: Option<FeedParent>,
    pub visibility: Visibility,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

impl FeedPost {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let parent_id: Option<i64> = row.get(6)?;
        let parent_type: Option<String> = row.get(7)?;
        let parent = match (parent_type, parent_id) {
            (Some(kind), Some(id)) => Some(
                FeedParent::from_parts(&kind, PostId::new(id)).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        7,
                        rusqlite::types::Type::Text,
                        format!("Invalid parent type: {}", kind).into(),
                    )
                })?,
            ),
            _ => None,
        };

        Ok(Self {
            id: PostId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            user_id: UserId::new(row.get(2)?),
            content: row.get(3)?,
            emoji: row.get(4)?,
            image_url: row.get(5)?,
            parent,
            visibility: parse_tag(row, 8)?,
            likes_count: row.get(9)?,
            created_at: parse_dt(row, 10)?,
        })
    }
}

// ---------------------------------------------------------------------------
// PointsEntry
// ---------------------------------------------------------------------------

/// Gamification points log entry. The action column stays a raw string on
/// the way out so historical tags survive enum changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointsEntry {
    pub id: i64,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub points: i64,
    pub action: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PointsEntry {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: TenantId::new(row.get(1)?),
            user_id: UserId::new(row.get(2)?),
            points: row.get(3)?,
            action: row.get(4)?,
            description: row.get(5)?,
            created_at: parse_dt(row, 6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// GroupDiscussion / GroupPost
// ---------------------------------------------------------------------------

/// Discussion thread with its per-request derived aggregates. `reply_count`
/// and `last_reply_at` are computed at query time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupDiscussion {
    pub id: DiscussionId,
    pub tenant_id: TenantId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub reply_count: i64,
    pub last_reply_at: Option<DateTime<Utc>>,
}

impl GroupDiscussion {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: DiscussionId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            group_id: GroupId::new(row.get(2)?),
            user_id: UserId::new(row.get(3)?),
            title: row.get(4)?,
            body: row.get(5)?,
            is_pinned: row.get::<_, i64>(6)? != 0,
            created_at: parse_dt(row, 7)?,
            reply_count: row.get(8)?,
            last_reply_at: parse_opt_dt(row, 9)?,
        })
    }
}

/// A reply inside a discussion thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupPost {
    pub id: GroupPostId,
    pub tenant_id: TenantId,
    pub discussion_id: DiscussionId,
    pub user_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl GroupPost {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: GroupPostId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            discussion_id: DiscussionId::new(row.get(2)?),
            user_id: UserId::new(row.get(3)?),
            body: row.get(4)?,
            created_at: parse_dt(row, 5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Poll / PollOption
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Poll {
    pub id: PollId,
    pub tenant_id: TenantId,
    pub created_by: UserId,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: PollId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            created_by: UserId::new(row.get(2)?),
            question: row.get(3)?,
            created_at: parse_dt(row, 4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOption {
    pub id: PollOptionId,
    pub poll_id: PollId,
    pub label: String,
    pub position: i64,
}

impl PollOption {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: PollOptionId::new(row.get(0)?),
            poll_id: PollId::new(row.get(1)?),
            label: row.get(2)?,
            position: row.get(3)?,
        })
    }
}

/// A poll option together with its live vote total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOptionResult {
    pub option: PollOption,
    pub votes: i64,
}

impl PollOptionResult {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            option: PollOption::from_row(row)?,
            votes: row.get(4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Abuse report with a polymorphic target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: ReportId,
    pub tenant_id: TenantId,
    pub reporter_id: UserId,
    pub target: ReportTarget,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let kind: String = row.get(3)?;
        let raw_id: i64 = row.get(4)?;
        let target = ReportTarget::from_parts(&kind, raw_id).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("Invalid report target type: {}", kind).into(),
            )
        })?;

        Ok(Self {
            id: ReportId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            reporter_id: UserId::new(row.get(2)?),
            target,
            reason: row.get(5)?,
            status: parse_tag(row, 6)?,
            created_at: parse_dt(row, 7)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Category / ResourceItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub tenant_id: TenantId,
    pub name: String,
}

impl Category {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: CategoryId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            name: row.get(2)?,
        })
    }
}

/// Resource library item. `file_path` is relative to the uploads root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceItem {
    pub id: ResourceId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub category_id: Option<CategoryId>,
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
}

impl ResourceItem {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: ResourceId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            user_id: UserId::new(row.get(2)?),
            title: row.get(3)?,
            description: row.get(4)?,
            file_path: row.get(5)?,
            file_type: row.get(6)?,
            file_size: row.get(7)?,
            category_id: row.get::<_, Option<i64>>(8)?.map(CategoryId::new),
            downloads: row.get(9)?,
            created_at: parse_dt(row, 10)?,
        })
    }
}

// ---------------------------------------------------------------------------
// SeoMetadata / SeoRedirect
// ---------------------------------------------------------------------------

/// SEO metadata row. `entity_id` of `None` is the site-wide default for its
/// entity type (persisted as 0 so the uniqueness constraint covers it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeoMetadata {
    pub id: i64,
    pub tenant_id: TenantId,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub meta_title: String,
    pub meta_description: String,
    pub og_image: Option<String>,
    pub noindex: bool,
    pub updated_at: DateTime<Utc>,
}

impl SeoMetadata {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let raw_entity: i64 = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            tenant_id: TenantId::new(row.get(1)?),
            entity_type: row.get(2)?,
            entity_id: (raw_entity != 0).then_some(raw_entity),
            meta_title: row.get(4)?,
            meta_description: row.get(5)?,
            og_image: row.get(6)?,
            noindex: row.get::<_, i64>(7)? != 0,
            updated_at: parse_dt(row, 8)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeoRedirect {
    pub id: RedirectId,
    pub tenant_id: TenantId,
    pub source_url: String,
    pub destination_url: String,
    pub hits: i64,
    pub created_at: DateTime<Utc>,
}

impl SeoRedirect {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: RedirectId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            source_url: row.get(2)?,
            destination_url: row.get(3)?,
            hits: row.get(4)?,
            created_at: parse_dt(row, 5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Volunteering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolOrganization {
    pub id: OrganizationId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub status: OrganizationStatus,
    pub created_at: DateTime<Utc>,
}

impl VolOrganization {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: OrganizationId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            user_id: UserId::new(row.get(2)?),
            name: row.get(3)?,
            description: row.get(4)?,
            logo_url: row.get(5)?,
            status: parse_tag(row, 6)?,
            created_at: parse_dt(row, 7)?,
        })
    }
}

/// Volunteer opportunity. Tenancy flows through the owning organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolOpportunity {
    pub id: OpportunityId,
    pub organization_id: OrganizationId,
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub is_remote: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl VolOpportunity {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: OpportunityId::new(row.get(0)?),
            organization_id: OrganizationId::new(row.get(1)?),
            category_id: row.get::<_, Option<i64>>(2)?.map(CategoryId::new),
            title: row.get(3)?,
            description: row.get(4)?,
            location: row.get(5)?,
            is_remote: row.get::<_, i64>(6)? != 0,
            is_active: row.get::<_, i64>(7)? != 0,
            created_at: parse_dt(row, 8)?,
        })
    }
}

/// Search result row: an opportunity joined with display fields of its
/// organization and category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpportunityListing {
    pub opportunity: VolOpportunity,
    pub org_name: String,
    pub category_name: Option<String>,
}

impl OpportunityListing {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            opportunity: VolOpportunity::from_row(row)?,
            org_name: row.get(9)?,
            category_name: row.get(10)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolShift {
    pub id: ShiftId,
    pub opportunity_id: OpportunityId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl VolShift {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: ShiftId::new(row.get(0)?),
            opportunity_id: OpportunityId::new(row.get(1)?),
            starts_at: parse_dt(row, 2)?,
            ends_at: parse_dt(row, 3)?,
            capacity: row.get(4)?,
            created_at: parse_dt(row, 5)?,
        })
    }
}

/// Volunteer application: at most one per (opportunity, user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolApplication {
    pub id: ApplicationId,
    pub opportunity_id: OpportunityId,
    pub user_id: UserId,
    pub shift_id: Option<ShiftId>,
    pub message: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl VolApplication {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: ApplicationId::new(row.get(0)?),
            opportunity_id: OpportunityId::new(row.get(1)?),
            user_id: UserId::new(row.get(2)?),
            shift_id: row.get::<_, Option<i64>>(3)?.map(ShiftId::new),
            message: row.get(4)?,
            status: parse_tag(row, 5)?,
            created_at: parse_dt(row, 6)?,
        })
    }
}

/// Volunteer review with a polymorphic target. Multiple reviews per
/// (reviewer, target) are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolReview {
    pub id: ReviewId,
    pub tenant_id: TenantId,
    pub reviewer_id: UserId,
    pub target: ReviewTarget,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl VolReview {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let kind: String = row.get(3)?;
        let raw_id: i64 = row.get(4)?;
        let target = ReviewTarget::from_parts(&kind, raw_id).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("Invalid review target type: {}", kind).into(),
            )
        })?;

        Ok(Self {
            id: ReviewId::new(row.get(0)?),
            tenant_id: TenantId::new(row.get(1)?),
            reviewer_id: UserId::new(row.get(2)?),
            target,
            rating: row.get(5)?,
            comment: row.get(6)?,
            created_at: parse_dt(row, 7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization() {
        let user = User {
            id: UserId::new(1),
            tenant_id: TenantId::new(1),
            display_name: "ada".to_string(),
            points: 120,
            level: 2,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        let deserialized: User = serde_json::from_str(&json).unwrap();
        assert_eq!(user, deserialized);
    }

    #[test]
    fn test_feed_post_serialization() {
        let post = FeedPost {
            id: PostId::new(3),
            tenant_id: TenantId::new(1),
            user_id: UserId::new(2),
            content: "hello".to_string(),
            emoji: Some("🎉".to_string()),
            image_url: None,
            parent: Some(FeedParent::Post(PostId::new(1))),
            visibility: Visibility::Public,
            likes_count: 0,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&post).unwrap();
        let deserialized: FeedPost = serde_json::from_str(&json).unwrap();
        assert_eq!(post, deserialized);
    }

    #[test]
    fn test_report_serialization() {
        let report = Report {
            id: ReportId::new(1),
            tenant_id: TenantId::new(1),
            reporter_id: UserId::new(4),
            target: ReportTarget::Comment(PostId::new(8)),
            reason: "spam".to_string(),
            status: ReportStatus::Open,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&report).unwrap();
        let deserialized: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(report, deserialized);
    }

    #[test]
    fn test_seo_metadata_site_wide_entity() {
        let meta = SeoMetadata {
            id: 1,
            tenant_id: TenantId::new(1),
            entity_type: "page".to_string(),
            entity_id: None,
            meta_title: "Home".to_string(),
            meta_description: String::new(),
            og_image: None,
            noindex: false,
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let deserialized: SeoMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, deserialized);
        assert!(deserialized.entity_id.is_none());
    }

    #[test]
    fn test_review_serialization() {
        let review = VolReview {
            id: ReviewId::new(2),
            tenant_id: TenantId::new(1),
            reviewer_id: UserId::new(5),
            target: ReviewTarget::Organization(OrganizationId::new(3)),
            rating: 5,
            comment: "great team".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&review).unwrap();
        let deserialized: VolReview = serde_json::from_str(&json).unwrap();
        assert_eq!(review, deserialized);
    }
}
