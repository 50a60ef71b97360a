//! Core enums shared across the data-access layer.
//!
//! Statuses, visibilities, and polymorphic target references are all closed
//! sets. They are stored as lowercase text columns and parsed back through
//! `FromStr`, so an unknown tag coming out of the database is a conversion
//! error rather than a silently accepted string.

use crate::ids::{EventId, OpportunityId, OrganizationId, PostId, ResourceId, UserId};
use serde::{Deserialize, Serialize};

/// RSVP status for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Interested,
    NotGoing,
    Declined,
}

impl std::fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Going => write!(f, "going"),
            Self::Interested => write!(f, "interested"),
            Self::NotGoing => write!(f, "not_going"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

impl std::str::FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "going" => Ok(Self::Going),
            "interested" => Ok(Self::Interested),
            "not_going" => Ok(Self::NotGoing),
            "declined" => Ok(Self::Declined),
            _ => Err(format!("Invalid RSVP status: {}", s)),
        }
    }
}

/// Visibility of a feed post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Friends,
    Private,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Friends => write!(f, "friends"),
            Self::Private => write!(f, "private"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "private" => Ok(Self::Private),
            _ => Err(format!("Invalid visibility: {}", s)),
        }
    }
}

/// Polymorphic parent of a feed entry: a comment hangs off a post or off
/// another comment. Both live in the same table, so the payload is a `PostId`
/// either way; the tag records which kind the author replied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum FeedParent {
    Post(PostId),
    Comment(PostId),
}

impl FeedParent {
    /// The type tag stored in the `parent_type` column.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Comment(_) => "comment",
        }
    }

    /// The referenced row id.
    #[must_use]
    pub fn id(self) -> PostId {
        match self {
            Self::Post(id) | Self::Comment(id) => id,
        }
    }

    /// Reassemble from a stored (tag, id) pair.
    #[must_use]
    pub fn from_parts(kind: &str, id: PostId) -> Option<Self> {
        match kind {
            "post" => Some(Self::Post(id)),
            "comment" => Some(Self::Comment(id)),
            _ => None,
        }
    }
}

/// Lifecycle status of an abuse report. Any status can be set from any other;
/// there is no enforced transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Resolved,
    Dismissed,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Resolved => write!(f, "resolved"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            "dismissed" => Ok(Self::Dismissed),
            _ => Err(format!("Invalid report status: {}", s)),
        }
    }
}

/// What an abuse report points at: a (type tag, id) pair over the closed set
/// of reportable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ReportTarget {
    Post(PostId),
    Comment(PostId),
    User(UserId),
    Resource(ResourceId),
    Event(EventId),
}

impl ReportTarget {
    /// The type tag stored in the `target_type` column.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Comment(_) => "comment",
            Self::User(_) => "user",
            Self::Resource(_) => "resource",
            Self::Event(_) => "event",
        }
    }

    /// The raw referenced row id.
    #[must_use]
    pub fn raw_id(self) -> i64 {
        match self {
            Self::Post(id) | Self::Comment(id) => id.as_i64(),
            Self::User(id) => id.as_i64(),
            Self::Resource(id) => id.as_i64(),
            Self::Event(id) => id.as_i64(),
        }
    }

    /// Reassemble from a stored (tag, id) pair.
    #[must_use]
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "post" => Some(Self::Post(PostId::new(id))),
            "comment" => Some(Self::Comment(PostId::new(id))),
            "user" => Some(Self::User(UserId::new(id))),
            "resource" => Some(Self::Resource(ResourceId::new(id))),
            "event" => Some(Self::Event(EventId::new(id))),
            _ => None,
        }
    }
}

/// Review status of a volunteer organization. Only approved organizations
/// surface in opportunity searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Pending,
    Approved,
    Suspended,
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

impl std::str::FromStr for OrganizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "suspended" => Ok(Self::Suspended),
            _ => Err(format!("Invalid organization status: {}", s)),
        }
    }
}

/// Lifecycle status of a volunteer application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            _ => Err(format!("Invalid application status: {}", s)),
        }
    }
}

/// What a volunteer review points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ReviewTarget {
    Organization(OrganizationId),
    Opportunity(OpportunityId),
    Volunteer(UserId),
}

impl ReviewTarget {
    /// The type tag stored in the `target_type` column.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Organization(_) => "organization",
            Self::Opportunity(_) => "opportunity",
            Self::Volunteer(_) => "volunteer",
        }
    }

    /// The raw referenced row id.
    #[must_use]
    pub fn raw_id(self) -> i64 {
        match self {
            Self::Organization(id) => id.as_i64(),
            Self::Opportunity(id) => id.as_i64(),
            Self::Volunteer(id) => id.as_i64(),
        }
    }

    /// Reassemble from a stored (tag, id) pair.
    #[must_use]
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "organization" => Some(Self::Organization(OrganizationId::new(id))),
            "opportunity" => Some(Self::Opportunity(OpportunityId::new(id))),
            "volunteer" => Some(Self::Volunteer(UserId::new(id))),
            _ => None,
        }
    }
}

/// Actions that earn gamification points. Point values are fixed per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreatePost,
    AttendEvent,
    CreateEvent,
    JoinGroup,
    CreateGroup,
    VotePoll,
    LeaveReview,
    VolunteerHour,
    CompleteProfile,
    DailyLogin,
}

impl Action {
    /// Points awarded for this action.
    #[must_use]
    pub fn points(self) -> i64 {
        match self {
            Self::CreatePost => 5,
            Self::AttendEvent => 15,
            Self::CreateEvent => 30,
            Self::JoinGroup => 10,
            Self::CreateGroup => 50,
            Self::VotePoll => 2,
            Self::LeaveReview => 10,
            Self::VolunteerHour => 20,
            Self::CompleteProfile => 50,
            Self::DailyLogin => 5,
        }
    }

    /// The tag stored in the `points_log.action` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatePost => "create_post",
            Self::AttendEvent => "attend_event",
            Self::CreateEvent => "create_event",
            Self::JoinGroup => "join_group",
            Self::CreateGroup => "create_group",
            Self::VotePoll => "vote_poll",
            Self::LeaveReview => "leave_review",
            Self::VolunteerHour => "volunteer_hour",
            Self::CompleteProfile => "complete_profile",
            Self::DailyLogin => "daily_login",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cumulative point thresholds per level, starting at level 1.
const LEVEL_THRESHOLDS: &[i64] = &[0, 100, 300, 600, 1000, 1500, 2200, 3000, 4000, 5500];

/// Compute a user's level from their cumulative points.
#[must_use]
pub fn level_for_points(points: i64) -> u32 {
    let mut level = 1;
    for (idx, threshold) in LEVEL_THRESHOLDS.iter().enumerate() {
        if points >= *threshold {
            level = idx as u32 + 1;
        }
    }
    level
}
