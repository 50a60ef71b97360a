//! Database query modules.
//!
//! This module organizes all tenant-scoped operations into logical groups:
//! - users: Minimal user rows (points/level live here)
//! - rsvps: Event RSVP upsert and counts
//! - feed: Social feed posts, comments, and likes
//! - gamification: Points awards and startup schema validation
//! - discussions: Group discussions with derived reply aggregates
//! - polls: Polls, options, and vote-once casting
//! - reports: Abuse reports over polymorphic targets
//! - resources: Resource library with guarded file deletion
//! - seo_metadata: Per-entity and site-wide SEO metadata upsert
//! - seo_redirects: Redirect rules with hit counting
//! - opportunities: Volunteer organizations, opportunities, and shifts
//! - applications: Apply-once volunteer applications
//! - reviews: Volunteer reviews over polymorphic targets

pub mod applications;
pub mod discussions;
pub mod feed;
pub mod gamification;
pub mod opportunities;
pub mod polls;
pub mod reports;
pub mod resources;
pub mod reviews;
pub mod rsvps;
pub mod seo_metadata;
pub mod seo_redirects;
pub mod users;

/// Hard ceiling on page sizes. Listing queries bind the limit as a
/// parameter after clamping it into `1..=MAX_PAGE_SIZE`.
pub const MAX_PAGE_SIZE: i64 = 100;

pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}
