//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Each ID type is a newtype over `i64` (the storage rowid), preventing
//! accidental misuse (e.g., passing a `UserId` where a `PollId` is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a newtype ID wrapper over `i64`.
///
/// The macro produces a struct with:
/// - `new(raw)` and `as_i64()` conversions
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Serialize`, `Deserialize`
/// - `Display` and `FromStr` delegating to the inner integer
/// - `From<i64>` and `Into<i64>` conversions
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(i64);

            impl $name {
                /// Wrap a raw database identifier.
                #[must_use]
                pub const fn new(raw: i64) -> Self {
                    Self(raw)
                }

                /// Return the inner integer value.
                #[must_use]
                pub const fn as_i64(self) -> i64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = std::num::ParseIntError;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    s.parse::<i64>().map(Self)
                }
            }

            impl From<i64> for $name {
                fn from(raw: i64) -> Self {
                    Self(raw)
                }
            }

            impl From<$name> for i64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Identifier for a tenant (isolated customer/organization partition).
    TenantId,
    /// Identifier for a user account.
    UserId,
    /// Identifier for an event (events live outside this layer).
    EventId,
    /// Identifier for a feed post or comment.
    PostId,
    /// Identifier for a community group (groups live outside this layer).
    GroupId,
    /// Identifier for a group discussion thread.
    DiscussionId,
    /// Identifier for a reply inside a group discussion.
    GroupPostId,
    /// Identifier for a poll.
    PollId,
    /// Identifier for a poll option.
    PollOptionId,
    /// Identifier for an abuse report.
    ReportId,
    /// Identifier for a resource category.
    CategoryId,
    /// Identifier for a resource library item.
    ResourceId,
    /// Identifier for an SEO redirect rule.
    RedirectId,
    /// Identifier for a volunteer organization.
    OrganizationId,
    /// Identifier for a volunteer opportunity.
    OpportunityId,
    /// Identifier for a volunteer shift.
    ShiftId,
    /// Identifier for a volunteer application.
    ApplicationId,
    /// Identifier for a volunteer review.
    ReviewId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = PollId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(PollId::from(42), id);
    }

    #[test]
    fn test_id_display() {
        let id = TenantId::new(7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_id_from_str() {
        let id: UserId = "123".parse().unwrap();
        assert_eq!(id, UserId::new(123));
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn test_id_serialization() {
        let id = ResourceId::new(9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "9");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_different_id_types() {
        let _user_id = UserId::new(1);
        let _poll_id = PollId::new(1);
        // Type system prevents mixing these at compile time
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(EventId::new(5));
        assert!(set.contains(&EventId::new(5)));
        assert!(!set.contains(&EventId::new(6)));
    }
}
