//! Commune-Common: Shared types, IDs, and utilities.
//!
//! This crate provides common functionality used across commune:
//!
//! - **Typed IDs**: Type-safe integer wrappers for tenants, users, polls, etc.
//! - **Core Types**: Closed enums for RSVP statuses, report targets, visibility,
//!   application statuses, and gamification actions
//! - **Path Utilities**: Containment checks for files under the uploads root
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use commune_common::{TenantId, RsvpStatus, Error, Result};
//!
//! let tenant = TenantId::new(1);
//! let status: RsvpStatus = "going".parse().unwrap();
//! assert_eq!(status, RsvpStatus::Going);
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("poll"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
