//! Commune-DB: Database schema, migrations, and query operations
//!
//! This crate provides the data-access layer for commune using SQLite with
//! rusqlite and r2d2 connection pooling. Every operation is tenant-scoped:
//! the caller passes the `TenantId` explicitly, and each query filters by it.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database tables
//! - `queries` - Tenant-scoped query operations
//!
//! # Example
//!
//! ```no_run
//! use commune_common::TenantId;
//! use commune_db::pool::{init_pool, get_conn};
//! use commune_db::queries::users;
//!
//! let pool = init_pool("/var/lib/commune/db.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let user = users::create_user(&conn, TenantId::new(1), "ada").unwrap();
//! println!("Created user: {}", user.display_name);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
