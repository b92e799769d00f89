//! # aeon-db
//!
//! Directory layer implementing the `aeon-core` repository ports.
//!
//! ## Overview
//!
//! - PostgreSQL connection pool management
//! - `PgUserRepository` and `PgMembershipRepository` over the messenger schema
//!   (`users`, `chat_members`)
//! - `MemoryDirectory`, an in-process implementation of both ports for tests
//!   and local runs without a database
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aeon_db::{create_pool, DatabaseConfig, PgMembershipRepository};
//! use aeon_core::MembershipRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     let memberships = PgMembershipRepository::new(pool);
//!     let chats = memberships.chat_ids_for_user(42.into()).await?;
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryDirectory;
pub use pool::{create_pool, DatabaseConfig, PgPool};
pub use repositories::{PgMembershipRepository, PgUserRepository};
