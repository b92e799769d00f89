//! # aeon-core
//!
//! Domain layer containing identifiers, domain errors, and the repository ports
//! the realtime gateway consumes. This crate has zero dependencies on
//! infrastructure (database, web framework, etc.).

pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::DomainError;
pub use traits::{MembershipRepository, RepoResult, UserRepository};
pub use value_objects::{ChatId, IdParseError, MessageId, TelegramId, UserId};
