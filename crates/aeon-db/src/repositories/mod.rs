//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in aeon-core.

mod error;
mod membership;
mod user;

pub use membership::PgMembershipRepository;
pub use user::PgUserRepository;
