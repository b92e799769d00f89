//! Repository traits (ports)

mod repositories;

pub use repositories::{MembershipRepository, RepoResult, UserRepository};
