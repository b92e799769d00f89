//! Event broadcasting
//!
//! Turns domain events into fan-out over chat subscriptions.

mod router;

pub use router::EventRouter;
