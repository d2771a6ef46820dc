//! Data models for the Fit Hub tracker.
//!
//! These models match the admin UI JSON shapes (camelCase) so stored documents and API payloads are interchangeable.

mod audit;
mod history;
mod member;
mod week;

pub use audit::*;
pub use history::*;
pub use member::*;
pub use week::*;
