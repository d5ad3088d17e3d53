//! Domain models.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod listing;
pub mod session;
pub mod user;

pub use listing::{Listing, NewListing};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
