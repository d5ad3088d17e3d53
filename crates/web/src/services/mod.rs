//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password sign-up, sign-in and reset
//! - `browse` - Listing search, "load more" cursors and home sections
//! - `email` - Password reset email delivery
//! - `geocode` - Address to coordinates lookup
//! - `images` - Listing image validation and storage
//! - `listings` - Listing form validation and owner-only mutation

pub mod auth;
pub mod browse;
pub mod email;
pub mod geocode;
pub mod images;
pub mod listings;

pub use auth::{AuthError, AuthService};
pub use browse::{BrowsePage, BrowseParams, Cursor, HomeCache, HomeSections, ListingQuery};
pub use email::{EmailError, EmailService};
pub use geocode::{GeocodeError, Geocoder};
pub use images::{ImageError, ImageStore, ImageUpload};
pub use listings::{ListingDraft, ListingError, ListingForm, ListingService, Position, ValidationError};
