//! Core types for Dar.
//!
//! This module provides type-safe wrappers for the marketplace's domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod listing;
pub mod price;
pub mod region;

pub use email::{Email, EmailError};
pub use geo::{GeoError, GeoPoint};
pub use id::*;
pub use listing::{Amenity, ListingType, ParseVocabularyError, PropertyType};
pub use price::{CurrencyCode, Price};
pub use region::{Region, cities_in, find_region, regions};
