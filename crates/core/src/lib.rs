//! Dar Core - Shared domain types.
//!
//! This crate provides the types used across all Dar components:
//! - `web` - The marketplace web application
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, listing vocabularies, the region
//!   catalog and geographic points

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
