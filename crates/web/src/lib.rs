//! Dar web application library.
//!
//! The server-rendered listing marketplace as a library, so the binary,
//! the router tests and the CLI share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
