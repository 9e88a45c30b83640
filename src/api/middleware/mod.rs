//! Relay middleware: bearer extraction for protected routes and access
//! logging for everything.

pub mod audit;
pub mod auth;
