//! API endpoint handlers, one module per upstream resource.

pub mod auth;
pub mod cases;
pub mod doctors;
pub mod health;
