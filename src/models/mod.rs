pub mod auth;
pub mod case;
pub mod doctor;
pub mod enums;
pub mod filters;

pub use auth::*;
pub use case::*;
pub use doctor::*;
pub use enums::*;
pub use filters::*;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
