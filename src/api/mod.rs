//! Backend API integration module
//!
//! Typed request functions and payloads for the signal backend.

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use client::ApiClient;
pub use error::ApiError;
pub use types::*;
