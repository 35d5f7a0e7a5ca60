//! HTTP protocol layer module
//!
//! Cookie serialization and response builders, decoupled from specific business logic.

pub mod cookie;
pub mod response;

// Re-export commonly used types
pub use cookie::{set_cookie, Cookie};
pub use response::{build_404_response, build_empty_response};
