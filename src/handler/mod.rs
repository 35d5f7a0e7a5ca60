//! Request handler module
//!
//! Route table dispatch and the cookie-setting handler.

pub mod cookies;
pub mod router;

// Re-export main entry point
pub use router::{handle_request, RouteTable};
