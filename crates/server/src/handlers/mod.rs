//! HTTP request handlers.

pub mod common;
pub mod files;
pub mod health;
pub mod measurements;
pub mod vpn;

pub use files::*;
pub use health::*;
pub use measurements::*;
pub use vpn::*;
