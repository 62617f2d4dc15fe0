//! Archive store backends.

pub mod filesystem;
pub mod http;
