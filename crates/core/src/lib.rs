//! Core domain types and shared logic for the measurement data API.
//!
//! This crate defines the pieces shared by the store, archive and server crates:
//! - Service configuration
//! - Probe ASN normalization and display
//! - Listing filters (sort order, tri-state booleans, timestamps)
//! - Page arithmetic and lazily known totals
//! - LZ4 archive frame decoding and record slicing
//! - VPN certificate bundles

pub mod config;
pub mod error;
pub mod filter;
pub mod frame;
pub mod page;
pub mod probe;
pub mod vpn;

pub use error::{Error, Result};
pub use filter::{SortOrder, TriState, parse_timestamp, since_index_bound};
pub use frame::{decompress_frame, extract_record, slice_record};
pub use page::{PageMetadata, Pagination, TotalCount};
pub use probe::ProbeAsn;
pub use vpn::VpnCredentials;

/// Default page size for listing endpoints.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 1000;

/// Default upper bound on a compressed frame fetched from the archive store (128 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: u64 = 128 * 1024 * 1024;
