//! Repository traits for metadata operations.

pub mod measurements;
pub mod reports;
pub mod vpn;

pub use measurements::MeasurementRepo;
pub use reports::ReportRepo;
pub use vpn::VpnConfigRepo;
