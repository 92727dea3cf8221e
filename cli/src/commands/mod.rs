//! Command implementations

pub mod deploy;
pub mod plan;
pub mod status;
pub mod unit;
pub mod version;
