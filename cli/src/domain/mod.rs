//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`
//! sockets. All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod plan;
pub mod stage;
pub mod unit;

pub use config::{DeployConfig, Privilege};
pub use error::{ConfigError, DeployError, StageError};
pub use plan::{HostObservation, Plan, build_plan};
pub use stage::RunMachine;
pub use unit::render_unit;
