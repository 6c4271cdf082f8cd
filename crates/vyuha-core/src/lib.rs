pub mod agent;
pub mod commander;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod insights;
pub mod io;
pub mod ledger;
pub mod orchestrator;
pub mod paths;
pub mod shield;
pub mod types;

pub use error::{Result, VyuhaError};
