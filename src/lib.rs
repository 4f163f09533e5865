pub use crate::error::HarnessError;

pub mod cli;
pub mod config;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod overrides;
pub mod report;
pub mod sandbox;
pub mod script;
pub mod serialize;
pub mod value;
