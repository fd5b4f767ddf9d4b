#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod command;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod indicator;
pub mod network;
pub mod report;
pub mod sensor;
pub mod time;
pub mod types;

#[cfg(test)]
mod mock;

pub use config::*;
pub use controller::*;
pub use error::*;
pub use types::*;
