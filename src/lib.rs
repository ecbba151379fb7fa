//! Power supervisor library
//!
//! State machines and signal filters behind the robot's power board:
//! - Power-button long press detection (edge path, timer path, polling path)
//! - Battery percentage and charge/system status with hysteresis
//! - Median, sliding-average and rate-limit filtering of sensor readings
//! - Two-segment status indicator driven by a periodic tick
//!
//! Hardware is reached only through `embedded-hal` pins and the capability
//! traits in [`system::sensors`], [`system::button`] and [`system::power`], so
//! everything here runs on the host as well as on the RP2350.
//!
//! # Testing
//!
//! ```text
//! cargo test --lib --target x86_64-unknown-linux-gnu
//! ```
//!
//! The firmware binary (`main.rs`) wires these pieces to embassy tasks.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// Must stay first so the logging macros are visible to every module below
#[macro_use]
mod fmt;

pub mod system;

pub use system::error::Error;
