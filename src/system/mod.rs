//! Core system components for power supervision
pub mod battery;
pub mod button;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod ina226;
pub mod indicator;
pub mod power;
pub mod sensors;
pub mod state;
pub mod supervisor;
