//! statewatch: device state change recorder
//!
//! A library for polling the state of a fixed set of controls on a
//! home-automation device and recording only the values that changed.

pub mod changelog;
pub mod config;
pub mod entity;
pub mod fetch;
pub mod monitor;
pub mod time;
