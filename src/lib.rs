//! # DSU Bridge Library
//!
//! Feed head-tracking poses to emulators as DSU (cemuhook) controller motion.
//!
//! This library provides the core functionality for bridging opentrack UDP
//! pose output to the DSU protocol, so any DSU client reads head movement
//! as accelerometer and gyroscope data of a virtual controller.

pub mod bridge;
pub mod config;
pub mod error;
pub mod dsu;
pub mod session;
pub mod tracking;
pub mod transport;
