//! Reads an AD7190 on a Raspberry Pi: configuration loading and the measurement sequence
//! shared by the `pi` binary.

pub mod config;
pub mod session;
