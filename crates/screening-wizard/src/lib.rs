//! Step wizard engine and HTTP surface for recording breast-screening appointments.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod wizard;
pub mod workflows;
