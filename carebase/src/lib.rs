//! Carebase authorization library
//!
//! Permission resolution and access gating for the carebase hospital
//! management application. The binary is a thin administration CLI on top.

pub mod app_state;
pub mod init_telemetry;
pub mod services;
pub mod settings;
