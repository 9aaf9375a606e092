pub mod authorization;

pub use authorization::{AccessGate, PermissionAdmin, PermissionResolver};
