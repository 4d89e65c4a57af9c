//! One handler module per method family.

pub mod auth;
pub mod core;
pub mod records;
