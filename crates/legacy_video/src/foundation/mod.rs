//! Foundation module - Core utilities shared across the crate

pub mod logging;
