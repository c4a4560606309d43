//! Catalog subsystem: record types, input loading, and durable run artifacts.

pub mod checkpoint;
pub mod types;
