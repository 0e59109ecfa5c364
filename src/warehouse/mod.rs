//! Warehouse access: a single-connection client and dialect-aware SQL builders

pub mod client;
pub mod sql;

pub use client::Warehouse;
