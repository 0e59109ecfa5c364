// Public API
pub mod config;
pub mod manifest;
pub mod runner;

// Internal modules - organized by subsystem
mod formats;
mod stages;
mod store;
mod warehouse;

#[cfg(test)]
mod integ_tests;
