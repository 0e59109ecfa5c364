//! The three pipeline stages, invoked in order: fetch, load, transform

pub mod fetch;
pub mod load;
pub mod transform;
