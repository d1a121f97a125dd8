//! Infrastructure layer: persistence, configuration, file storage and the
//! application services built on them.

pub mod config;
pub mod file_storage;
pub mod pagination;
pub mod services;
pub mod store;

#[cfg(test)]
mod integration_tests;
