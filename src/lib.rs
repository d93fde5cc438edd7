pub mod citation;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod exporter;
pub mod graph;
pub mod interactors;
pub mod jsog;
pub mod logging;
pub mod metrics;
pub mod search;
pub mod server;
pub mod services;
pub mod template;

#[cfg(test)]
mod testing;
