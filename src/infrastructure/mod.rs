//! Infrastructure layer - Cache backends, logging and metrics

pub mod cache;
pub mod logging;
pub mod metrics;
