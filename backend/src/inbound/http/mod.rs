//! HTTP inbound adapter exposing REST endpoints.

pub mod admin;
pub mod error;
pub mod health;
pub mod state;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
