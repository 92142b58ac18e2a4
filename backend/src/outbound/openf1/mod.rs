//! Telemetry API outbound adapter.
//!
//! A thin HTTP implementation of the `UpstreamSource` port.

mod http_source;

pub use http_source::{OpenF1HttpConfig, OpenF1HttpSource};
