//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod key_value_cache;
mod upstream_source;

#[cfg(test)]
pub use key_value_cache::MockKeyValueCache;
pub use key_value_cache::{KeyValueCache, NoOpKeyValueCache, RecordingKeyValueCache};
#[cfg(test)]
pub use upstream_source::MockUpstreamSource;
pub use upstream_source::{FixtureUpstreamSource, UpstreamSource, UpstreamSourceError};
