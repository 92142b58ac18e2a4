//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **cache**: Redis-backed and in-memory implementations of `KeyValueCache`
//! - **openf1**: reqwest-backed implementation of `UpstreamSource`
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod openf1;
