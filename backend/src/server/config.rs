//! HTTP server configuration object.

use std::net::SocketAddr;

use paddock::inbound::http::state::HttpState;

/// Everything the HTTP server needs once adapters are wired.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) http_state: HttpState,
}

impl ServerConfig {
    /// Bundle the listen address with the handler state.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, http_state: HttpState) -> Self {
        Self {
            bind_addr,
            http_state,
        }
    }
}
