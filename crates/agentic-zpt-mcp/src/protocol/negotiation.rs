//! Capability negotiation during `initialize`.

use crate::types::{ClientCapabilities, Implementation, InitializeParams, InitializeResult, MCP_VERSION};

/// What the connected client declared about itself.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub requested_version: Option<String>,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    /// Record the client's declaration. A version mismatch is tolerated; the
    /// server always answers with its own protocol version.
    pub fn negotiate(&mut self, params: InitializeParams) -> InitializeResult {
        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                requested = %params.protocol_version,
                supported = MCP_VERSION,
                "Protocol version mismatch, answering with server version"
            );
        }

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        self.client = params.capabilities;
        self.requested_version = Some(params.protocol_version);
        self.client_info = Some(params.client_info);

        InitializeResult::default_result()
    }

    pub fn mark_initialized(&mut self) {
        if self.client_info.is_none() {
            tracing::warn!("Client sent initialized before initialize");
        }
        self.initialized = true;
        tracing::info!("MCP handshake complete");
    }
}
