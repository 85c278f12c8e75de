//! MCP protocol handling over JSON-RPC.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::ProtocolHandler;
