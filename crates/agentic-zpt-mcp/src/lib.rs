//! AgenticZPT server: request parsing, verb dispatch, error recovery, and
//! response shaping for zoom/pan/tilt navigation over MCP and HTTP.

pub mod config;
pub mod errors;
pub mod protocol;
pub mod request;
pub mod response;
pub mod service;
pub mod session;
pub mod transport;
pub mod types;
pub mod verbs;

pub use config::ZptConfig;
pub use errors::ErrorHandler;
pub use protocol::ProtocolHandler;
pub use request::RequestParser;
pub use response::{ResponseEnvelope, ResponseFormatter};
pub use service::ZptService;
pub use session::{SessionRegistry, ZptSessionManager};
pub use transport::StdioTransport;
pub use verbs::VerbRegistry;
