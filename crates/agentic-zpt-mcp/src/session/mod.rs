//! Session management for ZPT navigation.

pub mod manager;
pub mod registry;

pub use manager::{ZptServices, ZptSessionManager};
pub use registry::{SessionRegistry, DEFAULT_SESSION_ID};
