//! Backend access for the Xinyu client.
//!
//! Provides the HTTP implementation of `xinyu_core::ChatBackend` and the client
//! configuration it is built from.

pub mod config;
pub mod http_backend;

pub use config::{BackendConfig, ClientConfig, TranslationConfig};
pub use http_backend::HttpChatBackend;
