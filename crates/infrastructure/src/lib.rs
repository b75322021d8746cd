//! Infrastructure adapters for client ports.

#![forbid(unsafe_code)]

mod console_shell;
mod file_credential_store;
mod http_event_stream_connector;
mod in_memory_credential_store;
mod reqwest_http_transport;

pub use console_shell::{ConsoleNavigator, ConsoleNotifier};
pub use file_credential_store::FileCredentialStore;
pub use http_event_stream_connector::{EVENT_STREAM_PATH, HttpEventStreamConnector};
pub use in_memory_credential_store::InMemoryCredentialStore;
pub use reqwest_http_transport::{DEFAULT_REQUEST_TIMEOUT, ReqwestHttpTransport};
