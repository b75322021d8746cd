//! Ports the client core depends on.
//!
//! Infrastructure supplies the network transport, credential persistence and
//! realtime stream; the embedding shell supplies toasts and navigation.

mod credentials;
mod http;
mod realtime;
mod shell;

pub use credentials::CredentialStore;
pub use http::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartForm, MultipartPart,
    RequestBody,
};
pub use realtime::{RealtimeConnector, RealtimeStream};
pub use shell::{Navigator, Notifier, Route};
