//! spendauth-http - reqwest-backed authentication transport.
//!
//! Talks to a token-auth backend the way a browser client would: JSON
//! bodies, an `X-Requested-With` marker, the CSRF cookie echoed back as a
//! header, and `Authorization: Token <token>` on authorized requests.

mod config;
mod transport;

pub use config::HttpTransportConfig;
pub use transport::HttpTransport;
