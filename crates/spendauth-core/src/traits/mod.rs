//! Seams to the outside world: the network and durable storage.

mod storage;
mod transport;

pub use storage::SessionStorage;
pub use transport::{AuthTransport, Method, TokenResponse};
