//! spendauth-file - Filesystem-backed session storage.

mod storage;

pub use storage::FileStorage;
