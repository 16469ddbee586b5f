#![forbid(unsafe_code)]

pub mod remote;
pub mod repository;
pub mod sqlite;

pub use remote::{HttpRemoteStore, RemoteConfig};
pub use repository::{
    InMemoryRepository, KeyValueStore, ProgressDocument, RemoteProgressStore, Storage,
    StorageError,
};
