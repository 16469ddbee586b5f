mod http;

pub use http::{HttpRemoteStore, RemoteConfig};

/// Document collection holding one progress document per user.
pub const PROGRESS_COLLECTION: &str = "userProgress";
