#![forbid(unsafe_code)]

pub mod app_services;
pub mod collection_service;
pub mod config;
pub mod error;
pub mod progress_cache;
pub mod quiz_service;
pub mod sync_service;

pub use dex_core::Clock;

pub use app_services::AppServices;
pub use collection_service::CollectionService;
pub use config::DexConfig;
pub use error::{AppServicesError, CollectionServiceError, ConfigError, QuizError};
pub use progress_cache::ProgressCache;
pub use quiz_service::{AnswerFeedback, QuizService, QuizSession};
pub use sync_service::{
    AuthEvent, PersistReport, ProgressSynchronizer, ReconcileReport, RemotePush, SyncAction,
    SyncNotice,
};
