#![forbid(unsafe_code)]

pub mod app_services;
pub mod changes;
pub mod error;
pub mod progress_binding;
pub mod progress_service;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use changes::{ChangeFeed, StorageChange};
pub use error::{AppServicesError, FailureHook, ProgressFailure, ProgressServiceError};
pub use progress_binding::ProgressBinding;
pub use progress_service::ProgressService;
