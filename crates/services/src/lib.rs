#![forbid(unsafe_code)]

pub mod app_services;
pub mod directory_service;
pub mod error;
pub mod result_service;
pub mod sessions;

pub use exam_core::Clock;

pub use app_services::ExamServices;
pub use directory_service::DirectoryService;
pub use error::{AppServicesError, ExamError, LookupError, QuestionFetchFailure};
pub use result_service::ResultService;
pub use sessions::{ControllerState, NextStep, SessionController, SessionProgress, SubmitOutcome};
