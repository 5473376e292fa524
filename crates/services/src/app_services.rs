use std::sync::Arc;

use exam_core::PhaseDecisionPolicy;
use storage::repository::Storage;

use crate::Clock;
use crate::directory_service::DirectoryService;
use crate::error::AppServicesError;
use crate::result_service::ResultService;
use crate::sessions::SessionController;

/// Assembles exam-facing services over one storage backend.
#[derive(Clone)]
pub struct ExamServices {
    clock: Clock,
    policy: PhaseDecisionPolicy,
    storage: Storage,
    directory: Arc<DirectoryService>,
    results: Arc<ResultService>,
}

impl ExamServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        policy: PhaseDecisionPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, policy))
    }

    /// Build services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock, policy: PhaseDecisionPolicy) -> Self {
        Self::from_storage(Storage::in_memory(), clock, policy)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, policy: PhaseDecisionPolicy) -> Self {
        let directory = Arc::new(DirectoryService::new(
            Arc::clone(&storage.students),
            Arc::clone(&storage.exams),
        ));
        let results = Arc::new(ResultService::new(Arc::clone(&storage.history)));
        Self {
            clock,
            policy,
            storage,
            directory,
            results,
        }
    }

    /// A fresh controller for one exam sitting.
    #[must_use]
    pub fn controller(&self) -> SessionController {
        SessionController::new(
            self.clock,
            Arc::clone(&self.storage.questions),
            Arc::clone(&self.storage.sessions),
        )
        .with_policy(self.policy)
    }

    #[must_use]
    pub fn directory(&self) -> Arc<DirectoryService> {
        Arc::clone(&self.directory)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn policy(&self) -> PhaseDecisionPolicy {
        self.policy
    }
}
