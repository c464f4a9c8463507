//! Shared world state for task status BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use switchboard::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{ParseTaskStatusError, Task},
    services::{TaskLifecycleError, TaskLifecycleService},
};

/// Service type used by the BDD world.
pub type TestTaskService = TaskLifecycleService<InMemoryTaskStore, DefaultClock>;

/// Outcome of the last requested status change.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The service accepted or rejected the change.
    Applied(Result<Task, TaskLifecycleError>),
    /// The requested status name did not parse.
    Unparsed(ParseTaskStatusError),
}

/// Scenario world for task status behaviour tests.
pub struct TaskStatusWorld {
    pub store: Arc<InMemoryTaskStore>,
    pub service: TestTaskService,
    pub task: Option<Task>,
    pub last_move: Option<MoveOutcome>,
}

impl TaskStatusWorld {
    /// Creates a world with an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let service = TaskLifecycleService::new(Arc::clone(&store), Arc::new(DefaultClock));

        Self {
            store,
            service,
            task: None,
            last_move: None,
        }
    }

    /// Returns the task under test.
    ///
    /// # Errors
    ///
    /// Returns an error if no task has been created yet.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Records a service result, keeping the task current on success.
    pub fn record(&mut self, result: Result<Task, TaskLifecycleError>) {
        if let Ok(ref updated) = result {
            self.task = Some(updated.clone());
        }
        self.last_move = Some(MoveOutcome::Applied(result));
    }
}

impl Default for TaskStatusWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskStatusWorld {
    TaskStatusWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
