//! Application services for task orchestration.

mod intake;
mod lifecycle;
mod processor;

pub use intake::{
    DEFAULT_RECENT_TASK_LIMIT, EventIntakeService, IncomingEvent, IntakeError, IntakeReport,
};
pub use lifecycle::{TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService};
pub use processor::{DEFAULT_SELECTION_TIMEOUT, ProcessReport, TaskProcessor, TaskProcessorError};

use crate::task::ports::ClassificationError;
use std::future::Future;
use std::time::Duration;

/// Awaits a model-backed call, failing with
/// [`ClassificationError::Timeout`] once `limit` elapses.
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ClassificationError>
where
    F: Future<Output = Result<T, ClassificationError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ClassificationError::Timeout(limit))?
}
