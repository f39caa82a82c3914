//! Deadline-bounded execution of work that may block indefinitely, such as a DDL statement
//! waiting on a lock held by another session.

use std::{future::Future, time::Duration};

use tokio::task::JoinError;
use tracing::warn;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum BoundedError {
    #[error("cannot {description}: {source}")]
    Failed {
        description: String,
        #[source]
        source: BoxError,
    },

    #[error("timed out trying to {description}")]
    TimedOut { description: String },

    /// The task panicked or was cancelled by its runtime.
    #[error("cannot {description}: {source}")]
    Aborted {
        description: String,
        #[source]
        source: JoinError,
    },
}

impl BoundedError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BoundedError::TimedOut { .. })
    }
}

/// Runs `work` on its own task and waits at most `timeout` for it to finish.
///
/// A result that is already available wins over an elapsed deadline. On timeout the task is
/// detached, not aborted: it keeps running in the background until it completes or the runtime
/// shuts down.
pub async fn run_bounded<F, T, E>(
    work: F,
    timeout: Duration,
    description: impl Into<String>,
) -> Result<T, BoundedError>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    let description = description.into();
    let task = tokio::spawn(work);

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(err))) => Err(BoundedError::Failed {
            description,
            source: err.into(),
        }),
        Ok(Err(err)) => Err(BoundedError::Aborted {
            description,
            source: err,
        }),
        Err(_) => {
            warn!(?timeout, "timed out trying to {description}");
            Err(BoundedError::TimedOut { description })
        }
    }
}
