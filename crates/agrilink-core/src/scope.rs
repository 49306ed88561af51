use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Lifetime of one view. Results of work started through [`ViewScope::run`]
/// are dropped once the scope is closed or goes out of scope.
#[derive(Debug, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A nested scope, closed together with this one.
    pub fn child(&self) -> ViewScope {
        ViewScope { token: self.token.child_token() }
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Await `fut` unless the scope closes first.
    pub async fn run<F, T>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("View closed with a request in flight");
                Err(AppError::Cancelled)
            }
            result = fut => result,
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn open_scope_passes_results_through() {
        let scope = ViewScope::new();
        assert_eq!(scope.run(async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn closed_scope_refuses_work() {
        let scope = ViewScope::new();
        scope.close();
        let r = scope.run(async { Ok(()) }).await;
        assert!(matches!(r, Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn dropping_parent_cancels_child_in_flight() {
        let parent = ViewScope::new();
        let child = parent.child();

        let task = tokio::spawn(async move {
            child
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(parent);
        assert!(matches!(task.await.unwrap(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn closing_child_leaves_parent_open() {
        let parent = ViewScope::new();
        parent.child().close();
        assert!(!parent.is_closed());
    }
}
