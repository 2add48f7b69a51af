// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cooperative cancellation
//!
//! A [`Cancellation`] is cloned into every call made on behalf of one
//! request. The processor checks it between output resources and races it
//! against every provider call, so an abandoned request stops issuing new
//! mutations while calls that already completed are still reported.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::errors::{DeploymentError, DeploymentResult};
use crate::registry::HandlerResult;

/// Request-scoped cancellation token
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancel every clone of this token
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Fail fast if the token has been cancelled
    pub fn check(&self) -> DeploymentResult<()> {
        if self.is_cancelled() {
            Err(DeploymentError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                // Sender is owned by self, so this is unreachable while self lives
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run a provider call bounded by an optional timeout and this token
    pub(crate) async fn guard<T, F>(
        &self,
        timeout: Option<Duration>,
        operation: &str,
        call: F,
    ) -> DeploymentResult<T>
    where
        F: Future<Output = HandlerResult<T>>,
    {
        self.check()?;

        let bounded = async {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(DeploymentError::from),
                    Err(_) => Err(DeploymentError::Timeout(format!(
                        "{} did not complete within {:?}",
                        operation, limit
                    ))),
                },
                None => call.await.map_err(DeploymentError::from),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(DeploymentError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandlerError;

    #[tokio::test]
    async fn test_cancel_is_visible_to_clones() {
        let token = Cancellation::new();
        let clone = token.clone();
        assert!(clone.check().is_ok());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(DeploymentError::Cancelled)));
        clone.cancelled().await;
    }

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let token = Cancellation::new();
        let value = token
            .guard(None, "put", async { Ok::<_, HandlerError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = token
            .guard(None, "put", async { Err::<(), _>(HandlerError::Client("bad".into())) })
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_times_out() {
        let token = Cancellation::new();
        let err = token
            .guard(Some(Duration::from_secs(1)), "recipe deploy", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, HandlerError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_guard_aborts_on_cancel() {
        let token = Cancellation::new();
        let canceller = token.clone();
        let pending = token.guard(None, "put", async {
            std::future::pending::<HandlerResult<()>>().await
        });
        tokio::spawn(async move { canceller.cancel() });

        assert!(matches!(pending.await, Err(DeploymentError::Cancelled)));
    }
}
