//! Logging decorator for [`AddService`].
//!
//! Logs method, operands, outcome and latency for every call, and returns the
//! inner result untouched.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::service::domain::AddService;
use crate::service::operation::{CallContext, ServiceError};

/// Wraps an `AddService` and logs each call.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> LoggingMiddleware<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: AddService> AddService for LoggingMiddleware<S> {
    async fn sum(&self, ctx: &CallContext, a: i64, b: i64) -> Result<i64, ServiceError> {
        let start = Instant::now();
        let result = self.inner.sum(ctx, a, b).await;
        #[allow(clippy::cast_possible_truncation)]
        let took_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(res) => info!(
                method = "sum",
                call_id = ctx.call_id,
                transport = ctx.transport.as_str(),
                a,
                b,
                res,
                took_us,
                "call complete"
            ),
            Err(e) => warn!(
                method = "sum",
                call_id = ctx.call_id,
                transport = ctx.transport.as_str(),
                a,
                b,
                error = %e,
                took_us,
                "call failed"
            ),
        }
        result
    }

    async fn concat(&self, ctx: &CallContext, a: &str, b: &str) -> Result<String, ServiceError> {
        let start = Instant::now();
        let result = self.inner.concat(ctx, a, b).await;
        #[allow(clippy::cast_possible_truncation)]
        let took_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(res) => info!(
                method = "concat",
                call_id = ctx.call_id,
                transport = ctx.transport.as_str(),
                a,
                b,
                res = res.as_str(),
                took_us,
                "call complete"
            ),
            Err(e) => warn!(
                method = "concat",
                call_id = ctx.call_id,
                transport = ctx.transport.as_str(),
                a,
                b,
                error = %e,
                took_us,
                "call failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::service::operation::Transport;
    use crate::traits::PublishError;

    /// Returns canned results and counts calls.
    #[derive(Default)]
    struct Canned {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AddService for Canned {
        async fn sum(&self, _ctx: &CallContext, a: i64, b: i64) -> Result<i64, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ServiceError::Publish(PublishError::Disconnected))
            } else {
                Ok(a * 100 + b)
            }
        }

        async fn concat(&self, _ctx: &CallContext, a: &str, b: &str) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ServiceError::Publish(PublishError::Timeout))
            } else {
                Ok(format!("{b}{a}"))
            }
        }
    }

    fn ctx() -> CallContext {
        CallContext::next(Transport::Internal, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn forwards_results_unchanged() {
        let inner = Arc::new(Canned::default());
        let svc = LoggingMiddleware::new(ArcService(inner.clone()));

        assert_eq!(svc.sum(&ctx(), 1, 2).await.unwrap(), 102);
        assert_eq!(svc.concat(&ctx(), "x", "y").await.unwrap(), "yx");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forwards_errors_unchanged() {
        let svc = LoggingMiddleware::new(Canned {
            fail: true,
            ..Canned::default()
        });

        let err = svc.sum(&ctx(), 1, 2).await.unwrap_err();
        assert!(matches!(err, ServiceError::Publish(PublishError::Disconnected)));
        let err = svc.concat(&ctx(), "x", "y").await.unwrap_err();
        assert!(matches!(err, ServiceError::Publish(PublishError::Timeout)));
    }

    #[tokio::test]
    async fn decorators_nest() {
        let inner = Arc::new(Canned::default());
        let svc = LoggingMiddleware::new(LoggingMiddleware::new(ArcService(inner.clone())));
        assert_eq!(svc.sum(&ctx(), 3, 4).await.unwrap(), 304);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    /// Lets a test keep a handle on the innermost service.
    struct ArcService(Arc<Canned>);

    #[async_trait]
    impl AddService for ArcService {
        async fn sum(&self, ctx: &CallContext, a: i64, b: i64) -> Result<i64, ServiceError> {
            self.0.sum(ctx, a, b).await
        }

        async fn concat(&self, ctx: &CallContext, a: &str, b: &str) -> Result<String, ServiceError> {
            self.0.concat(ctx, a, b).await
        }
    }
}
