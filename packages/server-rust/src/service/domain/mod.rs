//! Business core: the `AddService` operations.
//!
//! Each successful computation publishes its result on [`NOTIFICATION_SUBJECT`].
//! A failed publish is returned to the caller even though the value was
//! computed; the value itself is discarded so no caller sees a partial success.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::error;

use crate::service::middleware::LoggingMiddleware;
use crate::service::operation::{CallContext, ServiceError};
use crate::traits::Publisher;

/// Bus subject every result is published on.
pub const NOTIFICATION_SUBJECT: &str = "add";

/// The operations exposed by this service.
#[async_trait]
pub trait AddService: Send + Sync {
    /// Returns `a + b` and publishes its decimal representation.
    async fn sum(&self, ctx: &CallContext, a: i64, b: i64) -> Result<i64, ServiceError>;

    /// Returns `a` immediately followed by `b` and publishes the result.
    async fn concat(&self, ctx: &CallContext, a: &str, b: &str) -> Result<String, ServiceError>;
}

/// Concrete business logic, backed by a bus publisher.
pub struct AddServiceImpl {
    publisher: Arc<dyn Publisher>,
}

impl AddServiceImpl {
    #[must_use]
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    async fn notify(&self, value: String) -> Result<(), ServiceError> {
        if let Err(e) = self
            .publisher
            .publish(NOTIFICATION_SUBJECT, Bytes::from(value.clone()))
            .await
        {
            error!(method = "publish", subject = NOTIFICATION_SUBJECT, value = %value, error = %e, "notification failed");
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl AddService for AddServiceImpl {
    async fn sum(&self, _ctx: &CallContext, a: i64, b: i64) -> Result<i64, ServiceError> {
        let res = a.wrapping_add(b);
        self.notify(res.to_string()).await?;
        Ok(res)
    }

    async fn concat(&self, _ctx: &CallContext, a: &str, b: &str) -> Result<String, ServiceError> {
        let res = format!("{a}{b}");
        self.notify(res.clone()).await?;
        Ok(res)
    }
}

/// Builds the service with its middleware chain applied.
///
/// Decorators are nested explicitly; the innermost one sees the call last on
/// the way in and first on the way out.
#[must_use]
pub fn new(publisher: Arc<dyn Publisher>) -> Arc<dyn AddService> {
    let svc = AddServiceImpl::new(publisher);
    let svc = LoggingMiddleware::new(svc);
    Arc::new(svc)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;
    use crate::bus::MemoryPublisher;
    use crate::service::operation::Transport;

    fn ctx() -> CallContext {
        CallContext::next(Transport::Internal, Duration::from_secs(5))
    }

    fn service() -> (Arc<MemoryPublisher>, AddServiceImpl) {
        let publisher = Arc::new(MemoryPublisher::new());
        let svc = AddServiceImpl::new(publisher.clone());
        (publisher, svc)
    }

    #[tokio::test]
    async fn sum_returns_total_and_publishes_it() {
        let (publisher, svc) = service();
        assert_eq!(svc.sum(&ctx(), 2, 3).await.unwrap(), 5);
        assert_eq!(publisher.attempts(), 1);
        assert_eq!(publisher.payloads(), vec!["5"]);
        assert_eq!(publisher.messages()[0].subject, NOTIFICATION_SUBJECT);
    }

    #[tokio::test]
    async fn concat_joins_without_separator() {
        let (publisher, svc) = service();
        assert_eq!(svc.concat(&ctx(), "foo", "bar").await.unwrap(), "foobar");
        assert_eq!(publisher.payloads(), vec!["foobar"]);
    }

    #[tokio::test]
    async fn publish_failure_discards_result() {
        let (publisher, svc) = service();
        publisher.set_failing(true);

        let err = svc.sum(&ctx(), 40, 2).await.unwrap_err();
        assert!(matches!(err, ServiceError::Publish(_)));
        assert_eq!(publisher.attempts(), 1);

        let err = svc.concat(&ctx(), "a", "b").await.unwrap_err();
        assert!(matches!(err, ServiceError::Publish(_)));
        assert_eq!(publisher.attempts(), 2);
    }

    #[tokio::test]
    async fn sum_wraps_on_overflow_and_still_publishes() {
        let (publisher, svc) = service();
        assert_eq!(svc.sum(&ctx(), i64::MAX, 1).await.unwrap(), i64::MIN);
        assert_eq!(publisher.attempts(), 1);
        assert_eq!(publisher.payloads(), vec![i64::MIN.to_string()]);
    }

    #[tokio::test]
    async fn negative_operands() {
        let (publisher, svc) = service();
        assert_eq!(svc.sum(&ctx(), -7, 3).await.unwrap(), -4);
        assert_eq!(publisher.payloads(), vec!["-4"]);
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn sum_publishes_exactly_once(a in any::<i64>(), b in any::<i64>()) {
            let (publisher, svc) = service();
            let res = block_on(svc.sum(&ctx(), a, b)).unwrap();
            prop_assert_eq!(res, a.wrapping_add(b));
            prop_assert_eq!(publisher.attempts(), 1);
            prop_assert_eq!(publisher.payloads(), vec![res.to_string()]);
        }

        #[test]
        fn concat_is_plain_concatenation(a in ".*", b in ".*") {
            let (publisher, svc) = service();
            let res = block_on(svc.concat(&ctx(), &a, &b)).unwrap();
            prop_assert_eq!(&res, &format!("{a}{b}"));
            prop_assert_eq!(publisher.payloads(), vec![res]);
        }
    }
}
