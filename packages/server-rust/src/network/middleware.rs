//! HTTP middleware stack for the add service.
//!
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use std::sync::Arc;

use addsvc_core::messages::{ErrorKind, ResultBody};
use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::shutdown::ShutdownController;

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        CorsLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
            >,
            tower::layer::util::Stack<SetRequestIdLayer<MakeRequestUuid>, tower::layer::util::Identity>,
        >,
    >,
>;

/// Builds the HTTP-level Tower middleware stack.
///
/// **Outermost to innermost:**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every incoming request
/// 2. `Tracing` -- request/response trace spans
/// 3. `CORS` -- based on the configured origins
/// 4. `PropagateRequestId` -- copies `X-Request-Id` onto the response
///
/// Deadlines are enforced per invocation in the endpoint pipeline, not here.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// A wildcard `"*"` allows any origin; otherwise each origin is parsed into
/// an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Rejects new work with 503 once shutdown has begun; otherwise tracks the
/// request as in flight until its response is produced.
pub async fn draining_guard(
    State(shutdown): State<Arc<ShutdownController>>,
    request: Request,
    next: Next,
) -> Response {
    if !shutdown.is_accepting() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ResultBody::err(ErrorKind::Unavailable, "server is shutting down")),
        )
            .into_response();
    }
    let _guard = shutdown.in_flight_guard();
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn build_http_layers_with_defaults() {
        let _layers = build_http_layers(&NetworkConfig::default());
    }

    #[test]
    fn build_cors_layer_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://example.com".to_string(),
        ];
        let _cors = build_cors_layer(&origins);
    }

    fn guarded(shutdown: Arc<ShutdownController>) -> Router {
        let observed = Arc::clone(&shutdown);
        Router::new()
            .route(
                "/work",
                post(move || {
                    let observed = Arc::clone(&observed);
                    async move { observed.in_flight_count().to_string() }
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(shutdown, draining_guard))
    }

    fn work() -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/work")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn guard_tracks_in_flight_requests() {
        let shutdown = Arc::new(ShutdownController::new());
        shutdown.set_running();

        let response = guarded(Arc::clone(&shutdown)).oneshot(work()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"1");
        assert_eq!(shutdown.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn guard_rejects_while_draining() {
        let shutdown = Arc::new(ShutdownController::new());
        shutdown.set_running();
        shutdown.trigger_shutdown();

        let response = guarded(shutdown).oneshot(work()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
