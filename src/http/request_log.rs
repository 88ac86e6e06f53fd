use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Instrument, debug};

/// Runs each request inside an `http.request` span and logs the response status.
pub async fn trace_requests(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        route = %request.uri().path(),
    );

    async move {
        let response = next.run(request).await;
        debug!(status = response.status().as_u16(), "Request finished");
        response
    }
    .instrument(span)
    .await
}
