use crate::engine::EngineEvent;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use tokio::sync::mpsc;

/// Frame a run's event stream as Server-Sent Events.
///
/// One `data:` frame per engine event, in emission order; the response body
/// ends when the engine closes its channel. Dropping the response (client
/// disconnect) drops the receiver, which stops the run at its next emission.
pub fn stream_events(mut rx: mpsc::Receiver<EngineEvent>) -> Response<Body> {
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                yield Ok::<_, std::convert::Infallible>(format!("data: {json}\n\n"));
            }
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    response.headers_mut().insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    response
}
