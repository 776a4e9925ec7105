//! Streaming proxy from the object store to an HTTP response

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::backend::{with_timeout, ObjectBackend};
use super::error::{StorageError, StorageResult};

/// Handler serving a single stored object
///
/// The body is the backend stream itself: chunks are forwarded as they
/// arrive and nothing is buffered. Only opening the stream is subject to the
/// request timeout.
#[derive(Clone)]
pub struct ServeObject {
    backend: Arc<dyn ObjectBackend>,
    key: String,
    timeout: Option<Duration>,
}

impl ServeObject {
    pub(crate) fn new(
        backend: Arc<dyn ObjectBackend>,
        key: String,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            backend,
            key,
            timeout,
        }
    }

    /// Key of the object being served
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Open the object and build a streaming `200` response
    ///
    /// The stored content type is looked up alongside the open and sent as
    /// `Content-Type` when the lookup succeeds.
    pub async fn respond(&self) -> StorageResult<Response> {
        let (stat, stream) = with_timeout(self.timeout, async {
            let (stat, stream) = futures::join!(
                self.backend.stat(&self.key),
                self.backend.get_stream(&self.key)
            );
            Ok::<_, StorageError>((stat, stream?))
        })
        .await?;
        debug!("Streaming '{}'", self.key);

        let mut response = Response::new(Body::from_stream(stream));
        let content_type = stat
            .ok()
            .and_then(|stat| stat.content_type)
            .and_then(|value| HeaderValue::from_str(&value).ok());
        if let Some(content_type) = content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        Ok(response)
    }

    /// Middleware form: serve the object, or hand the request to `next`
    /// when it cannot be opened
    pub async fn forward(self, request: Request, next: Next) -> Response {
        match self.respond().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Passing '{}' on to the next handler: {}", self.key, e);
                next.run(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::backend::{ObjectStat, ObjectStream};
    use crate::modules::storage::memory::InMemoryBackend;
    use async_trait::async_trait;
    use axum::{body::Bytes, http::StatusCode, routing::get, Router};
    use axum_test::TestServer;
    use futures::StreamExt;

    /// Backend whose streams break after the first chunk
    struct BrokenStreamBackend;

    #[async_trait]
    impl ObjectBackend for BrokenStreamBackend {
        async fn stat(&self, _key: &str) -> StorageResult<ObjectStat> {
            Ok(ObjectStat::default())
        }

        async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn get_stream(&self, _key: &str) -> StorageResult<ObjectStream> {
            let chunks = vec![
                Ok(Bytes::from_static(b"partial")),
                Err(StorageError::Backend("connection reset".to_string())),
                Ok(Bytes::from_static(b"never sent")),
            ];
            Ok(futures::stream::iter(chunks).boxed())
        }

        async fn remove(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    async fn backend_with(key: &str, data: &'static [u8]) -> Arc<dyn ObjectBackend> {
        let backend = InMemoryBackend::new();
        backend
            .put(key, Bytes::from_static(data), "text/plain")
            .await
            .unwrap();
        Arc::new(backend)
    }

    fn serving_router(serve: ServeObject) -> Router {
        Router::new().route(
            "/object",
            get(move || {
                let serve = serve.clone();
                async move {
                    serve
                        .respond()
                        .await
                        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_respond_streams_object() {
        let backend = backend_with("2024/03/note.txt", b"hello from the bucket").await;
        let serve = ServeObject::new(backend, "2024/03/note.txt".to_string(), None);
        assert_eq!(serve.key(), "2024/03/note.txt");

        let server = TestServer::new(serving_router(serve)).unwrap();
        let response = server.get("/object").await;

        response.assert_status_ok();
        assert_eq!(response.header(header::CONTENT_TYPE), "text/plain");
        assert_eq!(response.as_bytes().as_ref(), b"hello from the bucket");
    }

    #[tokio::test]
    async fn test_respond_without_stored_content_type() {
        let serve = ServeObject::new(Arc::new(BrokenStreamBackend), "a.bin".to_string(), None);
        let response = serve.respond().await.unwrap();
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_stream_error_cuts_body_short() {
        let serve = ServeObject::new(Arc::new(BrokenStreamBackend), "a.bin".to_string(), None);

        let response = serve.respond().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from_static(b"partial"));
        assert!(body.next().await.unwrap().is_err());

        let response = serve.respond().await.unwrap();
        let collected = axum::body::to_bytes(response.into_body(), usize::MAX).await;
        assert!(collected.is_err());
    }

    #[tokio::test]
    async fn test_respond_fails_for_missing_object() {
        let backend = backend_with("present.txt", b"x").await;
        let serve = ServeObject::new(backend, "absent.txt".to_string(), None);

        let server = TestServer::new(serving_router(serve)).unwrap();
        let response = server.get("/object").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.text().contains("absent.txt"));
    }

    #[tokio::test]
    async fn test_forward_falls_through_to_next() {
        let backend = backend_with("present.txt", b"served by storage").await;
        let present = ServeObject::new(Arc::clone(&backend), "present.txt".to_string(), None);
        let absent = ServeObject::new(backend, "absent.txt".to_string(), None);

        let fallback = || async { (StatusCode::NOT_FOUND, "fallback") };
        let app = Router::new()
            .route(
                "/present",
                get(fallback).layer(axum::middleware::from_fn(
                    move |req: Request, next: Next| present.clone().forward(req, next),
                )),
            )
            .route(
                "/absent",
                get(fallback).layer(axum::middleware::from_fn(
                    move |req: Request, next: Next| absent.clone().forward(req, next),
                )),
            );

        let server = TestServer::new(app).unwrap();

        let response = server.get("/present").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "served by storage");

        let response = server.get("/absent").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "fallback");
    }
}
