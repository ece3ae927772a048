//! Upload sink abstraction
//!
//! The transport lives outside this crate; the core only hands over the
//! artifact bytes and observes the outcome.

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;

#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Deliver the artifact. Any error is surfaced to the user as the
    /// upload failure message.
    async fn upload(&self, blob: Bytes, mime_type: &str) -> anyhow::Result<()>;
}

/// Adapts an async closure `Fn(Bytes) -> Future<Output = anyhow::Result<()>>`
pub struct FnUploadSink<F> {
    f: F,
}

impl<F> FnUploadSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> UploadSink for FnUploadSink<F>
where
    F: Fn(Bytes) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn upload(&self, blob: Bytes, _mime_type: &str) -> anyhow::Result<()> {
        (self.f)(blob).await
    }
}
