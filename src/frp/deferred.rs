// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deferred - Values Known Only After Realization
//!
//! A `Deferred<T>` stands in for a value that some upstream resource produces
//! once the provisioning engine has realized it (a database endpoint, a topic
//! identifier). It is the discrete counterpart of a `Behavior`: it has no
//! value until exactly one occurrence, after which it holds that value forever.
//!
//! ```text
//! Time:   ──────────────────●─────────────→
//! Value:   (pending)        │ v v v v v v
//!                       resolved
//! ```
//!
//! # Resolution
//!
//! Every pending value is paired with a [`Resolver`] held by whoever realizes
//! the upstream. Resolving, failing or dropping the resolver settles the
//! value; a resolver that is kept but never used leaves it pending forever.
//!
//! # Composition
//!
//! `map` and [`Join`](super::Join) derive new
//! deferred values. Derived values are backed by a shared future, so the
//! transform runs at most once no matter how many consumers await it, and
//! only after every input has resolved.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::OutputRef;
use crate::errors::ResolutionError;

/// Outcome of a deferred value
pub type Resolution<T> = Result<T, ResolutionError>;

type SharedResolution<T> = Shared<BoxFuture<'static, Resolution<T>>>;

/// A value available only once its upstream has been realized
pub struct Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    label: Arc<str>,
    sources: Arc<[OutputRef]>,
    secret: bool,
    inner: SharedResolution<T>,
}

impl<T> Clone for Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            sources: self.sources.clone(),
            secret: self.secret,
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.peek() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Deferred")
            .field("label", &self.label)
            .field("sources", &self.sources)
            .field("secret", &self.secret)
            .field("state", &state)
            .finish()
    }
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_future<F>(label: Arc<str>, sources: Arc<[OutputRef]>, secret: bool, fut: F) -> Self
    where
        F: Future<Output = Resolution<T>> + Send + 'static,
    {
        Self {
            label,
            sources,
            secret,
            inner: fut.boxed().shared(),
        }
    }

    /// A value that is already known, e.g. read from configuration
    pub fn ready(label: impl Into<String>, value: T) -> Self {
        let label: Arc<str> = Arc::from(label.into());
        Self::from_future(label, Arc::from(Vec::new()), false, futures::future::ready(Ok(value)))
    }

    /// A value whose upstream already failed
    pub fn failed(label: impl Into<String>, reason: impl Into<String>) -> Self {
        let label = label.into();
        let err = ResolutionError::Failed {
            label: label.clone(),
            reason: reason.into(),
        };
        Self::from_future(
            Arc::from(label),
            Arc::from(Vec::new()),
            false,
            futures::future::ready(Err(err)),
        )
    }

    /// A pending value settled through the returned [`Resolver`]
    pub fn pending(label: impl Into<String>) -> (Resolver<T>, Self) {
        Self::pending_with_sources(label.into(), Vec::new())
    }

    /// A pending value standing for a resource's realized output
    pub fn output(output: OutputRef) -> (Resolver<T>, Self) {
        Self::pending_with_sources(output.to_string(), vec![output])
    }

    fn pending_with_sources(label: String, sources: Vec<OutputRef>) -> (Resolver<T>, Self) {
        let (tx, rx) = oneshot::channel::<Resolution<T>>();
        let label: Arc<str> = Arc::from(label);
        let abandoned = label.to_string();

        let fut = async move {
            match rx.await {
                Ok(resolution) => resolution,
                Err(_) => Err(ResolutionError::Abandoned { label: abandoned }),
            }
        };

        let resolver = Resolver {
            label: label.clone(),
            tx: Some(tx),
        };
        (resolver, Self::from_future(label, Arc::from(sources), false, fut))
    }

    /// Mark the value as sensitive; exports never render its content
    pub fn into_secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Realized outputs this value (transitively) depends on
    pub fn sources(&self) -> &[OutputRef] {
        &self.sources
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Non-blocking look at the outcome, `None` while pending
    pub fn peek(&self) -> Option<Resolution<T>> {
        self.inner.peek().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.peek(), Some(Ok(_)))
    }

    /// Wait for the value
    pub async fn resolve(&self) -> Resolution<T> {
        self.inner.clone().await
    }

    /// Derive a value by applying `f` once this one resolves
    ///
    /// Failure passes through unchanged.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let inner = self.inner;
        Deferred::from_future(self.label, self.sources, self.secret, async move {
            inner.await.map(f)
        })
    }

    /// Same value under a new label
    pub fn relabel(self, label: impl Into<String>) -> Self {
        Self {
            label: Arc::from(label.into()),
            ..self
        }
    }

    pub(crate) fn into_parts(self) -> (Arc<[OutputRef]>, bool, SharedResolution<T>) {
        (self.sources, self.secret, self.inner)
    }

    pub(crate) fn from_parts<F>(label: String, sources: Vec<OutputRef>, secret: bool, fut: F) -> Self
    where
        F: Future<Output = Resolution<T>> + Send + 'static,
    {
        Self::from_future(Arc::from(label), Arc::from(sources), secret, fut)
    }
}

/// Settles one pending [`Deferred`]
///
/// Consumed on use. Dropping it unused settles the value as abandoned.
pub struct Resolver<T> {
    label: Arc<str>,
    tx: Option<oneshot::Sender<Resolution<T>>>,
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("label", &self.label).finish()
    }
}

impl<T> Resolver<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Provide the realized value
    pub fn resolve(mut self, value: T) {
        debug!(label = %self.label, "deferred value resolved");
        self.send(Ok(value));
    }

    /// Report that the upstream failed before producing a value
    pub fn fail(mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(label = %self.label, %reason, "deferred value failed");
        let err = ResolutionError::Failed {
            label: self.label.to_string(),
            reason,
        };
        self.send(Err(err));
    }

    fn send(&mut self, resolution: Resolution<T>) {
        if let Some(tx) = self.tx.take() {
            if tx.send(resolution).is_err() {
                debug!(label = %self.label, "no consumers left for deferred value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_ready_resolves_immediately() {
        let value = Deferred::ready("config.region", "us-east-1".to_string());
        assert_eq!(value.resolve().await.unwrap(), "us-east-1");
        assert!(value.is_resolved());
    }

    #[tokio::test]
    async fn test_pending_then_resolved() {
        let (resolver, value) = Deferred::<String>::pending("db.endpoint");

        assert!(value.resolve().now_or_never().is_none());
        assert!(value.peek().is_none());

        resolver.resolve("db.internal".to_string());
        assert_eq!(value.resolve().await.unwrap(), "db.internal");
        assert_eq!(value.peek(), Some(Ok("db.internal".to_string())));
    }

    #[tokio::test]
    async fn test_failed_resolver() {
        let (resolver, value) = Deferred::<String>::pending("topic.arn");
        resolver.fail("quota exceeded");

        assert_eq!(
            value.resolve().await,
            Err(ResolutionError::Failed {
                label: "topic.arn".into(),
                reason: "quota exceeded".into()
            })
        );
    }

    #[tokio::test]
    async fn test_dropped_resolver_abandons() {
        let (resolver, value) = Deferred::<u16>::pending("lb.port");
        drop(resolver);

        assert_eq!(
            value.resolve().await,
            Err(ResolutionError::Abandoned {
                label: "lb.port".into()
            })
        );
    }

    #[tokio::test]
    async fn test_map_runs_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (resolver, value) = Deferred::pending("n");
        let doubled = value.map(move |x: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            x * 2
        });

        resolver.resolve(21);
        assert_eq!(doubled.resolve().await.unwrap(), 42);
        assert_eq!(doubled.clone().resolve().await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_output_carries_source() {
        let id = crate::domain::ResourceId::new("csye6225").unwrap();
        let (_resolver, value) = Deferred::<String>::output(id.output("endpoint"));
        assert_eq!(value.label(), "csye6225.endpoint");
        assert_eq!(value.sources(), &[id.output("endpoint")]);
    }

    #[test]
    fn test_debug_hides_value() {
        let value = Deferred::ready("secret", "pw1".to_string()).into_secret();
        let rendered = format!("{:?}", value);
        assert!(!rendered.contains("pw1"));
        assert!(rendered.contains("secret"));
    }
}
