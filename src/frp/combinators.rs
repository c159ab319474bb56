// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deferred Combinators
//!
//! Pure combinators that derive one deferred value from several.
//!
//! # Available Combinators
//!
//! - [`Join`] - All-or-nothing join over N values of one type with a single
//!   continuation
//!
//! A join waits for all inputs, whatever order they resolve in, runs
//! its function exactly once, and fails as soon as any input fails. A
//! failed join never exposes a partial result.
//!
//! # Examples
//!
//! ```rust,ignore
//! use cim_topology::frp::*;
//!
//! let (set_host, host) = Deferred::pending("db.endpoint");
//! let port = Deferred::ready("db.port", "3306".to_string());
//!
//! let url = Join::new("db.url")
//!     .with(host)
//!     .with(port)
//!     .then(|parts| parts.join(":"));
//!
//! set_host.resolve("db.internal".to_string());
//! assert_eq!(url.resolve().await?, "db.internal:3306");
//! ```

use std::collections::BTreeSet;
use tracing::debug;

use super::deferred::Deferred;
use crate::domain::OutputRef;

fn merge_sources<'a>(inputs: impl IntoIterator<Item = &'a [OutputRef]>) -> Vec<OutputRef> {
    let mut seen = BTreeSet::new();
    let mut merged = Vec::new();
    for source in inputs.into_iter().flatten() {
        if seen.insert(source.clone()) {
            merged.push(source.clone());
        }
    }
    merged
}

/// Ordered join over deferred values of one type
///
/// Collect inputs with [`Join::with`], then attach the continuation with
/// [`Join::then`]. The continuation receives the values in input order.
#[derive(Debug)]
pub struct Join<T>
where
    T: Clone + Send + Sync + 'static,
{
    label: String,
    inputs: Vec<Deferred<T>>,
}

impl<T> Join<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inputs: Vec::new(),
        }
    }

    pub fn with(mut self, input: Deferred<T>) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Attach the combining function and yield the derived value
    ///
    /// The result is secret if any input is.
    pub fn then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(Vec<T>) -> U + Send + 'static,
    {
        let sources = merge_sources(self.inputs.iter().map(|d| d.sources()));
        let secret = self.inputs.iter().any(|d| d.is_secret());
        let label = self.label.clone();

        let futures: Vec<_> = self
            .inputs
            .into_iter()
            .map(|d| {
                let (_, _, inner) = d.into_parts();
                inner
            })
            .collect();

        Deferred::from_parts(self.label, sources, secret, async move {
            let values = futures::future::try_join_all(futures).await?;
            debug!(%label, inputs = values.len(), "join resolved, combining");
            Ok(f(values))
        })
    }
}
