// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deferred Values
//!
//! Values that exist only after the provisioning engine realizes an upstream
//! resource, and the combinators that compose them.
//!
//! ```text
//! dbPassword ─────┐
//! db.endpoint ────┼──► Join ──► boot artifact ──► map(base64) ──► user data
//! topic.arn ──────┘
//! ```
//!
//! # Guarantees
//!
//! - A consumer never observes a derived value before all of its inputs have
//!   resolved.
//! - Inputs may resolve in any order and on any task.
//! - The combining function of a derived value runs at most once.
//! - Failure of any input fails the derived value; there are no partial
//!   results.

pub mod combinators;
pub mod deferred;

pub use combinators::Join;
pub use deferred::{Deferred, Resolution, Resolver};
