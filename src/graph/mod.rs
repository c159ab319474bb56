// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph
//!
//! The declared topology: every resource the provisioning engine should
//! realize, in declaration order, with its upstream dependencies and
//! attributes.
//!
//! # Invariants
//!
//! - A node is declared once and never changes afterwards.
//! - Every dependency of a node was declared before it, so declaration order
//!   is a topological order.
//! - Dependencies are derived from the node's attributes (identity
//!   references and the sources of deferred values) plus any explicit
//!   ordering edges.
//! - The same configuration and zone list always yield the same graph.

pub mod builder;
pub mod realization;
pub mod stage;
mod stages;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::domain::{OutputRef, ResourceId, ResourceKind};
use crate::errors::{DependencyError, ResolutionError, StackResult, TopologyError};
use crate::frp::Deferred;

pub use builder::{construct, Construction, ResourceGraphBuilder};
pub use realization::Realization;
pub use stage::{Stage, StageEdge, StageOutputs, StagePlan, Upstream};

/// Declared value of a resource attribute
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// Known at declaration time
    Literal(serde_json::Value),
    /// Output of another resource, wired by the provisioning engine
    Reference(OutputRef),
    /// Value computed once upstream outputs are realized
    Deferred(Deferred<String>),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&OutputRef> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred<String>> {
        match self {
            Self::Deferred(d) => Some(d),
            _ => None,
        }
    }

    /// Resources this value reads from, in order of appearance
    fn upstream_resources(&self, out: &mut Vec<ResourceId>) {
        match self {
            Self::Literal(_) => {}
            Self::Reference(r) => out.push(r.resource.clone()),
            Self::Deferred(d) => out.extend(d.sources().iter().map(|s| s.resource.clone())),
            Self::List(items) => items.iter().for_each(|i| i.upstream_resources(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.upstream_resources(out)),
        }
    }

    fn collect_deferred<'a>(&'a self, path: String, out: &mut Vec<(String, &'a Deferred<String>)>) {
        match self {
            Self::Deferred(d) => out.push((path, d)),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.collect_deferred(format!("{path}[{i}]"), out);
                }
            }
            Self::Map(entries) => {
                for (k, v) in entries {
                    v.collect_deferred(format!("{path}.{k}"), out);
                }
            }
            Self::Literal(_) | Self::Reference(_) => {}
        }
    }
}

macro_rules! literal_from {
    ($($t:ty),*) => {
        $(impl From<$t> for AttributeValue {
            fn from(v: $t) -> Self {
                Self::Literal(serde_json::json!(v))
            }
        })*
    };
}

literal_from!(&str, String, bool, i32, u16, u32, u8, f64);

impl From<OutputRef> for AttributeValue {
    fn from(r: OutputRef) -> Self {
        Self::Reference(r)
    }
}

impl From<Deferred<String>> for AttributeValue {
    fn from(d: Deferred<String>) -> Self {
        Self::Deferred(d)
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(v) => v.serialize(serializer),
            Self::Reference(r) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ref", &r.to_string())?;
                map.end()
            }
            Self::Deferred(d) => {
                let sources: Vec<String> = d.sources().iter().map(ToString::to_string).collect();
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("deferred", d.label())?;
                map.serialize_entry("sources", &sources)?;
                if d.is_secret() {
                    map.serialize_entry("secret", &true)?;
                } else if let Some(Ok(value)) = d.peek() {
                    map.serialize_entry("value", &value)?;
                }
                map.end()
            }
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

fn serialize_kind<S: Serializer>(kind: &ResourceKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.type_token())
}

/// One declared resource
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: ResourceId,
    #[serde(rename = "type", serialize_with = "serialize_kind")]
    pub kind: ResourceKind,
    pub stage: Stage,
    pub depends_on: Vec<ResourceId>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl ResourceNode {
    pub fn builder(id: ResourceId, kind: ResourceKind) -> NodeBuilder {
        NodeBuilder {
            id,
            kind,
            after: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn depends_on(&self, id: &ResourceId) -> bool {
        self.depends_on.contains(id)
    }
}

/// Collects a node's attributes before declaration
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    id: ResourceId,
    kind: ResourceKind,
    after: Vec<ResourceId>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl NodeBuilder {
    pub fn attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Set `name` only when a value is present
    pub fn attr_opt<V: Into<AttributeValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    /// Ordering edge that no attribute expresses
    pub fn after(mut self, id: &ResourceId) -> Self {
        self.after.push(id.clone());
        self
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    fn finish(self, stage: Stage) -> ResourceNode {
        let mut upstream = self.after;
        for value in self.attributes.values() {
            value.upstream_resources(&mut upstream);
        }

        let mut seen = BTreeSet::new();
        let depends_on = upstream
            .into_iter()
            .filter(|id| *id != self.id && seen.insert(id.clone()))
            .collect();

        ResourceNode {
            id: self.id,
            kind: self.kind,
            stage,
            depends_on,
            attributes: self.attributes,
        }
    }
}

/// Declared resources in declaration order
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<ResourceId, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; every dependency must already be declared
    pub fn declare(&mut self, stage: Stage, node: NodeBuilder) -> StackResult<ResourceId> {
        if self.index.contains_key(node.id()) {
            return Err(TopologyError::DuplicateResource(node.id().to_string()).into());
        }

        let node = node.finish(stage);
        if let Some(missing) = node.depends_on.iter().find(|d| !self.index.contains_key(*d)) {
            return Err(DependencyError::UndeclaredResource {
                stage,
                resource: node.id.to_string(),
                missing: missing.to_string(),
            }
            .into());
        }

        debug!(
            %stage,
            id = %node.id,
            kind = node.kind.type_token(),
            depends_on = node.depends_on.len(),
            "declared resource"
        );
        let id = node.id.clone();
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&ResourceNode> {
        self.index.get(id).map(|i| &self.nodes[*i])
    }

    /// Lookup by logical name
    pub fn find(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.id.as_str() == name)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.index.contains_key(id)
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn nodes_in_stage(&self, stage: Stage) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter(move |n| n.stage == stage)
    }

    /// Nodes that depend directly on `id`
    pub fn dependents<'a>(&'a self, id: &'a ResourceId) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.nodes.iter().filter(move |n| n.depends_on(id))
    }

    /// Every deferred attribute as `(node, attribute path, value)`
    pub fn deferred_attributes(&self) -> Vec<(&ResourceId, String, &Deferred<String>)> {
        let mut out = Vec::new();
        for node in &self.nodes {
            let mut found = Vec::new();
            for (name, value) in &node.attributes {
                value.collect_deferred(name.clone(), &mut found);
            }
            out.extend(found.into_iter().map(|(path, d)| (&node.id, path, d)));
        }
        out
    }

    /// Wait until every deferred attribute has resolved
    ///
    /// Fails with the first input failure; never returns while an input is
    /// still pending.
    pub async fn resolve_all(&self) -> Result<usize, ResolutionError> {
        let pending: Vec<Deferred<String>> = self
            .deferred_attributes()
            .into_iter()
            .map(|(_, _, d)| d.clone())
            .collect();
        let count = pending.len();
        futures::future::try_join_all(pending.iter().map(|d| d.resolve())).await?;
        debug!(count, "all deferred attributes resolved");
        Ok(count)
    }

    /// Plan export for the provisioning engine
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "resources": self.nodes })
    }
}
