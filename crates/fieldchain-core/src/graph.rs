//! Dependency graph between fields
//!
//! Directed edges run from parent to child: the child's options depend on the
//! parent's selection. The graph is kept acyclic; an edge that would make a
//! field its own ancestor is rejected.

use crate::error::ChainError;
use fieldchain_options::FieldId;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// Acyclic parent → child relation between fields
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    inner: DiGraph<FieldId, ()>,
    index: HashMap<FieldId, NodeIndex>,
}

impl DependencyGraph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field
    ///
    /// # Errors
    /// - `ChainError::DuplicateField` if the field is already registered
    pub fn add_field(&mut self, id: FieldId) -> Result<(), ChainError> {
        if self.index.contains_key(&id) {
            return Err(ChainError::DuplicateField(id));
        }
        let idx = self.inner.add_node(id.clone());
        self.index.insert(id, idx);
        Ok(())
    }

    /// Add a dependency edge
    ///
    /// # Errors
    /// - `ChainError::UnknownField` if either side is not registered
    /// - `ChainError::SelfLoop` if `parent == child`
    /// - `ChainError::CycleDetected` if the edge closes a cycle
    pub fn add_edge(&mut self, parent: &FieldId, child: &FieldId) -> Result<(), ChainError> {
        if parent == child {
            return Err(ChainError::SelfLoop(parent.clone()));
        }
        let from = self.node(parent)?;
        let to = self.node(child)?;

        if self.inner.contains_edge(from, to) {
            return Ok(());
        }

        let edge = self.inner.add_edge(from, to, ());
        if is_cyclic_directed(&self.inner) {
            self.inner.remove_edge(edge);
            return Err(ChainError::CycleDetected {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
        Ok(())
    }

    /// Check if field is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &FieldId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered fields
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Direct parents of a field, in registration order
    #[must_use]
    pub fn parents(&self, id: &FieldId) -> Vec<FieldId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct children of a field, in registration order
    #[must_use]
    pub fn children(&self, id: &FieldId) -> Vec<FieldId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Fields ordered so every parent precedes its children
    #[must_use]
    pub fn topological_order(&self) -> Vec<FieldId> {
        // add_edge keeps the graph acyclic, so toposort cannot fail
        toposort(&self.inner, None)
            .map(|order| order.into_iter().map(|idx| self.inner[idx].clone()).collect())
            .unwrap_or_default()
    }

    /// Position of each field in topological order
    #[must_use]
    pub fn topological_rank(&self) -> HashMap<FieldId, usize> {
        self.topological_order()
            .into_iter()
            .enumerate()
            .map(|(rank, id)| (id, rank))
            .collect()
    }

    fn node(&self, id: &FieldId) -> Result<NodeIndex, ChainError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ChainError::UnknownField(id.clone()))
    }

    fn neighbors(&self, id: &FieldId, direction: Direction) -> Vec<FieldId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<(NodeIndex, FieldId)> = self
            .inner
            .neighbors_directed(idx, direction)
            .map(|n| (n, self.inner[n].clone()))
            .collect();
        // petgraph yields neighbours newest-first
        out.sort_by_key(|(n, _)| n.index());
        out.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FieldId {
        FieldId::new(s)
    }

    fn objects_api_graph() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for f in ["group", "objecttype", "version", "properties"] {
            g.add_field(id(f)).unwrap();
        }
        g.add_edge(&id("group"), &id("objecttype")).unwrap();
        g.add_edge(&id("group"), &id("version")).unwrap();
        g.add_edge(&id("objecttype"), &id("version")).unwrap();
        g.add_edge(&id("version"), &id("properties")).unwrap();
        g
    }

    #[test]
    fn parents_and_children() {
        let g = objects_api_graph();
        assert_eq!(g.parents(&id("version")), vec![id("group"), id("objecttype")]);
        assert_eq!(g.children(&id("group")), vec![id("objecttype"), id("version")]);
        assert!(g.parents(&id("group")).is_empty());
    }

    #[test]
    fn cycle_rejected_and_graph_unchanged() {
        let mut g = objects_api_graph();
        let edges = g.edge_count();

        let err = g.add_edge(&id("properties"), &id("group")).unwrap_err();
        assert!(matches!(err, ChainError::CycleDetected { .. }));
        assert_eq!(g.edge_count(), edges);
    }

    #[test]
    fn self_loop_rejected() {
        let mut g = objects_api_graph();
        assert!(matches!(
            g.add_edge(&id("group"), &id("group")),
            Err(ChainError::SelfLoop(_))
        ));
    }

    #[test]
    fn unknown_and_duplicate_fields() {
        let mut g = objects_api_graph();
        assert!(matches!(
            g.add_edge(&id("group"), &id("missing")),
            Err(ChainError::UnknownField(_))
        ));
        assert!(matches!(g.add_field(id("group")), Err(ChainError::DuplicateField(_))));
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let g = objects_api_graph();
        let rank = g.topological_rank();
        assert!(rank[&id("group")] < rank[&id("objecttype")]);
        assert!(rank[&id("objecttype")] < rank[&id("version")]);
        assert!(rank[&id("version")] < rank[&id("properties")]);
    }
}
