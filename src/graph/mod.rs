// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dependency Graph Resolver
//!
//! Orders the output resources of one render result so that every resource is
//! deployed after the resources it depends on, and deleted before them.
//!
//! # Architecture
//!
//! ```text
//! OutputResource.dependencies ──▶ DiGraph (dependency → dependent)
//!                                      │
//!                                 Kahn toposort
//!                                      │
//!                     deploy order ◀───┴───▶ delete order (reversed)
//! ```
//!
//! Ties between independent resources are broken by their position in the
//! render result, so the order is reproducible.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use thiserror::Error;

use crate::domain::OutputResource;

/// Malformed output resource graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A dependency entry has an empty local ID
    #[error("missing localID for outputresource {local_id:?}")]
    EmptyDependency { local_id: String },

    /// A dependency names a local ID that is not part of the render result
    #[error("missing localID {dependency:?} for outputresource {local_id:?}")]
    DanglingDependency { local_id: String, dependency: String },

    /// Two output resources share a local ID
    #[error("duplicate localID {0:?} in output resources")]
    DuplicateLocalId(String),

    /// Dependencies form a cycle
    #[error("dependency cycle detected involving outputresource {local_id:?}")]
    CycleDetected { local_id: String },
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Dependency graph over output resource local IDs
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    index_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build and validate the graph for a render result
    pub fn build(resources: &[OutputResource]) -> GraphResult<Self> {
        let mut graph = DiGraph::with_capacity(resources.len(), resources.len());
        let mut index_map = HashMap::with_capacity(resources.len());

        for resource in resources {
            if index_map.contains_key(&resource.local_id) {
                return Err(GraphError::DuplicateLocalId(resource.local_id.clone()));
            }
            let idx = graph.add_node(resource.local_id.clone());
            index_map.insert(resource.local_id.clone(), idx);
        }

        for resource in resources {
            let dependent = index_map[&resource.local_id];
            for dependency in resource.dependency_ids() {
                if dependency.is_empty() {
                    return Err(GraphError::EmptyDependency {
                        local_id: resource.local_id.clone(),
                    });
                }
                let upstream = index_map.get(dependency).copied().ok_or_else(|| {
                    GraphError::DanglingDependency {
                        local_id: resource.local_id.clone(),
                        dependency: dependency.to_string(),
                    }
                })?;
                graph.update_edge(upstream, dependent, ());
            }
        }

        Ok(Self { graph, index_map })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Local IDs in deploy order
    ///
    /// Kahn's algorithm; nodes become ready in render order.
    pub fn deploy_order(&self) -> GraphResult<Vec<String>> {
        let node_count = self.graph.node_count();
        let mut in_degree = vec![0usize; node_count];
        for edge in self.graph.edge_references() {
            in_degree[edge.target().index()] += 1;
        }

        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(node_count);
        while let Some(idx) = queue.pop_front() {
            order.push(self.graph[idx].clone());

            let mut dependents: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();
            dependents.sort_by_key(|n| n.index());

            for dependent in dependents {
                let degree = &mut in_degree[dependent.index()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() != node_count {
            let local_id = self
                .graph
                .node_indices()
                .find(|idx| in_degree[idx.index()] > 0)
                .map(|idx| self.graph[idx].clone())
                .unwrap_or_default();
            return Err(GraphError::CycleDetected { local_id });
        }

        Ok(order)
    }

    /// Local IDs in delete order (dependents first)
    pub fn delete_order(&self) -> GraphResult<Vec<String>> {
        let mut order = self.deploy_order()?;
        order.reverse();
        Ok(order)
    }

    /// Direct dependencies of a local ID
    pub fn dependencies_of(&self, local_id: &str) -> Vec<String> {
        let Some(&idx) = self.index_map.get(local_id) else {
            return Vec::new();
        };
        let mut upstream: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        upstream.sort_by_key(|n| n.index());
        upstream.into_iter().map(|n| self.graph[n].clone()).collect()
    }
}

/// Reorder output resources into deploy order
pub fn order_output_resources(resources: Vec<OutputResource>) -> GraphResult<Vec<OutputResource>> {
    let order = DependencyGraph::build(&resources)?.deploy_order()?;
    let mut by_id: HashMap<String, OutputResource> = resources
        .into_iter()
        .map(|r| (r.local_id.clone(), r))
        .collect();

    Ok(order
        .iter()
        .filter_map(|local_id| by_id.remove(local_id))
        .collect())
}
