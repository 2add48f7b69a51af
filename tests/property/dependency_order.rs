// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Dependency Ordering
//!
//! Random DAGs are generated by only letting node `i` depend on nodes with a
//! smaller index, then presented to the resolver in shuffled order.

use cim_deployment::domain::{OutputResource, Provider, ResourceType};
use cim_deployment::graph::{order_output_resources, DependencyGraph, GraphError};
use proptest::prelude::*;
use std::collections::HashMap;

fn local_id(index: usize) -> String {
    format!("R{}", index)
}

fn build(edges: &[Vec<bool>], permutation: &[usize]) -> Vec<OutputResource> {
    permutation
        .iter()
        .map(|&node| {
            let resource = OutputResource::new(local_id(node), ResourceType::new("Deployment", Provider::Kubernetes));
            (0..node)
                .filter(|&upstream| edges[node][upstream])
                .fold(resource, |resource, upstream| resource.with_dependency(local_id(upstream)))
        })
        .collect()
}

fn dag() -> impl Strategy<Value = (Vec<Vec<bool>>, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

fn positions(order: &[String]) -> HashMap<&str, usize> {
    order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect()
}

proptest! {
    /// Every dependency is deployed before its dependent
    #[test]
    fn prop_deploy_order_respects_dependencies((edges, permutation) in dag()) {
        let resources = build(&edges, &permutation);
        let order = DependencyGraph::build(&resources).unwrap().deploy_order().unwrap();

        prop_assert_eq!(order.len(), resources.len());
        let position = positions(&order);
        for resource in &resources {
            for dependency in resource.dependency_ids() {
                prop_assert!(position[dependency] < position[resource.local_id.as_str()]);
            }
        }
    }

    /// Every dependent is deleted before its dependency
    #[test]
    fn prop_delete_order_reverses_dependencies((edges, permutation) in dag()) {
        let resources = build(&edges, &permutation);
        let order = DependencyGraph::build(&resources).unwrap().delete_order().unwrap();

        let position = positions(&order);
        for resource in &resources {
            for dependency in resource.dependency_ids() {
                prop_assert!(position[resource.local_id.as_str()] < position[dependency]);
            }
        }
    }

    /// Reordering keeps every resource exactly once
    #[test]
    fn prop_ordering_is_a_permutation((edges, permutation) in dag()) {
        let resources = build(&edges, &permutation);
        let ordered = order_output_resources(resources.clone()).unwrap();

        let mut before: Vec<&str> = resources.iter().map(|r| r.local_id.as_str()).collect();
        let mut after: Vec<&str> = ordered.iter().map(|r| r.local_id.as_str()).collect();
        before.sort_unstable();
        after.sort_unstable();
        prop_assert_eq!(before, after);
    }

    /// Independent resources keep their render order
    #[test]
    fn prop_independent_resources_keep_render_order(
        permutation in Just((0..10).collect::<Vec<usize>>()).prop_shuffle()
    ) {
        let edges = vec![vec![false; 10]; 10];
        let resources = build(&edges, &permutation);
        let order = DependencyGraph::build(&resources).unwrap().deploy_order().unwrap();

        let expected: Vec<String> = permutation.iter().map(|&i| local_id(i)).collect();
        prop_assert_eq!(order, expected);
    }

    /// Closing a chain into a loop is always detected
    #[test]
    fn prop_cycles_are_rejected(len in 1usize..10) {
        let resources: Vec<OutputResource> = (0..len)
            .map(|i| {
                OutputResource::new(local_id(i), ResourceType::new("Deployment", Provider::Kubernetes))
                    .with_dependency(local_id((i + 1) % len))
            })
            .collect();

        let result = DependencyGraph::build(&resources).and_then(|graph| graph.deploy_order());
        let is_cycle = matches!(result, Err(GraphError::CycleDetected { .. }));
        prop_assert!(is_cycle);
    }
}
