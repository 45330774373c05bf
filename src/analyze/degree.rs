use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::CollabEdge;

/// Degree of every node in the multigraph; each subject edge counts.
pub fn degrees(edges: &[CollabEdge]) -> BTreeMap<String, usize> {
    let mut degrees = BTreeMap::new();
    for edge in edges {
        *degrees.entry(edge.source.clone()).or_insert(0) += 1;
        *degrees.entry(edge.target.clone()).or_insert(0) += 1;
    }
    degrees
}

/// Degrees sorted descending, i.e. the degree-rank curve.
pub fn degree_sequence(degrees: &BTreeMap<String, usize>) -> Vec<usize> {
    let mut sequence: Vec<usize> = degrees.values().copied().collect();
    sequence.sort_unstable_by(|a, b| b.cmp(a));
    sequence
}

/// degree -> number of nodes with that degree
pub fn degree_histogram(sequence: &[usize]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for &degree in sequence {
        *histogram.entry(degree).or_insert(0) += 1;
    }
    histogram
}

/// Components largest first; equal sizes keep the order of their smallest
/// node name. Members are sorted.
pub fn connected_components(edges: &[CollabEdge]) -> Vec<Vec<String>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .insert(edge.target.as_str());
        adjacency
            .entry(edge.target.as_str())
            .or_default()
            .insert(edge.source.as_str());
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();

    for &start in adjacency.keys() {
        if !seen.insert(start) {
            continue;
        }
        let mut component = vec![start.to_string()];
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if seen.insert(next) {
                    component.push(next.to_string());
                    queue.push_back(next);
                }
            }
        }
        component.sort();
        components.push(component);
    }

    components.sort_by(|a, b| b.len().cmp(&a.len()));
    components
}
