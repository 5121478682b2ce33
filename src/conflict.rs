//! Greedy selection among mutually conflicting hypotheses.

use log::debug;
use petgraph::graph::UnGraph;

use crate::hypothesis::ScoredHypothesis;

/// Keep a non-conflicting subset of the accepted hypotheses.
///
/// Two hypotheses conflict when the overlap of their explained pixel sets
/// exceeds `intersection_fraction` of the smaller set. Selection is greedy
/// in order of descending confidence, with ties broken by the size of the
/// explained set and then by model id so that equal inputs always produce
/// the same output.
pub fn resolve_conflicts(
    mut hypotheses: Vec<ScoredHypothesis>,
    intersection_fraction: f64,
) -> Vec<ScoredHypothesis> {
    hypotheses.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.explained.len().cmp(&a.explained.len()))
            .then_with(|| a.model.cmp(&b.model))
    });

    let mut graph: UnGraph<usize, ()> = UnGraph::default();
    let nodes: Vec<_> = (0..hypotheses.len()).map(|i| graph.add_node(i)).collect();
    for i in 0..hypotheses.len() {
        for j in i + 1..hypotheses.len() {
            let a = &hypotheses[i].explained;
            let b = &hypotheses[j].explained;
            let smaller = a.len().min(b.len());
            if smaller == 0 {
                continue;
            }
            let overlap = a.intersection(b).count();
            if overlap as f64 > intersection_fraction * smaller as f64 {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    let mut removed = vec![false; hypotheses.len()];
    let mut keep = Vec::new();
    for i in 0..hypotheses.len() {
        if removed[i] {
            continue;
        }
        keep.push(i);
        for neighbor in graph.neighbors(nodes[i]) {
            removed[graph[neighbor]] = true;
        }
    }

    debug!(
        "conflict resolution kept {} of {} hypotheses",
        keep.len(),
        hypotheses.len()
    );

    let mut kept_flags = vec![false; hypotheses.len()];
    for &i in &keep {
        kept_flags[i] = true;
    }
    let mut kept_flags = kept_flags.into_iter();
    hypotheses.retain(|_| kept_flags.next().unwrap_or(false));
    hypotheses
}
