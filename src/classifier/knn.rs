use std::cmp::Ordering;
use std::collections::HashMap;

use crate::classifier::features::euclidean_distance;
use crate::classifier::store::{Exemplar, ExemplarStore};
use crate::models::Candidate;

/// Keeps inverse-distance weights finite for exact matches.
const DISTANCE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteWeighting {
    /// One vote per neighbour.
    Uniform,
    /// Each neighbour votes with `1 / (distance + epsilon)`.
    InverseDistance,
}

#[derive(Debug, Clone)]
struct LabelTally<'a> {
    label: &'a str,
    weight: f64,
    distance_sum: f64,
    latest_seq: u64,
}

/// Rank labels for `query` from its `k` nearest exemplars.
///
/// Ordering: higher vote weight first; equal weight goes to the label whose
/// neighbours have the smaller total distance, then to the label holding the
/// most recently taught neighbour, then alphabetical.
pub fn rank_labels(
    store: &ExemplarStore,
    query: &[f64],
    k: usize,
    weighting: VoteWeighting,
) -> Vec<Candidate> {
    let mut neighbours: Vec<(f64, &Exemplar)> = store
        .iter()
        .map(|exemplar| (euclidean_distance(query, &exemplar.features), exemplar))
        .collect();

    neighbours.sort_by(|(da, ea), (db, eb)| da.total_cmp(db).then(eb.seq.cmp(&ea.seq)));
    neighbours.truncate(k.max(1));

    let mut tallies: HashMap<&str, LabelTally> = HashMap::new();
    for (distance, exemplar) in &neighbours {
        let vote = match weighting {
            VoteWeighting::Uniform => 1.0,
            VoteWeighting::InverseDistance => 1.0 / (distance + DISTANCE_EPSILON),
        };

        let tally = tallies
            .entry(exemplar.label.as_str())
            .or_insert_with(|| LabelTally {
                label: exemplar.label.as_str(),
                weight: 0.0,
                distance_sum: 0.0,
                latest_seq: exemplar.seq,
            });
        tally.weight += vote;
        tally.distance_sum += distance;
        tally.latest_seq = tally.latest_seq.max(exemplar.seq);
    }

    let total: f64 = tallies.values().map(|t| t.weight).sum();
    let mut ranked: Vec<LabelTally> = tallies.into_values().collect();
    ranked.sort_by(compare_tallies);

    ranked
        .into_iter()
        .map(|tally| Candidate {
            symbol: tally.label.to_string(),
            confidence: if total > 0.0 {
                (tally.weight / total).clamp(0.0, 1.0)
            } else {
                0.0
            },
        })
        .collect()
}

fn compare_tallies(a: &LabelTally, b: &LabelTally) -> Ordering {
    b.weight
        .total_cmp(&a.weight)
        .then(a.distance_sum.total_cmp(&b.distance_sum))
        .then(b.latest_seq.cmp(&a.latest_seq))
        .then(a.label.cmp(b.label))
}
