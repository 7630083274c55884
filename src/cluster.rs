// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

use crate::{BoundingBox, Candidate};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Candidates of one class grouped by the transitive closure of the merge
/// predicate. Members are held in a canonical order so the cluster value is
/// independent of the order candidates were fed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub label: usize,
    pub members: Vec<Candidate>,
}

/// Flat-array disjoint set with union by rank and path halving.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Distance between two boxes for the merge predicate: Euclidean distance
/// between box centers normalized by the mean of the two box diagonals.
/// Symmetric, so the clustering result cannot depend on processing order.
fn merge_distance(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    let dist = (ax - bx).hypot(ay - by);
    let norm = 0.5 * (a.diagonal() + b.diagonal());
    if norm > 0.0 {
        dist / norm
    } else if dist == 0.0 {
        0.0
    } else {
        f32::INFINITY
    }
}

fn cmp_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.label
        .cmp(&b.label)
        .then(a.bbox.xmin.total_cmp(&b.bbox.xmin))
        .then(a.bbox.ymin.total_cmp(&b.bbox.ymin))
        .then(a.bbox.xmax.total_cmp(&b.bbox.xmax))
        .then(a.bbox.ymax.total_cmp(&b.bbox.ymax))
        .then(a.score.total_cmp(&b.score))
}

/// Groups candidates of the same class whose normalized center distance is
/// within `eps`, taking the transitive closure, then drops clusters with
/// fewer than `min_boxes` members. Isolated noise detections below
/// `min_boxes` are deliberately not reported.
///
/// The result is invariant under permutation of the input sequence.
pub fn merge_clusters(candidates: &[Candidate], eps: f32, min_boxes: usize) -> Vec<Cluster> {
    let mut set = DisjointSet::new(candidates.len());
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if candidates[i].label != candidates[j].label {
                continue;
            }
            if merge_distance(&candidates[i].bbox, &candidates[j].bbox) <= eps {
                set.union(i, j);
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Candidate>> = HashMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let root = set.find(i);
        groups.entry(root).or_default().push(*candidate);
    }

    let mut clusters: Vec<Cluster> = groups
        .into_values()
        .filter(|members| members.len() >= min_boxes)
        .map(|mut members| {
            members.sort_by(cmp_candidates);
            Cluster {
                label: members[0].label,
                members,
            }
        })
        .collect();
    // canonical cluster order; clusters never share a candidate so the first
    // member is a unique key
    clusters.sort_by(|a, b| cmp_candidates(&a.members[0], &b.members[0]));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(label: usize, cx: f32, cy: f32, size: f32, score: f32) -> Candidate {
        Candidate {
            label,
            score,
            bbox: BoundingBox {
                xmin: cx - size / 2.0,
                ymin: cy - size / 2.0,
                xmax: cx + size / 2.0,
                ymax: cy + size / 2.0,
            },
        }
    }

    #[test]
    fn test_min_boxes_suppresses_singletons() {
        let candidates = vec![candidate(0, 100.0, 100.0, 50.0, 0.99)];
        assert!(merge_clusters(&candidates, 0.5, 2).is_empty());
        assert_eq!(merge_clusters(&candidates, 0.5, 1).len(), 1);
    }

    #[test]
    fn test_classes_never_merge() {
        let candidates = vec![
            candidate(0, 100.0, 100.0, 50.0, 0.9),
            candidate(1, 100.0, 100.0, 50.0, 0.8),
        ];
        let clusters = merge_clusters(&candidates, 0.5, 1);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].label, 0);
        assert_eq!(clusters[1].label, 1);
    }

    #[test]
    fn test_transitive_closure() {
        // 100px boxes have a ~141.4px diagonal, so eps 0.5 merges centers
        // within ~70.7px. The outer pair is 120px apart but chained through
        // the middle box.
        let candidates = vec![
            candidate(0, 0.0, 0.0, 100.0, 0.9),
            candidate(0, 60.0, 0.0, 100.0, 0.8),
            candidate(0, 120.0, 0.0, 100.0, 0.7),
        ];
        let clusters = merge_clusters(&candidates, 0.5, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 3);
    }

    #[test]
    fn test_distant_boxes_stay_apart() {
        let candidates = vec![
            candidate(0, 0.0, 0.0, 100.0, 0.9),
            candidate(0, 10.0, 0.0, 100.0, 0.8),
            candidate(0, 500.0, 0.0, 100.0, 0.7),
            candidate(0, 510.0, 0.0, 100.0, 0.6),
        ];
        let clusters = merge_clusters(&candidates, 0.5, 2);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members.len(), 2);
        assert_eq!(clusters[1].members.len(), 2);
    }

    #[test]
    fn test_permutation_invariance() {
        let candidates = vec![
            candidate(0, 0.0, 0.0, 100.0, 0.9),
            candidate(0, 40.0, 10.0, 100.0, 0.8),
            candidate(0, 80.0, 20.0, 100.0, 0.7),
            candidate(1, 300.0, 300.0, 60.0, 0.95),
            candidate(1, 320.0, 310.0, 60.0, 0.85),
            candidate(0, 600.0, 600.0, 100.0, 0.5),
        ];
        let reference = merge_clusters(&candidates, 0.5, 2);

        let mut reversed = candidates.clone();
        reversed.reverse();
        assert_eq!(merge_clusters(&reversed, 0.5, 2), reference);

        let mut rotated = candidates.clone();
        rotated.rotate_left(3);
        assert_eq!(merge_clusters(&rotated, 0.5, 2), reference);

        let swapped = vec![
            candidates[4], candidates[0], candidates[5],
            candidates[2], candidates[3], candidates[1],
        ];
        assert_eq!(merge_clusters(&swapped, 0.5, 2), reference);
    }

    #[test]
    fn test_degenerate_boxes() {
        // zero-size boxes at the same point merge; apart they never do
        let candidates = vec![
            candidate(0, 50.0, 50.0, 0.0, 0.9),
            candidate(0, 50.0, 50.0, 0.0, 0.8),
            candidate(0, 51.0, 50.0, 0.0, 0.7),
        ];
        let clusters = merge_clusters(&candidates, 0.5, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
    }
}
