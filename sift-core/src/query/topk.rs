//! Bounded top-k collector

use crate::{DocId, Score, ScoredDoc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Heap entry. Orders by score, then by arrival: of two equal scores the
/// one seen first ranks higher.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    doc_id: DocId,
    score: Score,
    seq: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Keeps the `k` best documents seen so far
#[derive(Debug)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    seq: u64,
}

impl TopK {
    /// Create a collector for `k` results
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
            seq: 0,
        }
    }

    /// Offer a candidate. Once full, a candidate only displaces the current
    /// minimum when its score is strictly greater. Returns whether it was kept.
    pub fn push(&mut self, doc_id: DocId, score: Score) -> bool {
        if self.k == 0 {
            return false;
        }
        let entry = HeapEntry {
            doc_id,
            score,
            seq: self.seq,
        };
        self.seq += 1;

        if self.heap.len() < self.k {
            self.heap.push(Reverse(entry));
            return true;
        }
        match self.threshold() {
            Some(threshold) if score > threshold => {
                self.heap.pop();
                self.heap.push(Reverse(entry));
                true
            }
            _ => false,
        }
    }

    /// Score of the weakest kept result, once `k` results are held
    pub fn threshold(&self) -> Option<Score> {
        if self.is_full() {
            self.heap.peek().map(|Reverse(entry)| entry.score)
        } else {
            None
        }
    }

    /// A candidate with this score would be kept
    pub fn would_accept(&self, score: Score) -> bool {
        self.k > 0 && self.threshold().map_or(true, |threshold| score > threshold)
    }

    /// The collector holds `k` results
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Number of results held
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// No results held yet
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Results by descending score, ties in arrival order
    pub fn into_sorted_vec(self) -> Vec<ScoredDoc> {
        // Ascending order of Reverse<_> is descending rank
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(entry)| ScoredDoc::new(entry.doc_id, entry.score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_best_k() {
        let mut topk = TopK::new(3);
        for (doc, score) in [(1, 0.5), (2, 3.0), (3, 1.0), (4, 2.0), (5, 0.1)] {
            topk.push(doc, score);
        }
        let docs: Vec<DocId> = topk.into_sorted_vec().iter().map(|d| d.doc_id).collect();
        assert_eq!(docs, vec![2, 4, 3]);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let mut topk = TopK::new(2);
        assert!(topk.push(7, 1.0));
        assert!(topk.push(3, 1.0));
        // Equal score never displaces
        assert!(!topk.push(9, 1.0));
        assert_eq!(topk.threshold(), Some(1.0));

        let docs: Vec<DocId> = topk.into_sorted_vec().iter().map(|d| d.doc_id).collect();
        assert_eq!(docs, vec![7, 3]);
    }

    #[test]
    fn test_threshold_only_when_full() {
        let mut topk = TopK::new(2);
        assert_eq!(topk.threshold(), None);
        assert!(topk.would_accept(0.0));
        topk.push(1, 4.0);
        assert_eq!(topk.threshold(), None);
        topk.push(2, 2.0);
        assert_eq!(topk.threshold(), Some(2.0));
        assert!(!topk.would_accept(2.0));
        assert!(topk.would_accept(2.5));
    }

    #[test]
    fn test_zero_capacity() {
        let mut topk = TopK::new(0);
        assert!(!topk.push(1, 10.0));
        assert!(topk.is_empty());
        assert!(!topk.would_accept(10.0));
    }
}
