//! Bounded ranking of finalized sessions
//!
//! Ranking is by duration descending, ties broken by session id ascending.
//! With a non-zero cap only the best `cap` entries are retained, using a heap
//! whose top is the current worst entry.

use crate::aggregate::CandidateAggregate;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Ranked(CandidateAggregate);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    // Greater means ranked later
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .duration_us
            .cmp(&self.0.duration_us)
            .then_with(|| self.0.session_id.cmp(&other.0.session_id))
    }
}

/// Top-K selector
pub struct TopK {
    cap: usize,
    heap: BinaryHeap<Ranked>,
    offered: u64,
}

impl TopK {
    /// `cap == 0` keeps everything
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            heap: BinaryHeap::with_capacity(cap.min(1024)),
            offered: 0,
        }
    }

    /// Offer a qualifying aggregate
    pub fn push(&mut self, aggregate: CandidateAggregate) {
        self.offered += 1;
        let entry = Ranked(aggregate);

        if self.cap == 0 || self.heap.len() < self.cap {
            self.heap.push(entry);
            return;
        }

        if let Some(worst) = self.heap.peek() {
            if entry < *worst {
                self.heap.pop();
                self.heap.push(entry);
            }
        }
    }

    /// Number of aggregates offered, retained or not
    pub fn offered(&self) -> u64 {
        self.offered
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retained aggregates, best first
    pub fn into_ranked(self) -> Vec<CandidateAggregate> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Ranked(aggregate)| aggregate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctb_core::SessionRow;
    use uuid::Uuid;

    fn aggregate(id: u128, duration_us: u64) -> CandidateAggregate {
        let row = SessionRow::new(Uuid::from_u128(id), Some(duration_us), Utc::now());
        CandidateAggregate::seed(row, duration_us)
    }

    fn durations(top: TopK) -> Vec<u64> {
        top.into_ranked().iter().map(|a| a.duration_us).collect()
    }

    #[test]
    fn test_keeps_largest_within_cap() {
        let mut top = TopK::new(3);
        for (i, d) in [50, 10, 90, 30, 70, 20].into_iter().enumerate() {
            top.push(aggregate(i as u128, d));
        }

        assert_eq!(top.offered(), 6);
        assert_eq!(top.len(), 3);
        assert_eq!(durations(top), vec![90, 70, 50]);
    }

    #[test]
    fn test_zero_cap_keeps_everything() {
        let mut top = TopK::new(0);
        for (i, d) in [5, 1, 4, 2, 3].into_iter().enumerate() {
            top.push(aggregate(i as u128, d));
        }
        assert_eq!(durations(top), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_ties_break_by_session_id() {
        let mut top = TopK::new(2);
        top.push(aggregate(3, 100));
        top.push(aggregate(1, 100));
        top.push(aggregate(2, 100));

        let ids: Vec<u128> = top
            .into_ranked()
            .iter()
            .map(|a| a.session_id.as_u128())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_order_independent_of_arrival() {
        let input = [(1, 40), (2, 10), (3, 40), (4, 80), (5, 5)];

        let mut forward = TopK::new(3);
        let mut backward = TopK::new(3);
        for &(id, d) in &input {
            forward.push(aggregate(id, d));
        }
        for &(id, d) in input.iter().rev() {
            backward.push(aggregate(id, d));
        }

        let ids = |top: TopK| -> Vec<Uuid> {
            top.into_ranked().iter().map(|a| a.session_id).collect()
        };
        assert_eq!(
            ids(forward),
            vec![Uuid::from_u128(4), Uuid::from_u128(1), Uuid::from_u128(3)]
        );
        assert_eq!(
            ids(backward),
            vec![Uuid::from_u128(4), Uuid::from_u128(1), Uuid::from_u128(3)]
        );
    }

    #[test]
    fn test_empty() {
        let top = TopK::new(5);
        assert!(top.is_empty());
        assert!(top.into_ranked().is_empty());
    }
}
