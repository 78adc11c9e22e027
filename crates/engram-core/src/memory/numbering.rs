//! Unified per-run numbering of existing memories and new facts.
//!
//! The merge-decision model needs to reference heterogeneous items --
//! matched existing memories and freshly extracted facts -- by small
//! integers. `UnifiedIndex` assigns existing memories `1..=E` in first-seen
//! order (scanning facts in extraction order, then each fact's ranked
//! results) and leaves `E+1..=E+F` for the facts in extraction order.
//!
//! The numbering is a local bijection, rebuilt identically each run from
//! the same inputs, and is never persisted.

use std::collections::HashSet;

use engram_types::memory::{MemoryRecord, RankedMemory};
use uuid::Uuid;

/// Per-run numbering over matched existing memories and new facts.
#[derive(Debug)]
pub struct UnifiedIndex {
    /// Distinct matched memories, position `i` holding number `i + 1`.
    existing: Vec<MemoryRecord>,
    fact_count: usize,
}

impl UnifiedIndex {
    /// Build the index from each fact's ranked search results.
    ///
    /// `per_fact_matches` must be in fact extraction order, each inner list
    /// in descending similarity order; duplicates across facts keep their
    /// first-seen number.
    pub fn build(per_fact_matches: &[Vec<RankedMemory>], fact_count: usize) -> Self {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut existing = Vec::new();

        for matches in per_fact_matches {
            for ranked in matches {
                if seen.insert(ranked.record.id) {
                    existing.push(ranked.record.clone());
                }
            }
        }

        Self {
            existing,
            fact_count,
        }
    }

    /// The distinct matched memories in numbering order (`1..=E`).
    pub fn existing(&self) -> &[MemoryRecord] {
        &self.existing
    }

    /// E: how many distinct existing memories were matched.
    pub fn existing_count(&self) -> usize {
        self.existing.len()
    }

    /// F: how many facts this run extracted.
    pub fn fact_count(&self) -> usize {
        self.fact_count
    }

    /// The matched memory labeled `number`, if `number` is in `1..=E`.
    pub fn existing_by_number(&self, number: u32) -> Option<&MemoryRecord> {
        let n = number as usize;
        if n >= 1 && n <= self.existing.len() {
            Some(&self.existing[n - 1])
        } else {
            None
        }
    }

    /// The fact index (0-based) labeled `number`, if `number` is in
    /// `E+1..=E+F`.
    pub fn fact_index(&self, number: u32) -> Option<usize> {
        let n = number as usize;
        let e = self.existing.len();
        if n > e && n <= e + self.fact_count {
            Some(n - e - 1)
        } else {
            None
        }
    }
}
