//! Interval-set union aggregate, partitioned by an external grouping key.

use super::{AggregateMeta, AggregateState};
use crate::error::Result;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessel_types::TimeSpan;

/// Partial state of the interval-union aggregate.
///
/// Spans accumulate unmerged per group; canonicalization (sorting and
/// coalescing) happens once at finalize, which is what makes the combine
/// order irrelevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionState {
    meta: AggregateMeta,
    groups: FxHashMap<String, Vec<TimeSpan>>,
}

impl UnionState {
    /// Incorporate one span under its grouping key.
    pub fn fold(state: Option<Self>, key: &str, span: TimeSpan) -> Result<Self> {
        let mut state = state.unwrap_or_else(|| Self {
            meta: AggregateMeta::union(),
            groups: FxHashMap::default(),
        });
        state.groups.entry(key.to_string()).or_default().push(span);
        Ok(state)
    }

    /// Number of groups seen so far.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Sort spans and coalesce every overlapping or adjacent pair.
fn canonicalize(mut spans: Vec<TimeSpan>) -> Vec<TimeSpan> {
    spans.sort_by_key(|span| (span.start, span.end));
    let mut merged: Vec<TimeSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.touches(&span) => last.extend_to_include(&span),
            _ => merged.push(span),
        }
    }
    merged
}

impl AggregateState for UnionState {
    /// Canonical merged interval set per group, in key order.
    type Output = BTreeMap<String, Vec<TimeSpan>>;

    fn meta(&self) -> &AggregateMeta {
        &self.meta
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        for (key, spans) in other.groups {
            self.groups.entry(key).or_default().extend(spans);
        }
        Ok(())
    }

    fn finalize(self) -> BTreeMap<String, Vec<TimeSpan>> {
        self.groups
            .into_iter()
            .map(|(key, spans)| (key, canonicalize(spans)))
            .collect()
    }
}
