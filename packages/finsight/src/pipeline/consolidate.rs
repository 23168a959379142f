//! Consolidation - merge per-chunk partial records into one resolved
//! value set.
//!
//! A pure, synchronous merge: no oracle contact, no I/O. Conflicts are
//! resolved by declared confidence first, then by chunk order under the
//! configured [`ConflictPolicy`].

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::types::config::ConflictPolicy;
use crate::types::record::{PartialRecord, Provenance, ResolvedValue};
use crate::types::schema::Metric;

/// Merge partial records into resolved metric values.
///
/// Partial records are re-sorted by chunk index before merging, so the
/// chunk-order contract holds regardless of the completion order of the
/// underlying extraction calls. A metric unset in every partial stays
/// absent from the result - absent is never zero. Deterministic: the
/// same partial records always yield an identical value map.
pub fn consolidate(
    partials: &[PartialRecord],
    policy: ConflictPolicy,
) -> IndexMap<Metric, ResolvedValue> {
    let mut ordered: Vec<&PartialRecord> = partials.iter().collect();
    ordered.sort_by_key(|p| p.chunk_index);

    let mut resolved: IndexMap<Metric, ResolvedValue> = IndexMap::new();
    for partial in ordered {
        for (metric, reported) in &partial.values {
            let candidate = ResolvedValue {
                value: reported.value.clone(),
                provenance: Provenance {
                    chunk_index: partial.chunk_index,
                    confidence: reported.confidence,
                },
            };

            match resolved.entry(*metric) {
                Entry::Occupied(mut slot) => {
                    if candidate_wins(&candidate, slot.get(), policy) {
                        slot.insert(candidate);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(candidate);
                }
            }
        }
    }

    // Stable metric order in the output, independent of arrival order
    resolved.sort_keys();
    resolved
}

/// Whether a later-seen candidate replaces the incumbent.
///
/// Declared confidence decides first (a declared confidence beats an
/// undeclared one). With confidence absent on both sides or tied, chunk
/// order decides per policy. Candidates arrive in ascending chunk order.
fn candidate_wins(
    candidate: &ResolvedValue,
    incumbent: &ResolvedValue,
    policy: ConflictPolicy,
) -> bool {
    match (
        candidate.provenance.confidence,
        incumbent.provenance.confidence,
    ) {
        (Some(c), Some(i)) if c > i => true,
        (Some(c), Some(i)) if c < i => false,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        _ => match policy {
            ConflictPolicy::PreferLaterChunk => {
                candidate.provenance.chunk_index >= incumbent.provenance.chunk_index
            }
            ConflictPolicy::PreferEarlierChunk => false,
        },
    }
}
