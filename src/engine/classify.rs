use crate::model::*;

// ── Classification ────────────────────────────────────────────────

/// Mark every slot whose one-hour span overlaps any busy interval as booked.
///
/// `is_past` passes through untouched. Busy intervals are sorted and merged
/// once, so each slot is answered by a single binary search.
pub fn classify(slots: &[Slot], busy: &[BusyInterval]) -> Vec<Slot> {
    let mut sorted: Vec<Span> = busy.iter().filter(|b| b.start < b.end).copied().collect();
    sorted.sort_by_key(|s| s.start);
    let merged = merge_overlapping(&sorted);

    slots
        .iter()
        .map(|slot| Slot {
            is_booked: is_busy(&merged, &slot.span()),
            ..slot.clone()
        })
        .collect()
}

/// True if `span` overlaps any of the disjoint, sorted `merged` intervals.
fn is_busy(merged: &[Span], span: &Span) -> bool {
    // Everything at index >= bound starts at or after span.end → can't overlap.
    let bound = merged.partition_point(|b| b.start < span.end);
    bound > 0 && merged[bound - 1].end > span.start
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}
