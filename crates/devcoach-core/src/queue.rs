use crate::score::{explain, QueueItem};
use std::cmp::Ordering;

pub const DEFAULT_RECOMMENDATIONS: usize = 3;

// ---------------------------------------------------------------------------
// Math Test Method ordering
// ---------------------------------------------------------------------------

/// Easiest first; within a tier, most confident first; then oldest first;
/// then lowest number so the order is total.
fn math_test_order(a: &QueueItem, b: &QueueItem) -> Ordering {
    a.difficulty
        .cmp(&b.difficulty)
        .then_with(|| b.confidence_score.total_cmp(&a.confidence_score))
        .then_with(|| b.age_hours.total_cmp(&a.age_hours))
        .then_with(|| a.id.cmp(&b.id))
}

/// Return a sorted copy of `items`. The input is left untouched.
pub fn build_queue(items: &[QueueItem]) -> Vec<QueueItem> {
    let mut queue = items.to_vec();
    queue.sort_by(math_test_order);
    queue
}

/// The head of the queue. Truncated, never padded.
pub fn recommendations(items: &[QueueItem]) -> Vec<QueueItem> {
    recommendations_with_limit(items, DEFAULT_RECOMMENDATIONS)
}

pub fn recommendations_with_limit(items: &[QueueItem], limit: usize) -> Vec<QueueItem> {
    let mut queue = build_queue(items);
    queue.truncate(limit);
    queue
}

/// Fill in an explanation wherever upstream did not provide one.
pub fn fill_explanations(items: &mut [QueueItem]) {
    for item in items.iter_mut().filter(|i| i.explanation.is_none()) {
        item.explanation = Some(explain(item));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
