//! Assembles per-item results back into input order.

use crate::items::Item;
use crate::results::ScrapeResult;

/// Error recorded for an item whose resolution produced no record at all.
pub const MISSING_RESULT: &str = "no result produced for item";

/// Places `results` (tagged with their input index) into input order.
///
/// The output always has exactly `items.len()` entries: indexes with no
/// result get a failed record, and when an index appears twice the first
/// result wins. Indexes beyond `items` are ignored.
#[must_use]
pub fn assemble(
    items: &[Item],
    results: impl IntoIterator<Item = (usize, ScrapeResult)>,
) -> Vec<ScrapeResult> {
    let mut slots: Vec<Option<ScrapeResult>> = vec![None; items.len()];

    for (index, result) in results {
        if let Some(slot) = slots.get_mut(index) {
            if slot.is_none() {
                *slot = Some(result);
            }
        }
    }

    slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| slot.unwrap_or_else(|| ScrapeResult::failed(item, MISSING_RESULT)))
        .collect()
}
