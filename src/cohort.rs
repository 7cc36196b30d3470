//! Promotional cohort selection with tiered fallback.
//!
//! Tier 1 draws from the top two segment ranks, tier 2 from rank 3, tier 3
//! from everyone left, each tier sorted by monetary descending. A tier
//! stops adding the instant the target size is reached, and a cohort
//! smaller than the target is a valid result when fewer customers are
//! eligible.

use tracing::info;

use crate::segment::LabeledProfile;

const TOP_RANKS: usize = 2;
const FALLBACK_RANK: usize = 3;

/// Select up to `target` customers. The result preserves tier order and is
/// monetary-descending within each tier; no customer appears twice.
pub fn select_cohort(profiles: &[LabeledProfile], target: usize) -> Vec<LabeledProfile> {
    let mut cohort: Vec<LabeledProfile> = Vec::with_capacity(target.min(profiles.len()));

    let tiers: [&dyn Fn(&LabeledProfile) -> bool; 3] = [
        &|p| p.rank <= TOP_RANKS,
        &|p| p.rank == FALLBACK_RANK,
        &|p| p.rank > FALLBACK_RANK,
    ];
    for tier in tiers {
        if cohort.len() >= target {
            break;
        }
        let mut candidates: Vec<&LabeledProfile> =
            profiles.iter().filter(|p| tier(p)).collect();
        // Stable sort: equal spenders keep their profile-table order.
        candidates.sort_by(|a, b| {
            b.monetary
                .partial_cmp(&a.monetary)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cohort.extend(
            candidates
                .into_iter()
                .take(target - cohort.len())
                .cloned(),
        );
    }

    info!(selected = cohort.len(), target, "cohort selected");
    cohort
}
