//! # History Statistics
//!
//! Dashboard figures over one owner's saved snapshots.
//!
//! | Figure            | Counted over                                   |
//! |-------------------|------------------------------------------------|
//! | `total`           | every snapshot                                 |
//! | `drafts`          | snapshots saved as drafts                      |
//! | `finalized`       | the rest                                       |
//! | `last_7_days`     | saved in the 7 days up to `now`                |
//! | `this_month`      | saved in the calendar month of `now` (UTC)     |
//! | `category_usage`  | snapshots selecting each category              |
//! | `top_sectors`     | snapshots per sector, most used first          |
//!
//! Snapshots without a save time count towards neither time window.

use crate::primitives::TOP_SECTORS;
use crate::storage::Snapshot;
use crate::{CategoryId, SectorId};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated history figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub drafts: usize,
    pub finalized: usize,
    pub last_7_days: usize,
    pub this_month: usize,
    pub category_usage: BTreeMap<CategoryId, usize>,
    pub top_sectors: Vec<SectorUsage>,
}

/// One row of the sector ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorUsage {
    pub sector: SectorId,
    pub count: usize,
}

impl HistoryStats {
    /// Compute figures as of `now`.
    #[must_use]
    pub fn compute(snapshots: &[Snapshot], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(7);
        let mut stats = Self {
            total: snapshots.len(),
            ..Self::default()
        };
        let mut sectors: BTreeMap<&SectorId, usize> = BTreeMap::new();

        for snapshot in snapshots {
            let composition = &snapshot.composition;
            if composition.is_draft() {
                stats.drafts += 1;
            } else {
                stats.finalized += 1;
            }

            if let Some(saved) = composition.created_at() {
                if saved > week_ago && saved <= now {
                    stats.last_7_days += 1;
                }
                if saved.year() == now.year() && saved.month() == now.month() {
                    stats.this_month += 1;
                }
            }

            for id in composition.category_order() {
                *stats.category_usage.entry(id.clone()).or_default() += 1;
            }
            *sectors.entry(composition.sector()).or_default() += 1;
        }

        let mut ranking: Vec<SectorUsage> = sectors
            .into_iter()
            .map(|(sector, count)| SectorUsage {
                sector: sector.clone(),
                count,
            })
            .collect();
        // BTreeMap order makes ties fall back to sector id.
        ranking.sort_by(|a, b| b.count.cmp(&a.count));
        ranking.truncate(TOP_SECTORS);
        stats.top_sectors = ranking;

        stats
    }

    /// The most used category, if any. Ties go to the lowest id.
    #[must_use]
    pub fn favourite_category(&self) -> Option<(&CategoryId, usize)> {
        self.category_usage
            .iter()
            .fold(None, |best, (id, count)| match best {
                Some((_, top)) if top >= *count => best,
                _ => Some((id, *count)),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Composition, OwnerId, ReorderEngine, SnapshotId, SubIndex};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 3, 12, 0, 0).single().unwrap()
    }

    fn snapshot(id: u64, sector: &str, draft: bool, saved: Option<DateTime<Utc>>, cats: &[&str]) -> Snapshot {
        let mut composition = Composition::new(SectorId::new(sector));
        composition.set_draft(draft);
        if let Some(at) = saved {
            composition.set_created_at(at);
        }
        for cat in cats {
            ReorderEngine::toggle_subcriterion(&mut composition, &CategoryId::new(*cat), SubIndex(0))
                .unwrap();
        }
        Snapshot {
            id: SnapshotId(id),
            owner: OwnerId::new("alice"),
            composition,
        }
    }

    #[test]
    fn empty_history() {
        let stats = HistoryStats::compute(&[], now());
        assert_eq!(stats, HistoryStats::default());
        assert!(stats.favourite_category().is_none());
    }

    #[test]
    fn counts_and_windows() {
        let snapshots = vec![
            snapshot(1, "it", true, Some(now() - Duration::days(1)), &["C1", "C2"]),
            snapshot(2, "it", false, Some(now() - Duration::days(6)), &["C1"]),
            snapshot(3, "retail", false, Some(now() - Duration::days(10)), &["C3"]),
            snapshot(4, "housing", true, None, &["C1"]),
        ];
        let stats = HistoryStats::compute(&snapshots, now());

        assert_eq!(stats.total, 4);
        assert_eq!(stats.drafts, 2);
        assert_eq!(stats.finalized, 2);
        assert_eq!(stats.last_7_days, 2);
        // Oct 3 minus 6 days is still September.
        assert_eq!(stats.this_month, 1);
        assert_eq!(stats.category_usage[&CategoryId::new("C1")], 3);
        assert_eq!(stats.favourite_category(), Some((&CategoryId::new("C1"), 3)));
    }

    #[test]
    fn top_sectors_ranked_and_truncated() {
        let sectors = ["a", "b", "b", "c", "c", "c", "d", "e", "f", "g"];
        let snapshots: Vec<Snapshot> = sectors
            .iter()
            .enumerate()
            .map(|(i, s)| snapshot(i as u64, s, false, None, &["C1"]))
            .collect();
        let stats = HistoryStats::compute(&snapshots, now());

        let ranking: Vec<(&str, usize)> = stats
            .top_sectors
            .iter()
            .map(|u| (u.sector.as_str(), u.count))
            .collect();
        assert_eq!(ranking, vec![("c", 3), ("b", 2), ("a", 1), ("d", 1), ("e", 1)]);
    }
}
