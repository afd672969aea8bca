//! Statistics aggregator.
//!
//! Pure function over the watchlist's ordered scan. A row is a win when
//! its best multiplier reached the threshold. Groups are reported in the
//! order they are first encountered in the scan.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::types::TrackedItem;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub group_name: String,
    pub total: usize,
    pub wins: usize,
    /// Percentage, 0–100.
    pub winrate: f64,
}

impl GroupStats {
    fn new(group_name: &str) -> Self {
        Self {
            group_name: group_name.to_string(),
            total: 0,
            wins: 0,
            winrate: 0.0,
        }
    }

    fn finish(&mut self) {
        self.winrate = winrate(self.wins, self.total);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub win_threshold: f64,
    /// Detail rows in scan order (best multiplier first).
    pub rows: Vec<TrackedItem>,
    /// Index of the first sub-threshold row, when at least one win
    /// precedes it.
    pub boundary_index: Option<usize>,
    pub groups: Vec<GroupStats>,
    pub overall: GroupStats,
}

fn winrate(wins: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * wins as f64 / total as f64
    }
}

/// Build the report from rows already ordered by best multiplier,
/// descending.
pub fn build_report(items: Vec<TrackedItem>, win_threshold: f64) -> PerformanceReport {
    let mut groups: Vec<GroupStats> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut overall = GroupStats::new("Overall");
    let mut boundary_index = None;
    let mut seen_loss = false;

    for (i, item) in items.iter().enumerate() {
        let win = item.is_win(win_threshold);

        if !win && !seen_loss {
            seen_loss = true;
            if i > 0 {
                boundary_index = Some(i);
            }
        }

        let slot = *index_of.entry(item.group_name.clone()).or_insert_with(|| {
            groups.push(GroupStats::new(&item.group_name));
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += 1;
        overall.total += 1;
        if win {
            group.wins += 1;
            overall.wins += 1;
        }
    }

    groups.iter_mut().for_each(GroupStats::finish);
    overall.finish();

    PerformanceReport {
        win_threshold,
        rows: items,
        boundary_index,
        groups,
        overall,
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CA | Highest Multiplier | From Group")?;
        writeln!(f, "{}", "-".repeat(40))?;

        for (i, item) in self.rows.iter().enumerate() {
            if self.boundary_index == Some(i) {
                writeln!(f, "\n{}\n", "-".repeat(30))?;
            }
            writeln!(f, "{item}")?;
        }

        writeln!(f, "\nGroup Performance Stats:")?;
        writeln!(f, "Plays Overall: {}", self.overall.total)?;
        writeln!(f, "Winrate Overall: {:.2}%", self.overall.winrate)?;

        for group in &self.groups {
            writeln!(f, "Group: {}", group.group_name)?;
            writeln!(f, "  Total CAs: {}", group.total)?;
            writeln!(f, "  Winrate Group: {:.2}%", group.winrate)?;
        }
        Ok(())
    }
}
