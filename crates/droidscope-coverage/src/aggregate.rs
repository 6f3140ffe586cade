//! Cross-run statistics over per-run coverage series.

use std::collections::BTreeMap;

use droidscope_graph::CoverageSnapshot;

use crate::recorder::CoverageSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Average,
    Minimum,
    Maximum,
}

impl Statistic {
    pub const ALL: [Statistic; 3] = [Statistic::Average, Statistic::Minimum, Statistic::Maximum];

    /// Prefix used in report file names.
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Average => "average",
            Statistic::Minimum => "minimum",
            Statistic::Maximum => "maximum",
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-index mean over all runs.
///
/// Every index is divided by the total number of runs, including runs
/// that never reached that index. Late indices of uneven runs therefore
/// read low.
pub fn average(results: &BTreeMap<u32, CoverageSeries>) -> CoverageSeries {
    if results.is_empty() {
        return CoverageSeries::new();
    }

    let mut sums: BTreeMap<u32, CoverageSnapshot> = BTreeMap::new();
    for series in results.values() {
        for (index, snapshot) in series.iter() {
            let sum = sums.entry(index).or_default();
            sum.interaction += snapshot.interaction;
            sum.method += snapshot.method;
        }
    }

    let runs = results.len() as f64;
    sums.into_iter()
        .map(|(index, sum)| {
            (
                index,
                CoverageSnapshot::new(sum.interaction / runs, sum.method / runs),
            )
        })
        .collect()
}

/// Componentwise minimum over the runs that reached each index.
pub fn minimum(results: &BTreeMap<u32, CoverageSeries>) -> CoverageSeries {
    fold(results, CoverageSnapshot::min)
}

/// Componentwise maximum over the runs that reached each index.
pub fn maximum(results: &BTreeMap<u32, CoverageSeries>) -> CoverageSeries {
    fold(results, CoverageSnapshot::max)
}

fn fold(
    results: &BTreeMap<u32, CoverageSeries>,
    combine: fn(CoverageSnapshot, CoverageSnapshot) -> CoverageSnapshot,
) -> CoverageSeries {
    let mut acc: BTreeMap<u32, CoverageSnapshot> = BTreeMap::new();
    for series in results.values() {
        for (index, snapshot) in series.iter() {
            acc.entry(index)
                .and_modify(|cur| *cur = combine(*cur, snapshot))
                .or_insert(snapshot);
        }
    }
    acc.into_iter().collect()
}

/// One-line summary of the final averaged sample, or `None` when nothing
/// was recorded.
pub fn overview(results: &BTreeMap<u32, CoverageSeries>) -> Option<String> {
    let (_, last) = average(results).last()?;
    Some(format!(
        "Interface {:.2}%, Method {:.2}%",
        last.interaction, last.method
    ))
}
