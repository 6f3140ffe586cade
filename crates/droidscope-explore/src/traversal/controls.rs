//! Per-screen click statistics and the control-selection policy.

use std::collections::HashMap;

use crate::automation::{Element, Point};

/// Click history of one control, keyed by its on-screen center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStats {
    pub clicks: u32,
    /// Clicking it left the screen unchanged at least once.
    pub leaf: bool,
}

impl ControlStats {
    /// A leaf that has already been tried.
    pub fn is_dead_end(&self) -> bool {
        self.leaf && self.clicks > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the element list passed to [`ActivityControlMap::select`].
    Control(usize),
    /// Nothing to click.
    Back,
}

/// Click statistics per screen.
#[derive(Debug, Clone, Default)]
pub struct ActivityControlMap {
    screens: HashMap<String, HashMap<Point, ControlStats>>,
}

impl ActivityControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the next control on `screen`.
    ///
    /// The first unseen element wins and gets a fresh entry. Otherwise the
    /// element with the fewest clicks among those that are not dead ends
    /// is chosen, first one on ties. When every element is a dead end the
    /// first element is chosen.
    pub fn select(&mut self, screen: &str, elements: &[Element]) -> Selection {
        if elements.is_empty() {
            tracing::info!("No controls found, recommend pressing back button.");
            return Selection::Back;
        }

        let known = self.screens.entry(screen.to_string()).or_default();

        if let Some(index) = elements.iter().position(|e| !known.contains_key(&e.center)) {
            known.insert(elements[index].center, ControlStats::default());
            tracing::info!(
                "Recommend '{}' for next interaction.",
                elements[index].describe()
            );
            return Selection::Control(index);
        }

        let mut best: Option<(usize, u32)> = None;
        for (index, element) in elements.iter().enumerate() {
            let stats = known.get(&element.center).copied().unwrap_or_default();
            if stats.is_dead_end() {
                continue;
            }
            if best.map_or(true, |(_, clicks)| stats.clicks < clicks) {
                best = Some((index, stats.clicks));
            }
        }

        let index = best.map_or(0, |(index, _)| index);
        tracing::info!(
            "Recommend '{}' for next interaction.",
            elements[index].describe()
        );
        Selection::Control(index)
    }

    /// Count a click on the control at `center` and fold in its leaf flag.
    pub fn record_click(&mut self, screen: &str, center: Point, leaf: bool) -> ControlStats {
        let stats = self
            .screens
            .entry(screen.to_string())
            .or_default()
            .entry(center)
            .or_default();
        stats.clicks += 1;
        stats.leaf |= leaf;
        *stats
    }

    pub fn stats(&self, screen: &str, center: Point) -> Option<ControlStats> {
        self.screens.get(screen)?.get(&center).copied()
    }

    /// Number of screens seen.
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}
