// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::MAX_RUN_LENGTH;

/// Tuning knobs for a [`LayoutManager`](crate::LayoutManager).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOptions {
    /// The maximum number of characters in a single run.
    ///
    /// Runs longer than this are split, which bounds the cost of regenerating a run after
    /// a small edit deep inside it. Must be at least 1.
    pub max_run_length: usize,
    /// Whether a newly generated run whose attributes match its complete predecessor is
    /// folded into that predecessor instead of being kept as a separate run.
    ///
    /// This only changes the number of runs, never the glyphs they hold.
    pub merge_continued_runs: bool,
    /// Seed for the coin flips that assign skip list levels.
    ///
    /// Levels only affect lookup cost, so a fixed seed keeps run stores reproducible.
    pub skip_list_seed: u64,
    /// The distance between default tab stops.
    pub tab_interval: f64,
    /// Whether a soft hyphen is shown when a line breaks at it.
    pub hyphenate_at_soft_breaks: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_run_length: MAX_RUN_LENGTH,
            merge_continued_runs: true,
            skip_list_seed: 0x9e37_79b9_7f4a_7c15,
            tab_interval: 28.0,
            hyphenate_at_soft_breaks: true,
        }
    }
}

impl LayoutOptions {
    /// Returns the options with a different maximum run length.
    pub fn with_max_run_length(mut self, max_run_length: usize) -> Self {
        self.max_run_length = max_run_length.max(1);
        self
    }

    /// Returns the options with run merging turned on or off.
    pub fn with_merge_continued_runs(mut self, merge: bool) -> Self {
        self.merge_continued_runs = merge;
        self
    }

    /// Returns the options with a different skip list seed.
    pub fn with_skip_list_seed(mut self, seed: u64) -> Self {
        self.skip_list_seed = seed;
        self
    }

    /// Returns the options with a different tab interval.
    pub fn with_tab_interval(mut self, tab_interval: f64) -> Self {
        self.tab_interval = tab_interval;
        self
    }
}
