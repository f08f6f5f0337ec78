// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The run skip list.
//!
//! Runs live in an arena and link to each other by index. Every node has one forward
//! link per level it occupies, and every link records the characters and glyphs it
//! skips over, so a lookup by either index descends from the highest occupied level in
//! expected `O(log n)` steps. Level `0` is additionally linked backwards.
//!
//! Node `0` is the head sentinel. It is the only node on the topmost level, so its top
//! link always spans the whole text.

use alloc::vec;
use alloc::vec::Vec;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::consistency_failure;
use crate::glyph::{Glyph, GlyphFlags};
use crate::run::{Link, Run, RunId, RunInfo, Span};
use crate::{SKIP_LIST_DEPTH, SKIP_LIST_LEVEL_PROBABILITY};

const HEAD: RunId = RunId(0);

/// Counters for structural events, for instrumentation and tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Runs split because they grew past the maximum run length or changed attributes.
    pub splits: u64,
    /// Runs folded into a continued predecessor.
    pub merges: u64,
}

#[derive(Copy, Clone, Debug)]
enum Key {
    Char(usize),
    Glyph(usize),
}

impl Key {
    /// Whether a node starting at `start` lies before the key.
    fn follows(self, start: Span, inclusive: bool) -> bool {
        let (position, target) = match self {
            Self::Char(target) => (start.chars, target),
            Self::Glyph(target) => (start.glyphs, target),
        };
        if inclusive {
            position <= target
        } else {
            position < target
        }
    }
}

/// The last node visited on each level during a descent, with its start position.
struct Path {
    nodes: [RunId; SKIP_LIST_DEPTH],
    starts: [Span; SKIP_LIST_DEPTH],
}

/// Skip list of glyph runs ordered by character position.
///
/// The sum of the runs' character lengths always equals the length of the text the
/// store was built for, whether or not glyphs have been generated. Glyphs are
/// generated front to back: the characters before [`RunStore::generated_prefix`] all
/// have glyphs, and every run before that point is complete.
#[derive(Clone, Debug)]
pub struct RunStore {
    nodes: Vec<Option<Run>>,
    free: Vec<RunId>,
    /// The highest level occupied by a run.
    level: usize,
    generated_prefix: usize,
    max_run_length: usize,
    rng: SmallRng,
    /// Bumped on every change to run extents, to invalidate cached run positions.
    stamp: u64,
    stats: StoreStats,
}

impl RunStore {
    pub(crate) fn new(max_run_length: usize, seed: u64) -> Self {
        let mut head = Run::new(SKIP_LIST_DEPTH - 1, 0);
        head.complete = true;
        Self {
            nodes: vec![Some(head)],
            free: Vec::new(),
            level: 0,
            generated_prefix: 0,
            max_run_length: max_run_length.max(1),
            rng: SmallRng::seed_from_u64(seed),
            stamp: 0,
            stats: StoreStats::default(),
        }
    }

    /// The number of characters covered by all runs.
    pub fn len(&self) -> usize {
        self.total().chars
    }

    /// Returns `true` if the store holds no runs.
    pub fn is_empty(&self) -> bool {
        self.node(HEAD).links[0].next.is_none()
    }

    /// The number of glyphs currently materialized across all runs.
    pub fn glyph_count(&self) -> usize {
        self.total().glyphs
    }

    /// The number of runs.
    pub fn run_count(&self) -> usize {
        self.nodes.len() - self.free.len() - 1
    }

    /// The number of leading characters whose glyphs are generated.
    pub fn generated_prefix(&self) -> usize {
        self.generated_prefix
    }

    /// The cap on the number of characters in a run.
    pub fn max_run_length(&self) -> usize {
        self.max_run_length
    }

    /// Structural event counters.
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Iterates over the runs in text order.
    pub fn runs(&self) -> impl Iterator<Item = RunInfo> + '_ {
        let mut next = self.node(HEAD).links[0].next;
        let mut start = Span::ZERO;
        core::iter::from_fn(move || {
            let id = next?;
            let run = self.node(id);
            let end = start + run.extent();
            let info = RunInfo {
                id,
                char_range: start.chars..end.chars,
                glyph_range: start.glyphs..end.glyphs,
                level: run.level(),
                complete: run.complete,
                continued: run.continued,
                attributes: run.attributes,
            };
            start = end;
            next = run.links[0].next;
            Some(info)
        })
    }

    /// Verifies every structural invariant of the skip list.
    ///
    /// # Panics
    ///
    /// Panics if a link span disagrees with the runs it covers, a back link is wrong,
    /// a run is empty or longer than the maximum run length, the generated glyphs of a
    /// run are not a prefix of it, a run before the generated prefix is incomplete, or a
    /// run is marked continued after a resolved run with other attributes.
    pub fn check_consistency(&self) {
        let mut starts: Vec<Option<Span>> = vec![None; self.nodes.len()];
        starts[HEAD.index()] = Some(Span::ZERO);
        let mut prev = None;
        let mut next = self.node(HEAD).links[0].next;
        let mut position = Span::ZERO;
        while let Some(id) = next {
            let run = self.node(id);
            starts[id.index()] = Some(position);
            if run.prev != prev {
                consistency_failure(format_args!("back link of {id:?} is {:?}", run.prev));
            }
            if run.continued {
                // An unresolved predecessor refreshes the flag once it is resolved.
                let continues = prev.is_some_and(|prev| {
                    self.node(prev)
                        .attributes
                        .is_none_or(|attributes| Some(attributes) == run.attributes)
                });
                if !continues {
                    consistency_failure(format_args!("run {id:?} continues different attributes"));
                }
            }
            if run.char_length == 0 || run.char_length > self.max_run_length {
                consistency_failure(format_args!(
                    "run {id:?} has {} characters (max {})",
                    run.char_length, self.max_run_length
                ));
            }
            if run.level() >= SKIP_LIST_DEPTH - 1 {
                consistency_failure(format_args!("run {id:?} occupies the head level"));
            }
            if run.generated_chars > run.char_length
                || run.complete != (run.generated_chars == run.char_length)
                || (run.glyphs.is_empty() != (run.generated_chars == 0))
            {
                consistency_failure(format_args!("run {id:?} has inconsistent generation"));
            }
            if run
                .glyphs
                .windows(2)
                .any(|pair| pair[0].char_offset >= pair[1].char_offset)
                || run
                    .glyphs
                    .last()
                    .is_some_and(|glyph| glyph.char_offset() >= run.generated_chars)
            {
                consistency_failure(format_args!("run {id:?} has unordered glyphs"));
            }
            if position.chars + run.char_length <= self.generated_prefix && !run.complete {
                consistency_failure(format_args!("run {id:?} inside the prefix is incomplete"));
            }
            position = position + run.extent();
            prev = Some(id);
            next = run.links[0].next;
        }
        if position != self.total() {
            consistency_failure(format_args!(
                "runs cover {position:?} but the head spans {:?}",
                self.total()
            ));
        }
        for level in 0..SKIP_LIST_DEPTH {
            let mut node = HEAD;
            loop {
                let link = self.node(node).links[level];
                let start = starts[node.index()]
                    .unwrap_or_else(|| consistency_failure(format_args!("{node:?} unreachable")));
                let end = match link.next {
                    Some(next) => starts[next.index()].unwrap_or_else(|| {
                        consistency_failure(format_args!("{next:?} unreachable on level 0"))
                    }),
                    None => position,
                };
                if start + link.span != end {
                    consistency_failure(format_args!(
                        "level {level} link of {node:?} spans {:?}, expected {:?}",
                        link.span,
                        end - start
                    ));
                }
                match link.next {
                    Some(next) => node = next,
                    None => break,
                }
            }
        }
    }

    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    fn total(&self) -> Span {
        self.node(HEAD).links[SKIP_LIST_DEPTH - 1].span
    }

    pub(crate) fn node(&self, id: RunId) -> &Run {
        match self.nodes.get(id.index()) {
            Some(Some(run)) => run,
            _ => consistency_failure(format_args!("dangling link to {id:?}")),
        }
    }

    fn node_mut(&mut self, id: RunId) -> &mut Run {
        match self.nodes.get_mut(id.index()) {
            Some(Some(run)) => run,
            _ => consistency_failure(format_args!("dangling link to {id:?}")),
        }
    }

    /// The run after `id` on level `0`.
    pub(crate) fn next_run(&self, id: RunId) -> Option<RunId> {
        self.node(id).links[0].next
    }

    /// The run before `id` on level `0`.
    pub(crate) fn prev_run(&self, id: RunId) -> Option<RunId> {
        self.node(id).prev
    }

    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < SKIP_LIST_DEPTH - 2 && self.rng.gen_ratio(1, SKIP_LIST_LEVEL_PROBABILITY) {
            level += 1;
        }
        level
    }

    fn descend(&self, key: Key, inclusive: bool) -> Path {
        let mut path = Path {
            nodes: [HEAD; SKIP_LIST_DEPTH],
            starts: [Span::ZERO; SKIP_LIST_DEPTH],
        };
        let mut node = HEAD;
        let mut position = Span::ZERO;
        for level in (0..=self.level).rev() {
            loop {
                let link = self.node(node).links[level];
                match link.next {
                    Some(next) if key.follows(position + link.span, inclusive) => {
                        position = position + link.span;
                        node = next;
                    }
                    _ => break,
                }
            }
            path.nodes[level] = node;
            path.starts[level] = position;
        }
        path
    }

    /// The run containing character `index` and its start.
    ///
    /// A character on a run boundary belongs to the run starting there.
    pub(crate) fn locate_char(&self, index: usize) -> (RunId, Span) {
        let path = self.descend(Key::Char(index), true);
        let (id, start) = (path.nodes[0], path.starts[0]);
        if id == HEAD || index >= start.chars + self.node(id).char_length {
            consistency_failure(format_args!(
                "no run bounds character {index} of {}",
                self.len()
            ));
        }
        (id, start)
    }

    /// The run containing materialized glyph `index` and its start.
    pub(crate) fn locate_glyph(&self, index: usize) -> (RunId, Span) {
        let path = self.descend(Key::Glyph(index), true);
        let (id, start) = (path.nodes[0], path.starts[0]);
        if id == HEAD || index >= start.glyphs + self.node(id).glyph_length() {
            consistency_failure(format_args!(
                "no run bounds glyph {index} of {}",
                self.glyph_count()
            ));
        }
        (id, start)
    }

    /// The number of glyphs for the characters before [`Self::generated_prefix`].
    pub(crate) fn prefix_glyphs(&self) -> usize {
        if self.generated_prefix >= self.len() {
            return self.glyph_count();
        }
        let (id, start) = self.locate_char(self.generated_prefix);
        start.glyphs + self.node(id).glyph_length()
    }

    /// The materialized glyph at `index`, if it lies within the generated prefix.
    pub(crate) fn glyph(&self, index: usize) -> Option<Glyph> {
        if index >= self.prefix_glyphs() {
            return None;
        }
        let (id, start) = self.locate_glyph(index);
        Some(self.node(id).glyph(start.chars, index - start.glyphs))
    }

    /// The index of the glyph owning a generated character.
    pub(crate) fn glyph_index_for_char(&self, index: usize) -> usize {
        let (id, start) = self.locate_char(index);
        start.glyphs + self.node(id).glyph_index_for_offset(index - start.chars)
    }

    /// Mutates the flags of a materialized glyph.
    pub(crate) fn update_glyph_flags(&mut self, index: usize, f: impl FnOnce(&mut GlyphFlags)) {
        let (id, start) = self.locate_glyph(index);
        f(&mut self.node_mut(id).glyphs[index - start.glyphs].flags);
    }

    fn apply_extent_change(&mut self, path: &Path, before: Span, after: Span) {
        for level in 0..SKIP_LIST_DEPTH {
            let link = &mut self.node_mut(path.nodes[level]).links[level];
            link.span = link.span + after - before;
        }
        self.stamp += 1;
    }

    /// Mutates the run starting at character `start`, keeping link spans in sync with
    /// its extent. The run must keep at least one character.
    pub(crate) fn update_run<R>(&mut self, start: usize, f: impl FnOnce(&mut Run) -> R) -> R {
        let path = self.descend(Key::Char(start), true);
        let id = path.nodes[0];
        if id == HEAD || path.starts[0].chars != start {
            consistency_failure(format_args!("no run starts at character {start}"));
        }
        let before = self.node(id).extent();
        let result = f(self.node_mut(id));
        let after = self.node(id).extent();
        self.apply_extent_change(&path, before, after);
        result
    }

    /// Links `run` in at character `at`, which must be a run boundary or the end.
    pub(crate) fn insert_run(&mut self, at: usize, mut run: Run) -> RunId {
        let path = self.descend(Key::Char(at), false);
        let prev = path.nodes[0];
        let start = path.starts[0] + self.node(prev).extent();
        if start.chars != at {
            consistency_failure(format_args!("character {at} is not a run boundary"));
        }
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.nodes.push(None);
                let index = u32::try_from(self.nodes.len() - 1).unwrap_or_else(|_| {
                    consistency_failure(format_args!("run arena exceeds u32 indices"))
                });
                RunId(index)
            }
        };
        let level = run.level();
        let extent = run.extent();
        for i in 0..SKIP_LIST_DEPTH {
            let node = path.nodes[i];
            if i <= level {
                let link = self.node(node).links[i];
                let covered_end = path.starts[i] + link.span;
                run.links[i] = Link {
                    next: link.next,
                    span: covered_end - start + extent,
                };
                self.node_mut(node).links[i] = Link {
                    next: Some(id),
                    span: start - path.starts[i],
                };
            } else {
                let link = &mut self.node_mut(node).links[i];
                link.span = link.span + extent;
            }
        }
        run.prev = (prev != HEAD).then_some(prev);
        if let Some(next) = run.links[0].next {
            self.node_mut(next).prev = Some(id);
        }
        self.nodes[id.index()] = Some(run);
        self.level = self.level.max(level);
        self.stamp += 1;
        id
    }

    /// Unlinks and returns the run starting at character `start`.
    pub(crate) fn remove_run(&mut self, start: usize) -> Run {
        let path = self.descend(Key::Char(start), false);
        let prev = path.nodes[0];
        let id = match self.node(prev).links[0].next {
            Some(id) if (path.starts[0] + self.node(prev).extent()).chars == start => id,
            _ => consistency_failure(format_args!("no run starts at character {start}")),
        };
        let run = self.nodes[id.index()]
            .take()
            .unwrap_or_else(|| consistency_failure(format_args!("{id:?} already removed")));
        let extent = run.extent();
        for i in 0..SKIP_LIST_DEPTH {
            let link = &mut self.node_mut(path.nodes[i]).links[i];
            if i <= run.level() {
                if link.next != Some(id) {
                    consistency_failure(format_args!("level {i} does not link to {id:?}"));
                }
                link.next = run.links[i].next;
                link.span = link.span + run.links[i].span - extent;
            } else {
                link.span = link.span - extent;
            }
        }
        if let Some(next) = run.links[0].next {
            self.node_mut(next).prev = run.prev;
        }
        self.free.push(id);
        while self.level > 0 && self.node(HEAD).links[self.level].next.is_none() {
            self.level -= 1;
        }
        self.stamp += 1;
        run
    }

    /// Splits the run starting at `start` at character offset `offset` and returns the
    /// new tail run.
    pub(crate) fn split_run(&mut self, start: usize, offset: usize) -> RunId {
        let level = self.random_level();
        let tail = self.update_run(start, |run| run.split_off(offset, level));
        self.stats.splits += 1;
        log::debug!("split run at character {}", start + offset);
        self.insert_run(start + offset, tail)
    }

    /// Folds the run after the one starting at `start` into it.
    pub(crate) fn merge_with_next(&mut self, start: usize) {
        let (id, _) = self.locate_char(start);
        let next_start = start + self.node(id).char_length;
        let next = self.remove_run(next_start);
        self.update_run(start, |run| run.absorb(next));
        self.stats.merges += 1;
        log::debug!("merged run at character {next_start} into its predecessor");
    }

    /// Splits the run starting at `start` until no piece exceeds the maximum length.
    pub(crate) fn enforce_max_length(&mut self, mut start: usize) {
        loop {
            let (id, _) = self.locate_char(start);
            if self.node(id).char_length <= self.max_run_length {
                return;
            }
            self.split_run(start, self.max_run_length);
            start += self.max_run_length;
        }
    }

    /// Adds ungenerated runs for `len` characters at run boundary `at`.
    fn insert_pending(&mut self, mut at: usize, mut len: usize) {
        while len > 0 {
            let chunk = len.min(self.max_run_length);
            let level = self.random_level();
            self.insert_run(at, Run::new(level, chunk));
            at += chunk;
            len -= chunk;
        }
    }

    /// Updates the runs after `removed` characters at `start` were replaced by
    /// `inserted` characters.
    ///
    /// Only runs overlapping the edit, and the run ending right before it, lose glyphs.
    pub(crate) fn apply_edit(&mut self, start: usize, removed: usize, inserted: usize) {
        if start + removed > self.len() {
            consistency_failure(format_args!(
                "edit {start}..{} exceeds {} characters",
                start + removed,
                self.len()
            ));
        }
        if removed != inserted {
            let mut remaining = removed;
            while remaining > 0 {
                let (id, run_start) = self.locate_char(start);
                let local = start - run_start.chars;
                let run_length = self.node(id).char_length;
                let take = remaining.min(run_length - local);
                if take == run_length {
                    self.remove_run(run_start.chars);
                } else {
                    self.update_run(run_start.chars, |run| {
                        run.truncate_generated(local);
                        run.char_length -= take;
                        run.update_complete();
                    });
                }
                remaining -= take;
            }
            if inserted > 0 {
                if self.is_empty() {
                    self.insert_pending(0, inserted);
                } else {
                    let (_, run_start) = self.locate_char(start.saturating_sub(1));
                    let local = start - run_start.chars;
                    self.update_run(run_start.chars, |run| {
                        run.truncate_generated(local);
                        run.char_length += inserted;
                        run.update_complete();
                    });
                    self.enforce_max_length(run_start.chars);
                }
            }
        }
        self.invalidate_range(start, inserted);
    }

    /// Drops the glyphs of every run overlapping `start..start + len`, and of the
    /// cluster before `start`.
    pub(crate) fn invalidate_range(&mut self, start: usize, len: usize) {
        let total = self.len();
        let first = start.saturating_sub(1);
        let end = (start + len).max(start + 1).min(total);
        let mut position = first;
        while position < end {
            let (id, run_start) = self.locate_char(position);
            let run_length = self.node(id).char_length;
            let local = start.saturating_sub(run_start.chars);
            self.update_run(run_start.chars, |run| run.truncate_generated(local));
            position = run_start.chars + run_length;
        }
        // Removed runs can leave a continued run behind a run with other attributes.
        // A run after an unresolved one is refreshed once generation resolves it.
        if position < total {
            let (id, _) = self.locate_char(position);
            let run = self.node(id);
            let stale = run.continued
                && self
                    .prev_run(id)
                    .and_then(|prev| self.node(prev).attributes)
                    .is_some_and(|prev| Some(prev) != run.attributes);
            if stale {
                self.update_run(position, |run| run.continued = false);
            }
        }
        self.generated_prefix = self.generated_prefix.min(first);
        self.normalize_prefix();
    }

    /// Drops every glyph and resolved attribute.
    pub(crate) fn invalidate_all(&mut self) {
        let total = self.len();
        let mut position = 0;
        while position < total {
            let (id, _) = self.locate_char(position);
            let run_length = self.node(id).char_length;
            self.update_run(position, |run| run.truncate_generated(0));
            position += run_length;
        }
        self.generated_prefix = 0;
        self.normalize_prefix();
    }

    /// Moves the generated prefix past complete runs.
    pub(crate) fn normalize_prefix(&mut self) {
        let total = self.len();
        while self.generated_prefix < total {
            let (id, start) = self.locate_char(self.generated_prefix);
            let run = self.node(id);
            if run.complete {
                self.generated_prefix = start.chars + run.char_length;
            } else {
                self.generated_prefix = start.chars + run.generated_chars;
                return;
            }
        }
        self.generated_prefix = total;
    }
}

#[cfg(test)]
mod tests {
    use super::RunStore;
    use crate::run::Run;

    fn store_with_runs(lengths: &[usize]) -> RunStore {
        let mut store = RunStore::new(64, 7);
        let mut at = 0;
        for &len in lengths {
            let level = store.random_level();
            store.insert_run(at, Run::new(level, len));
            at += len;
        }
        store
    }

    #[test]
    fn lookups_match_linear_scan() {
        let lengths: Vec<usize> = (0..200).map(|i| 1 + (i * 7) % 13).collect();
        let store = store_with_runs(&lengths);
        store.check_consistency();
        let runs: Vec<_> = store.runs().collect();
        for c in 0..store.len() {
            let (id, start) = store.locate_char(c);
            let expected = runs
                .iter()
                .find(|run| run.char_range.contains(&c))
                .expect("linear scan finds a run");
            assert_eq!(id, expected.id, "run for character {c}");
            assert_eq!(start.chars, expected.char_range.start, "start of run for {c}");
        }
    }

    #[test]
    fn boundary_characters_resolve_to_following_run() {
        let store = store_with_runs(&[3, 4]);
        let runs: Vec<_> = store.runs().collect();
        assert_eq!(store.locate_char(3).0, runs[1].id, "boundary belongs to second run");
        assert_eq!(store.locate_char(2).0, runs[0].id, "last character of first run");
    }

    #[test]
    fn removal_and_insertion_keep_spans() {
        let mut store = store_with_runs(&[5, 6, 7, 8, 9]);
        store.remove_run(11);
        store.check_consistency();
        assert_eq!(store.len(), 28, "seven characters removed");
        let level = store.random_level();
        store.insert_run(0, Run::new(level, 2));
        store.check_consistency();
        assert_eq!(store.run_count(), 5, "one out, one in");
        assert_eq!(store.runs().next().unwrap().char_range, 0..2, "new first run");
    }

    #[test]
    fn edits_grow_split_and_shrink_runs() {
        let mut store = RunStore::new(10, 3);
        store.apply_edit(0, 0, 25);
        store.check_consistency();
        assert_eq!(store.run_count(), 3, "25 characters in runs of at most 10");

        store.apply_edit(25, 0, 1);
        store.check_consistency();
        assert_eq!(store.len(), 26, "appended one character");
        assert_eq!(store.run_count(), 3, "last run absorbed the character");

        store.apply_edit(5, 15, 0);
        store.check_consistency();
        assert_eq!(store.len(), 11, "deleted across runs");

        store.apply_edit(0, 11, 0);
        store.check_consistency();
        assert!(store.is_empty(), "everything deleted");
    }

    #[test]
    fn split_keeps_clean_glyph_prefix() {
        let mut run = Run::new(0, 10);
        run.generated_chars = 6;
        for offset in 0..6 {
            run.glyphs.push(crate::glyph::GlyphRecord {
                id: crate::glyph::GlyphId(1),
                char_offset: offset,
                flags: crate::glyph::GlyphFlags::default(),
                bidi_level: 0,
                advancement: peniko::kurbo::Size::ZERO,
            });
        }
        let tail = run.split_off(4, 0);
        assert_eq!(run.glyph_length(), 4, "head keeps glyphs before the split");
        assert!(run.complete, "head is fully generated");
        assert_eq!(tail.glyph_length(), 2, "tail keeps glyphs after the split");
        assert_eq!(tail.generated_chars, 2, "tail generation continues");
        assert_eq!(tail.glyphs[0].char_offset, 0, "tail offsets are rebased");
    }
}
