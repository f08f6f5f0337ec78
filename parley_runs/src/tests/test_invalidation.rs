// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec::Vec;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::utils::{all_glyphs, assert_runs_partition, container, Manager, TestEnv};
use crate::{
    ErrorKind, Glyph, LayoutOptions, LayoutState, LineFragment, TextEdit, TextStore, MAX_RUN_LENGTH,
};

const FOUR_LINES: &str = "aaaa bbbb cccc dddd eeee ffff gggg hhhh";

fn char_ranges(fragments: &[LineFragment]) -> Vec<core::ops::Range<usize>> {
    fragments
        .iter()
        .map(|fragment| fragment.char_range.clone())
        .collect()
}

/// The parts of a glyph that layout never rewrites.
fn shape(glyph: &Glyph) -> (crate::GlyphId, usize, f64, crate::FontId, crate::Inscription) {
    (
        glyph.id,
        glyph.char_index,
        glyph.advancement.width,
        glyph.font,
        glyph.flags.inscription,
    )
}

#[test]
fn only_runs_overlapping_an_edit_lose_glyphs() {
    let env = TestEnv::new();
    let bold = env.bold();
    let mut text = env.text("AAAA");
    text.push("BBBB", bold);
    let mut manager = env.manager(text);
    manager.number_of_glyphs();

    manager
        .edit_text(|text| text.replace_range(6..7, "C"))
        .unwrap();
    let runs: Vec<_> = manager.run_store().runs().collect();
    assert_eq!(runs.len(), 2, "runs survive the edit");
    assert!(runs[0].complete, "run before the edit keeps its glyphs");
    assert!(!runs[1].complete, "edited run is regenerated");
    assert_eq!(
        manager.run_store().generated_prefix(),
        5,
        "generation resumes at the cluster before the edit"
    );
    assert_runs_partition(&manager);

    let glyphs = all_glyphs(&mut manager);
    assert_eq!(glyphs.len(), 8, "regenerated");
    assert_eq!(glyphs[6].id, crate::GlyphId('C' as u32 + 1), "new character");
    assert_eq!(glyphs[6].advancement.width, 12.0, "typed in the bold font");
}

#[test]
fn edits_inside_long_runs_leave_later_runs_alone() {
    let env = TestEnv::new();
    let bold = env.bold();
    let long: String = core::iter::repeat_n('A', 20_000).collect();
    let mut text = env.text(&long);
    text.push(&"B".repeat(100), bold);
    let mut manager = env.manager(text);
    assert_eq!(manager.number_of_glyphs(), 20_100, "everything generated");

    let before: Vec<_> = manager.run_store().runs().collect();
    let ranges: Vec<_> = before.iter().map(|run| run.char_range.clone()).collect();
    assert_eq!(
        ranges,
        [0..MAX_RUN_LENGTH, MAX_RUN_LENGTH..20_000, 20_000..20_100],
        "the A run splits at the length cap and B follows"
    );
    assert!(before[1].continued, "second A run continues the first");
    assert!(!before[2].continued, "B run has other attributes");

    manager
        .edit_text(|text| text.replace_range(10_000..10_001, "A"))
        .unwrap();
    let after: Vec<_> = manager.run_store().runs().collect();
    assert_eq!(after.len(), 3, "no runs added or removed");
    assert!(!after[0].complete, "run holding the edit loses glyphs");
    assert_eq!(
        manager.run_store().generated_prefix(),
        9_999,
        "generation resumes at the cluster before the edit"
    );
    for (old, new) in before.iter().zip(&after).skip(1) {
        assert_eq!(new.id, old.id, "run {:?} kept", old.char_range);
        assert_eq!(
            new.char_range,
            old.char_range,
            "run {:?} not moved",
            old.char_range
        );
        assert!(new.complete, "run {:?} keeps its glyphs", old.char_range);
        assert_eq!(
            new.glyph_range.len(),
            old.glyph_range.len(),
            "run {:?} keeps its glyph count",
            old.char_range
        );
        assert_eq!(
            new.continued,
            old.continued,
            "run {:?} keeps its continuation",
            old.char_range
        );
        assert_eq!(
            new.attributes,
            old.attributes,
            "run {:?} keeps its attributes",
            old.char_range
        );
    }
    assert_runs_partition(&manager);

    assert_eq!(manager.number_of_glyphs(), 20_100, "regenerated");
    assert_runs_partition(&manager);
}

#[test]
fn reused_lines_keep_their_glyph_flags() {
    const TEXT: &str = "aaaa bbbbb cccc dd\u{AD}eeee";
    let env = TestEnv::new();
    let text = env.text(TEXT);
    let mut manager = env.manager(text);
    let shared = container(50.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();

    let layout = manager.container_layout(index).unwrap();
    assert_eq!(
        char_ranges(layout.fragments()),
        [0..5, 5..11, 11..16, 16..19, 19..23],
        "breaks at spaces and the soft hyphen"
    );
    let space = manager.glyph_at_index(10).unwrap();
    assert!(
        space.flags.draws_outside_line_fragment,
        "trailing space hangs past the line"
    );
    let hyphen = manager.glyph_at_index(18).unwrap();
    assert!(!hyphen.flags.is_not_shown, "hyphen at the break is shown");

    manager
        .edit_text(|text| text.replace_range(1..2, "x"))
        .unwrap();
    manager.ensure_layout_for_text_container(index).unwrap();

    let layout = manager.container_layout(index).unwrap();
    assert_eq!(
        char_ranges(layout.fragments()),
        [0..5, 5..11, 11..16, 16..19, 19..23],
        "same breaks after the edit"
    );
    assert_eq!(
        layout.stats().reused_fragments,
        4,
        "lines after the edit reused"
    );
    let space = manager.glyph_at_index(10).unwrap();
    assert!(
        space.flags.draws_outside_line_fragment,
        "reused line keeps its overflow"
    );
    let hyphen = manager.glyph_at_index(18).unwrap();
    assert!(!hyphen.flags.is_not_shown, "reused line keeps its hyphen");
    manager.check_consistency();

    let edited = all_glyphs(&mut manager);
    let fresh_env = TestEnv::new();
    let mut fresh = fresh_env.manager(manager.text().clone());
    let fresh_shared = container(50.0, 100.0);
    let fresh_index = fresh.add_text_container(fresh_shared.clone());
    fresh.ensure_layout_for_text_container(fresh_index).unwrap();
    assert_eq!(
        edited,
        all_glyphs(&mut fresh),
        "glyphs match a fresh layout"
    );
}

#[test]
fn invalidated_glyphs_regenerate_identically() {
    let env = TestEnv::new();
    let bold = env.bold();
    let mut text = env.text("plain \u{AD}text\t");
    text.push("bold e\u{301}\n", bold);
    let mut manager = env.manager(text);
    let before = all_glyphs(&mut manager);

    manager.invalidate_everything();
    assert_eq!(manager.run_store().generated_prefix(), 0, "nothing generated");
    assert_eq!(all_glyphs(&mut manager), before, "same glyphs again");

    manager
        .edit_text(|text| text.replace_range(3..8, "xyz"))
        .unwrap();
    manager
        .edit_text(|text| text.replace_range(3..6, "in \u{AD}t"))
        .unwrap();
    assert_eq!(all_glyphs(&mut manager), before, "edit and undo");
    assert_runs_partition(&manager);
}

#[test]
fn edits_keep_earlier_lines_and_reuse_later_ones() {
    let env = TestEnv::new();
    let text = env.text(FOUR_LINES);
    let mut manager = env.manager(text);
    let shared = container(100.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();
    let before = manager.container_layout(index).unwrap().fragments().to_vec();
    assert_eq!(
        char_ranges(&before),
        [0..10, 10..20, 20..30, 30..39],
        "four lines"
    );

    manager
        .edit_text(|text| text.replace_range(25..26, "x"))
        .unwrap();
    let layout = manager.container_layout(index).unwrap();
    assert_eq!(layout.state(), LayoutState::PartiallyInvalidated, "soft tail");
    assert_eq!(char_ranges(layout.fragments()), [0..10], "first line stays valid");
    assert_eq!(
        layout
            .soft_fragments()
            .map(|fragment| fragment.char_range.clone())
            .collect::<Vec<_>>(),
        [10..20, 30..39],
        "lines clear of the edit are kept for reuse"
    );
    assert_eq!(manager.first_unlaid_character_index(), 10, "laid out prefix");

    manager.ensure_layout_for_text_container(index).unwrap();
    let layout = manager.container_layout(index).unwrap();
    assert_eq!(layout.fragments(), &before[..], "same geometry after the edit");
    assert_eq!(layout.stats().reused_fragments, 2, "two lines reused");
    assert_eq!(layout.state(), LayoutState::Valid, "complete again");
    assert_eq!(layout.soft_fragments().count(), 0, "soft queue drained");
    manager.check_consistency();
}

#[test]
fn reused_lines_move_with_inserted_text() {
    let env = TestEnv::new();
    let text = env.text(FOUR_LINES);
    let mut manager = env.manager(text);
    let shared = container(100.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();

    let edit = manager.edit_text(|text| text.insert(25, "f")).unwrap();
    assert_eq!(edit, TextEdit { range: 25..26, delta: 1 }, "one character in");
    manager.ensure_layout_for_text_container(index).unwrap();

    let layout = manager.container_layout(index).unwrap();
    assert_eq!(
        char_ranges(layout.fragments()),
        [0..10, 10..20, 20..31, 31..40],
        "the longer line absorbs the character"
    );
    assert_eq!(layout.fragments()[3].glyph_range, 31..40, "glyphs rebased");
    assert_eq!(layout.stats().reused_fragments, 2, "lines around the edit reused");
    manager.check_consistency();
}

#[test]
fn moved_lines_are_not_reused() {
    let env = TestEnv::new();
    let text = env.text(FOUR_LINES);
    let mut manager = env.manager(text);
    let shared = container(100.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();

    // Pushes the third line's last word onto a line of its own.
    manager
        .edit_text(|text| text.insert(25, "ff"))
        .unwrap();
    manager.ensure_layout_for_text_container(index).unwrap();

    let layout = manager.container_layout(index).unwrap();
    assert_eq!(
        char_ranges(layout.fragments()),
        [0..10, 10..20, 20..25, 25..32, 32..41],
        "an extra line"
    );
    assert_eq!(layout.stats().reused_fragments, 1, "only the line before the edit");
    manager.check_consistency();
}

#[test]
fn appended_text_flows_into_the_last_line() {
    let env = TestEnv::new();
    let text = env.text("aaaa bbbb");
    let mut manager = env.manager(text);
    let shared = container(100.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();
    assert!(!manager.acknowledge_invalidation(index).unwrap(), "fresh layout");

    manager
        .edit_text(|text| text.insert(9, " cccc"))
        .unwrap();
    assert!(manager.acknowledge_invalidation(index).unwrap(), "raised once");
    assert!(!manager.acknowledge_invalidation(index).unwrap(), "then cleared");
    manager.ensure_layout_for_text_container(index).unwrap();
    assert_eq!(
        char_ranges(manager.container_layout(index).unwrap().fragments()),
        [0..10, 10..14],
        "appended word wraps"
    );
}

#[test]
fn emptied_text_lays_out_nothing() {
    let env = TestEnv::new();
    let text = env.text("aaaa bbbb cccc");
    let mut manager = env.manager(text);
    let shared = container(100.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();

    manager.edit_text(|text| text.delete(0..14)).unwrap();
    manager.ensure_layout_for_text_container(index).unwrap();
    assert!(
        manager.container_layout(index).unwrap().fragments().is_empty(),
        "no lines"
    );
    assert_eq!(
        manager.used_rect_for_text_container(index).unwrap(),
        peniko::kurbo::Rect::ZERO,
        "nothing used"
    );
    assert_eq!(manager.number_of_glyphs(), 0, "no glyphs");

    manager.edit_text(|text| text.insert(0, "hello")).unwrap();
    manager.ensure_layout_for_text_container(index).unwrap();
    assert_eq!(
        char_ranges(manager.container_layout(index).unwrap().fragments()),
        [0..5],
        "new text laid out"
    );
    manager.check_consistency();
}

#[test]
fn hiding_a_glyph_relays_its_line() {
    let env = TestEnv::new();
    let text = env.text("aaaa bbbb cccc");
    let mut manager = env.manager(text);
    let shared = container(100.0, 100.0);
    let index = manager.add_text_container(shared.clone());
    manager.ensure_layout_for_text_container(index).unwrap();

    manager.set_not_shown(1, true).unwrap();
    assert!(manager.acknowledge_invalidation(index).unwrap(), "layout invalidated");
    manager.ensure_layout_for_text_container(index).unwrap();
    assert_eq!(
        manager.location_for_glyph_at_index(2),
        Some(peniko::kurbo::Point::new(10.0, 8.0)),
        "hidden glyph takes no space"
    );

    manager.set_draws_outside_line_fragment(0, true).unwrap();
    assert!(
        manager.glyph_at_index(0).unwrap().flags.draws_outside_line_fragment,
        "flag stored"
    );
    assert!(!manager.acknowledge_invalidation(index).unwrap(), "no relayout needed");
}

#[test]
fn mismatched_edits_rebuild_everything() {
    let env = TestEnv::new();
    let text = env.text("abcd");
    let mut manager = env.manager(text);
    manager.number_of_glyphs();

    let error = manager
        .edit_text(|text| {
            text.insert(0, "xy")?;
            Ok(TextEdit {
                range: 0..1,
                delta: 1,
            })
        })
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidRange, "reported edit is wrong");
    assert_eq!(manager.run_store().len(), 6, "runs rebuilt for the new text");
    assert_eq!(manager.number_of_glyphs(), 6, "glyphs regenerated");
    assert_runs_partition(&manager);
}

#[test]
fn random_edits_keep_runs_and_lines_consistent() {
    const ALPHABET: [char; 7] = ['a', 'b', ' ', 'c', '\n', 'd', '\u{AD}'];

    let env = TestEnv::new();
    let (regular, bold) = (env.regular(), env.bold());
    let text = env.text("the quick brown fox jumps over the lazy dog\n");
    let options = LayoutOptions::default().with_max_run_length(16);
    let mut manager: Manager = env.manager_with_options(text, options);
    let first = container(120.0, 80.0);
    let second = container(120.0, 10_000.0);
    manager.add_text_container(first.clone());
    manager.add_text_container(second.clone());
    let mut rng = SmallRng::seed_from_u64(7);

    for step in 0..300 {
        let len = manager.text().len();
        let start = rng.gen_range(0..=len);
        let end = rng.gen_range(start..=len.min(start + 8));
        let count = rng.gen_range(0..6);
        let insert: String = (0..count)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
            .collect();
        let attributes = if rng.gen_bool(0.3) {
            bold.clone()
        } else {
            regular.clone()
        };
        manager
            .edit_text(|text| text.replace_with_attributes(start..end, &insert, attributes))
            .unwrap();
        match step % 3 {
            0 => {
                let target = rng.gen_range(0..=manager.text().len());
                manager.generate_up_to_character(target).unwrap();
            }
            1 => manager.ensure_layout_for_text_container(1).unwrap(),
            _ => {}
        }
        assert_runs_partition(&manager);
    }

    manager.ensure_layout_for_text_container(1).unwrap();
    manager.check_consistency();
    assert_eq!(
        manager.first_unlaid_character_index(),
        manager.text().len(),
        "everything fits into the second container"
    );

    let edited: Vec<_> = all_glyphs(&mut manager).iter().map(shape).collect();
    let fresh_text = manager.text().clone();
    let mut fresh = TestEnv::new().manager_with_options(fresh_text, options);
    let expected: Vec<_> = all_glyphs(&mut fresh).iter().map(shape).collect();
    assert_eq!(edited, expected, "incremental glyphs match a fresh generation");
}
