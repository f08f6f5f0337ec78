// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec::Vec;

use peniko::kurbo::Size;

use crate::{
    AttributedString, FontCollection, FontFace, FontId, Glyph, LayoutManager, LayoutOptions,
    RectContainer, TextAttributes, TextStore,
};

pub(crate) type Manager = LayoutManager<AttributedString, FontCollection>;

/// Fonts shared by the layout manager tests.
///
/// Every face advances by a whole number of units per character and sets lines
/// 10 units tall with the baseline 8 units down, so expected geometry can be worked
/// out by hand.
pub(crate) struct TestEnv {
    pub(crate) fonts: FontCollection,
    /// Advance 10.
    pub(crate) regular: FontId,
    /// Advance 12.
    pub(crate) bold: FontId,
    /// Advance 10, with an `fi` ligature of advance 15.
    pub(crate) ligatures: FontId,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        let mut fonts = FontCollection::new();
        let regular = fonts.add(face(10.0));
        let bold = fonts.add(face(12.0));
        let ligatures = fonts.add(face(10.0).with_ligature('f', 'i', 15.0));
        Self {
            fonts,
            regular,
            bold,
            ligatures,
        }
    }

    pub(crate) fn regular(&self) -> TextAttributes {
        TextAttributes::new(self.regular)
    }

    pub(crate) fn bold(&self) -> TextAttributes {
        TextAttributes::new(self.bold)
    }

    pub(crate) fn text(&self, text: &str) -> AttributedString {
        AttributedString::new(text, self.regular())
    }

    pub(crate) fn manager(self, text: AttributedString) -> Manager {
        self.manager_with_options(text, LayoutOptions::default())
    }

    pub(crate) fn manager_with_options(
        self,
        text: AttributedString,
        options: LayoutOptions,
    ) -> Manager {
        LayoutManager::with_options(text, self.fonts, options)
    }
}

fn face(advance: f64) -> FontFace {
    FontFace::new(10.0)
        .with_advance(advance)
        .with_metrics(8.0, -2.0)
}

pub(crate) fn container(width: f64, height: f64) -> Rc<RectContainer> {
    Rc::new(RectContainer::new(Size::new(width, height)))
}

pub(crate) fn all_glyphs(manager: &mut Manager) -> Vec<Glyph> {
    manager.glyph_cursor(0).collect()
}

/// Checks that the runs partition the text and the generated glyphs, on top of the
/// manager's own consistency check.
pub(crate) fn assert_runs_partition(manager: &Manager) {
    manager.check_consistency();
    let store = manager.run_store();
    let mut chars = 0;
    let mut glyphs = 0;
    for run in store.runs() {
        assert_eq!(run.char_range.start, chars, "runs are contiguous in characters");
        assert_eq!(run.glyph_range.start, glyphs, "runs are contiguous in glyphs");
        assert!(
            run.char_range.len() <= store.max_run_length(),
            "run {:?} within the length bound",
            run.char_range
        );
        chars = run.char_range.end;
        glyphs = run.glyph_range.end;
    }
    assert_eq!(chars, manager.text().len(), "runs cover the text");
    assert_eq!(glyphs, store.glyph_count(), "runs hold every glyph");
}
