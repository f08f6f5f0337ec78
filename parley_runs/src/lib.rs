// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parley Runs is the glyph storage and incremental layout engine that sits beneath a
//! multi-container rich text view.
//!
//! Given an attributed character stream, a [`LayoutManager`] lazily produces and caches:
//!
//! - A partition of the text into *runs* of glyphs that share rendering attributes.
//!   Runs live in a [`RunStore`], an index-linked skip list which translates between
//!   character and glyph indices in expected logarithmic time.
//! - Per-[`TextContainer`] line fragment geometry, kept in a [`ContainerLayout`] that
//!   survives incremental edits by demoting stale fragments to a reusable *soft* tail
//!   instead of discarding them.
//!
//! Nothing is generated until it is asked for. A query for glyph `n` generates glyphs for
//! exactly the prefix of the text needed to answer it, and an edit invalidates only the
//! runs and line fragments that overlap it.
//!
//! The character store, the font metrics provider and the container geometry are
//! collaborators supplied by the caller through the [`TextStore`], [`FontMetrics`] and
//! [`TextContainer`] traits. Simple implementations of each ([`AttributedString`],
//! [`FontCollection`], [`RectContainer`]) are provided.
//!
//! ```
//! use std::rc::Rc;
//! use parley_runs::{
//!     AttributedString, FontCollection, FontFace, LayoutManager, RectContainer, TextAttributes,
//! };
//! use peniko::kurbo::Size;
//!
//! let mut fonts = FontCollection::new();
//! let font = fonts.add(FontFace::new(10.0));
//! let text = AttributedString::new("Hello world", TextAttributes::new(font));
//!
//! let mut manager = LayoutManager::new(text, fonts);
//! let container = Rc::new(RectContainer::new(Size::new(200.0, 100.0)));
//! let index = manager.add_text_container(container.clone());
//!
//! assert_eq!(manager.number_of_glyphs(), 11);
//! manager.ensure_layout_for_text_container(index).unwrap();
//! let used = manager.used_rect_for_text_container(index).unwrap();
//! assert!(used.width() > 0.0);
//! ```
//!
//! ## Features
//!
//! - `std` (enabled by default): Use the standard library for floating point math.
//! - `libm`: Use `core_maths` for floating point math in `no_std` builds.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("parley_runs requires either the `std` or `libm` feature to be enabled");

extern crate alloc;

mod cache;
mod container;
mod cursor;
mod error;
mod font;
mod fragment;
mod generate;
mod glyph;
mod manager;
mod options;
mod run;
mod store;
mod text;
mod typeset;
mod util;

#[cfg(test)]
mod tests;

pub use crate::cache::{CacheStats, ContainerLayout, LayoutState};
pub use crate::container::{MovementDirection, RectContainer, SweepDirection, TextContainer};
pub use crate::cursor::GlyphCursor;
pub use crate::error::{Diagnostic, Error, ErrorKind};
pub use crate::font::{FontCollection, FontFace, FontId, FontMetrics};
pub use crate::fragment::{LineAttachment, LineFragment, LinePoint};
pub use crate::glyph::{Glyph, GlyphFlags, GlyphId, Inscription};
pub use crate::manager::LayoutManager;
pub use crate::options::LayoutOptions;
pub use crate::run::{RunAttributes, RunId, RunInfo, RunPosition};
pub use crate::store::{RunStore, StoreStats};
pub use crate::text::{AttributedString, TextAttributes, TextEdit, TextStore};

/// The number of levels in the run skip list.
///
/// Only the head sentinel holds the topmost level, so the list is balanced for up to
/// `2^SKIP_LIST_DEPTH` runs.
pub const SKIP_LIST_DEPTH: usize = 15;

/// The inverse of the probability that a run is promoted to the next skip list level.
pub const SKIP_LIST_LEVEL_PROBABILITY: u32 = 2;

/// The default cap on the number of characters in a single run.
pub const MAX_RUN_LENGTH: usize = 16384;

/// The highest bidi embedding level a glyph can carry.
pub const MAX_BIDI_LEVEL: u8 = 61;
