// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Greedy line breaking against a text container.

use alloc::vec;
use alloc::vec::Vec;

use peniko::kurbo::{Point, Rect};

use crate::container::{MovementDirection, SweepDirection, TextContainer};
use crate::font::FontMetrics;
use crate::fragment::{LineAttachment, LineFragment, LinePoint};
use crate::generate::Generator;
use crate::store::RunStore;
use crate::glyph::{Glyph, GlyphId};
use crate::text::TextStore;
use crate::util::{is_line_separator, next_tab_stop};

/// The result of laying out one line.
pub(crate) enum LineOutcome {
    /// A line was laid out. `remaining` is the part of the row still free.
    Line {
        fragment: LineFragment,
        remaining: Rect,
    },
    /// The container has no room for another line.
    ContainerFull,
}

#[derive(Clone, Default)]
struct LineState {
    /// Pen position relative to the start of the content area.
    x: f64,
    /// Pen position after the last glyph that is not whitespace.
    content_width: f64,
    ascent: f64,
    descent: f64,
    points: Vec<(usize, f64)>,
    attachments: Vec<(usize, f64)>,
}

/// A place the line can end, with the state of the line up to it.
#[derive(Clone)]
struct PrevBoundary {
    /// Glyphs before this index stay on the line.
    glyph_end: usize,
    width: f64,
    /// The soft hyphen the line ends with.
    hyphen: Option<usize>,
    state: LineState,
}

struct Breaker<'g, 'a, T: TextStore + ?Sized, F: FontMetrics + ?Sized> {
    generator: &'g mut Generator<'a, T, F>,
    available: f64,
    line: LineState,
    prev_boundary: Option<PrevBoundary>,
    /// Glyphs that extend past the available width.
    overflowing: Vec<usize>,
}

struct BrokenLine {
    glyph_end: usize,
    width: f64,
    hyphen: Option<usize>,
    state: LineState,
}

impl<'a, T: TextStore + ?Sized, F: FontMetrics + ?Sized> Breaker<'_, 'a, T, F> {
    fn grow(&mut self, glyph: &Glyph) {
        let fonts = self.generator.fonts();
        self.line.ascent = self.line.ascent.max(fonts.ascender(glyph.font));
        self.line.descent = self.line.descent.max(-fonts.descender(glyph.font));
    }

    fn boundary(&mut self, glyph_end: usize, width: f64, hyphen: Option<usize>) {
        self.prev_boundary = Some(PrevBoundary {
            glyph_end,
            width,
            hyphen,
            state: self.line.clone(),
        });
    }

    fn note(&mut self, index: usize, glyph: Glyph, end_x: f64) {
        if end_x > self.available && !glyph.flags.soft {
            self.overflowing.push(index);
        }
    }

    /// Breaks the line starting at glyph `start`.
    fn run(mut self, start: usize) -> (BrokenLine, Vec<usize>) {
        let text = self.generator.text();
        let interval = self.generator.options().tab_interval;
        let hyphenate = self.generator.options().hyphenate_at_soft_breaks;
        self.line.points.push((start, 0.0));
        let mut index = start;
        let broken = loop {
            let Some(glyph) = self.generator.glyph(index) else {
                break self.finish(index);
            };
            let ch = text.char_at(glyph.char_index).unwrap_or_default();
            self.grow(&glyph);

            if is_line_separator(ch) {
                self.note(index, glyph, self.line.x);
                let mut end = index + 1;
                if ch == '\r' {
                    if let Some(next) = self.generator.glyph(end) {
                        if text.char_at(next.char_index) == Some('\n') {
                            self.note(end, next, self.line.x);
                            end += 1;
                        }
                    }
                }
                break self.finish(end);
            }
            if ch == '\t' {
                let stop = next_tab_stop(self.line.x, interval);
                if stop > self.available && index > start {
                    break self.fall_back(index);
                }
                self.note(index, glyph, stop);
                self.line.points.push((index + 1, stop));
                self.line.x = stop;
                self.line.content_width = stop;
                self.boundary(index + 1, stop, None);
                index += 1;
                continue;
            }
            if glyph.flags.soft {
                let hyphen = if hyphenate { glyph.advancement.width } else { 0.0 };
                let shown = self.line.x + hyphen;
                self.note(index, glyph, self.line.x);
                if shown <= self.available {
                    self.boundary(index + 1, shown, Some(index));
                }
                index += 1;
                continue;
            }

            let advance = glyph.effective_advance();
            let next_x = self.line.x + advance;
            if glyph.flags.elastic {
                // Trailing whitespace hangs past the end of the line.
                self.note(index, glyph, next_x);
                self.line.x = next_x;
                let width = self.line.content_width;
                self.boundary(index + 1, width, None);
                index += 1;
                continue;
            }
            if next_x > self.available && index > start {
                break self.fall_back(index);
            }
            if glyph.id == GlyphId::CONTROL && !glyph.flags.is_not_shown {
                let height = glyph.advancement.height;
                self.line.ascent = self.line.ascent.max(height);
                self.line.attachments.push((index, self.line.x));
            }
            self.note(index, glyph, next_x);
            self.line.x = next_x;
            self.line.content_width = next_x;
            index += 1;
        };
        let glyph_end = broken.glyph_end;
        self.overflowing.retain(|index| *index < glyph_end);
        (broken, self.overflowing)
    }

    fn finish(&mut self, glyph_end: usize) -> BrokenLine {
        BrokenLine {
            glyph_end,
            width: self.line.content_width,
            hyphen: None,
            state: core::mem::take(&mut self.line),
        }
    }

    /// Ends the line at the last break opportunity, or before glyph `index` if the
    /// line has none.
    fn fall_back(&mut self, index: usize) -> BrokenLine {
        match self.prev_boundary.take() {
            Some(boundary) => BrokenLine {
                glyph_end: boundary.glyph_end,
                width: boundary.width,
                hyphen: boundary.hyphen,
                state: boundary.state,
            },
            None => self.finish(index),
        }
    }
}

/// Lays out the line starting at `char_start` / `glyph_start` in the row at `origin`
/// of the given width.
///
/// The row is as tall as the first glyph's font. If the line turns out taller, the
/// container is asked once more for a row of the full height.
pub(crate) fn typeset_line<T: TextStore + ?Sized, F: FontMetrics + ?Sized>(
    generator: &mut Generator<'_, T, F>,
    container: &dyn TextContainer,
    char_start: usize,
    glyph_start: usize,
    origin: Point,
    width: f64,
) -> LineOutcome {
    let Some(first) = generator.glyph(glyph_start) else {
        return LineOutcome::ContainerFull;
    };
    let padding = container.line_fragment_padding();
    let mut height = generator.fonts().line_height(first.font);
    let mut retried = false;
    loop {
        let proposed = Rect::new(origin.x, origin.y, origin.x + width, origin.y + height);
        let (rect, remaining) =
            container.line_fragment_rect(proposed, SweepDirection::Right, MovementDirection::Down);
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return LineOutcome::ContainerFull;
        }
        let breaker = Breaker {
            generator: &mut *generator,
            available: rect.width() - 2.0 * padding,
            line: LineState::default(),
            prev_boundary: None,
            overflowing: Vec::new(),
        };
        let (line, overflowing) = breaker.run(glyph_start);
        let line_height = line.state.ascent + line.state.descent;
        if line_height > rect.height() && !retried {
            retried = true;
            height = line_height;
            continue;
        }
        let mut fragment = build_fragment(generator, rect, padding, char_start, glyph_start, line);
        fragment.overflowing = overflowing;
        apply_line_flags(generator.store, &fragment);
        return LineOutcome::Line {
            fragment,
            remaining,
        };
    }
}

/// Writes the flags a line decided on back to its glyphs.
///
/// Only the soft hyphen the line breaks at is shown, and only the glyphs the line
/// recorded as overflowing draw outside it. Lines adopted from a soft layout replay
/// this over regenerated glyphs.
pub(crate) fn apply_line_flags(store: &mut RunStore, fragment: &LineFragment) {
    for index in fragment.glyph_range.clone() {
        let Some(glyph) = store.glyph(index) else {
            break;
        };
        let outside = fragment.overflowing.binary_search(&index).is_ok();
        let hidden = if glyph.flags.soft {
            fragment.hyphen != Some(index)
        } else {
            glyph.flags.is_not_shown
        };
        if glyph.flags.draws_outside_line_fragment != outside || glyph.flags.is_not_shown != hidden
        {
            store.update_glyph_flags(index, |flags| {
                flags.draws_outside_line_fragment = outside;
                flags.is_not_shown = hidden;
            });
        }
    }
}

fn build_fragment<T: TextStore + ?Sized, F: FontMetrics + ?Sized>(
    generator: &mut Generator<'_, T, F>,
    rect: Rect,
    padding: f64,
    char_start: usize,
    glyph_start: usize,
    line: BrokenLine,
) -> LineFragment {
    let glyph_end = line.glyph_end;
    let hyphenate = generator.options().hyphenate_at_soft_breaks;
    let char_end = match generator.glyph(glyph_end) {
        Some(glyph) => glyph.char_index,
        None => generator.text().len(),
    };
    let baseline = line.state.ascent;
    let used_width = (2.0 * padding + line.width).min(rect.width());

    let starts: Vec<(usize, f64)> = line
        .state
        .points
        .into_iter()
        .filter(|(index, _)| *index < glyph_end || *index == glyph_start)
        .collect();
    let mut points = vec![];
    for (i, (index, x)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(glyph_end, |next| next.0);
        points.push(LinePoint {
            glyph_range: *index..end,
            origin: Point::new(padding + x, baseline),
        });
    }
    let attachments = line
        .state
        .attachments
        .into_iter()
        .filter(|(index, _)| *index < glyph_end)
        .filter_map(|(index, x)| {
            let size = generator.glyph(index)?.advancement;
            Some(LineAttachment {
                glyph_range: index..index + 1,
                size,
                origin: Point::new(padding + x, baseline - size.height),
            })
        })
        .collect();

    LineFragment {
        rect,
        used_rect: Rect::new(rect.x0, rect.y0, rect.x0 + used_width, rect.y1),
        glyph_range: glyph_start..glyph_end,
        char_range: char_start..char_end,
        baseline,
        points,
        attachments,
        hyphen: line.hyphen.filter(|_| hyphenate),
        overflowing: Vec::new(),
    }
}
