// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The attributed character store collaborator.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Range;

use peniko::kurbo::Size;

use crate::error::Error;
use crate::font::FontId;
use crate::run::RunAttributes;
use crate::MAX_BIDI_LEVEL;

/// Rendering attributes attached to a range of characters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextAttributes {
    /// The font the characters are set in.
    pub font: FontId,
    /// The bidi embedding level, as resolved by the caller.
    pub bidi_level: u8,
    /// Ligature substitution: `0` disables ligatures, `1` enables the default set.
    pub ligature: u8,
    /// Explicit kerning added to every glyph's advance, overriding font kerning.
    pub kern: Option<f64>,
    /// Size of the inline object drawn for U+FFFC OBJECT REPLACEMENT CHARACTER.
    pub attachment: Option<Size>,
}

impl TextAttributes {
    /// Attributes setting text in `font` with default ligatures.
    pub fn new(font: FontId) -> Self {
        Self {
            font,
            ligature: 1,
            ..Self::default()
        }
    }

    /// Returns the attributes with a different bidi level.
    pub fn with_bidi_level(mut self, level: u8) -> Self {
        self.bidi_level = level;
        self
    }

    /// Returns the attributes with a different ligature setting.
    pub fn with_ligature(mut self, ligature: u8) -> Self {
        self.ligature = ligature;
        self
    }

    /// Returns the attributes with explicit kerning.
    pub fn with_kern(mut self, kern: f64) -> Self {
        self.kern = Some(kern);
        self
    }

    /// Returns the attributes with an attachment size.
    pub fn with_attachment(mut self, size: Size) -> Self {
        self.attachment = Some(size);
        self
    }

    /// The subset of the attributes shared by every glyph of a run.
    pub fn run_attributes(&self) -> RunAttributes {
        RunAttributes {
            font: self.font,
            bidi_level: self.bidi_level.min(MAX_BIDI_LEVEL),
            ligature: self.ligature,
            explicit_kerning: self.kern.is_some(),
        }
    }
}

/// Notification that the characters of a [`TextStore`] changed.
///
/// `range` is the extent of the changed characters *after* the edit and `delta` is the
/// change in the length of the text, so the edit replaced
/// `range.start..range.end - delta` of the old text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    /// Extent of the changed characters in the edited text.
    pub range: Range<usize>,
    /// Change in the number of characters.
    pub delta: isize,
}

impl TextEdit {
    /// The number of characters the edit removed.
    pub fn removed(&self) -> usize {
        self.range.len().wrapping_add_signed(-self.delta)
    }

    /// The number of characters the edit inserted.
    pub fn inserted(&self) -> usize {
        self.range.len()
    }

    /// The end of the replaced range in the text before the edit.
    pub fn old_end(&self) -> usize {
        self.range.start + self.removed()
    }
}

/// An attributed character stream that glyphs are generated from.
///
/// Indices count `char`s.
pub trait TextStore {
    /// The number of characters.
    fn len(&self) -> usize;

    /// Returns `true` if the text has no characters.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The character at `index`, or `None` past the end.
    fn char_at(&self, index: usize) -> Option<char>;

    /// The maximal range of characters around `index` sharing one set of attributes.
    fn attribute_run(&self, index: usize) -> Option<(Range<usize>, &TextAttributes)>;
}

/// A simple [`TextStore`]: a vector of characters and a list of attribute runs.
#[derive(Clone, Debug, Default)]
pub struct AttributedString {
    chars: Vec<char>,
    /// Lengths and attributes of consecutive runs. Adjacent runs always differ.
    runs: Vec<(usize, TextAttributes)>,
    /// Attributes for text inserted into an empty string.
    default_attributes: TextAttributes,
}

impl AttributedString {
    /// Creates a string with a single set of attributes.
    pub fn new(text: &str, attributes: TextAttributes) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut runs = Vec::new();
        if !chars.is_empty() {
            runs.push((chars.len(), attributes.clone()));
        }
        Self {
            chars,
            runs,
            default_attributes: attributes,
        }
    }

    /// The text as a `String`.
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// The characters in `range` as a `String`.
    pub fn substring(&self, range: Range<usize>) -> Result<String, Error> {
        self.check_range(&range)?;
        Ok(self.chars[range].iter().collect())
    }

    /// Iterates over the attribute runs as `(range, attributes)`.
    pub fn attribute_runs(&self) -> impl Iterator<Item = (Range<usize>, &TextAttributes)> + '_ {
        let mut start = 0;
        self.runs.iter().map(move |(len, attributes)| {
            let range = start..start + len;
            start += len;
            (range, attributes)
        })
    }

    /// Appends `text` with its own attributes.
    pub fn push(&mut self, text: &str, attributes: TextAttributes) -> TextEdit {
        let start = self.chars.len();
        self.splice(start..start, text, attributes)
    }

    /// Replaces `range` with `text`.
    ///
    /// The new characters take the attributes of the character before `range`, or of the
    /// first character when `range` starts the text.
    pub fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<TextEdit, Error> {
        self.check_range(&range)?;
        let attributes = self.typing_attributes(range.start);
        self.replace_with_attributes(range, text, attributes)
    }

    /// Replaces `range` with `text` set in `attributes`.
    pub fn replace_with_attributes(
        &mut self,
        range: Range<usize>,
        text: &str,
        attributes: TextAttributes,
    ) -> Result<TextEdit, Error> {
        self.check_range(&range)?;
        Ok(self.splice(range, text, attributes))
    }

    fn splice(&mut self, range: Range<usize>, text: &str, attributes: TextAttributes) -> TextEdit {
        let inserted: Vec<char> = text.chars().collect();
        let count = inserted.len();
        let removed = range.len();
        self.chars.splice(range.clone(), inserted);

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        self.runs.drain(first..last);
        if count > 0 {
            self.runs.insert(first, (count, attributes));
        }
        self.normalize();

        TextEdit {
            range: range.start..range.start + count,
            delta: count as isize - removed as isize,
        }
    }

    /// Inserts `text` at `index`.
    pub fn insert(&mut self, index: usize, text: &str) -> Result<TextEdit, Error> {
        self.replace_range(index..index, text)
    }

    /// Deletes the characters in `range`.
    pub fn delete(&mut self, range: Range<usize>) -> Result<TextEdit, Error> {
        self.replace_range(range, "")
    }

    /// Replaces the attributes of the characters in `range`.
    pub fn set_attributes(
        &mut self,
        range: Range<usize>,
        attributes: TextAttributes,
    ) -> Result<TextEdit, Error> {
        self.check_range(&range)?;
        if !range.is_empty() {
            let first = self.split_at(range.start);
            let last = self.split_at(range.end);
            self.runs.splice(first..last, [(range.len(), attributes)]);
            self.normalize();
        }
        Ok(TextEdit { range, delta: 0 })
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), Error> {
        if range.start > range.end || range.end > self.chars.len() {
            return Err(Error::invalid_range(range.start, range.end, self.chars.len()));
        }
        Ok(())
    }

    fn typing_attributes(&self, index: usize) -> TextAttributes {
        let before = if index == 0 { 0 } else { index - 1 };
        self.attribute_run(before)
            .map_or_else(|| self.default_attributes.clone(), |(_, a)| a.clone())
    }

    /// Makes `index` a run boundary and returns the index of the run starting there.
    fn split_at(&mut self, index: usize) -> usize {
        let mut start = 0;
        for i in 0..self.runs.len() {
            let len = self.runs[i].0;
            if index == start {
                return i;
            }
            if index < start + len {
                let head = index - start;
                let attributes = self.runs[i].1.clone();
                self.runs[i].0 = head;
                self.runs.insert(i + 1, (len - head, attributes));
                return i + 1;
            }
            start += len;
        }
        self.runs.len()
    }

    fn normalize(&mut self) {
        self.runs.retain(|(len, _)| *len > 0);
        let mut i = 1;
        while i < self.runs.len() {
            if self.runs[i].1 == self.runs[i - 1].1 {
                let len = self.runs.remove(i).0;
                self.runs[i - 1].0 += len;
            } else {
                i += 1;
            }
        }
        if let Some((_, attributes)) = self.runs.first() {
            self.default_attributes = attributes.clone();
        }
    }
}

impl TextStore for AttributedString {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    fn attribute_run(&self, index: usize) -> Option<(Range<usize>, &TextAttributes)> {
        if index >= self.chars.len() {
            return None;
        }
        self.attribute_runs()
            .find(|(range, _)| range.contains(&index))
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributedString, TextAttributes, TextStore};
    use crate::font::FontId;

    fn attrs(font: u32) -> TextAttributes {
        TextAttributes::new(FontId(font))
    }

    #[test]
    fn edits_report_post_edit_range_and_delta() {
        let mut text = AttributedString::new("hello world", attrs(0));
        let edit = text.replace_range(0..5, "goodbye").unwrap();
        assert_eq!(edit.range, 0..7, "range covers the inserted characters");
        assert_eq!(edit.delta, 2, "two characters longer");
        assert_eq!(edit.removed(), 5, "five characters replaced");
        assert_eq!(text.text(), "goodbye world", "text after replacement");

        let edit = text.delete(7..13).unwrap();
        assert_eq!(edit.range, 7..7, "deletion leaves an empty range");
        assert_eq!(edit.delta, -6, "six characters removed");
        assert_eq!(edit.old_end(), 13, "old extent of the deletion");
    }

    #[test]
    fn attribute_runs_coalesce() {
        let mut text = AttributedString::new("aaaa", attrs(0));
        text.push("bbbb", attrs(1));
        assert_eq!(text.attribute_run(5).unwrap().0, 4..8, "second run");

        text.set_attributes(2..6, attrs(1)).unwrap();
        assert_eq!(text.attribute_run(0).unwrap().0, 0..2, "shortened first run");
        assert_eq!(text.attribute_run(3).unwrap().0, 2..8, "merged with the tail");

        text.set_attributes(0..2, attrs(1)).unwrap();
        assert_eq!(text.attribute_runs().count(), 1, "uniform attributes");
    }

    #[test]
    fn inserted_text_inherits_preceding_attributes() {
        let mut text = AttributedString::new("ab", attrs(0));
        text.push("cd", attrs(1));
        text.insert(2, "X").unwrap();
        assert_eq!(
            text.attribute_run(2).unwrap().1.font,
            FontId(0),
            "typing at the end of a run extends it"
        );
        text.insert(0, "Y").unwrap();
        assert_eq!(
            text.attribute_run(0).unwrap().1.font,
            FontId(0),
            "typing at the start takes the first run's attributes"
        );
    }

    #[test]
    fn out_of_range_edits_are_rejected() {
        let mut text = AttributedString::new("abc", attrs(0));
        assert!(text.replace_range(2..5, "x").is_err(), "end past the text");
        let (start, end) = (2, 1);
        assert!(text.delete(start..end).is_err(), "reversed range");
        assert_eq!(text.text(), "abc", "text untouched");
    }
}
