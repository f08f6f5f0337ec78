// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text containers: the regions text flows through.

use core::cell::Cell;

use peniko::kurbo::{Rect, Size};

/// The direction glyphs advance within a line fragment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SweepDirection {
    /// Glyphs advance to the left.
    Left,
    /// Glyphs advance to the right.
    #[default]
    Right,
    /// Glyphs advance downwards.
    Down,
    /// Glyphs advance upwards.
    Up,
}

/// The direction a proposed line fragment may be moved to find space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MovementDirection {
    /// The fragment must stay where it was proposed.
    DoesntMove,
    /// The fragment may move left.
    Left,
    /// The fragment may move right.
    Right,
    /// The fragment may move down.
    #[default]
    Down,
    /// The fragment may move up.
    Up,
}

/// A region that text is laid out in.
///
/// The layout manager only keeps a non-owning reference to a container. Callers own
/// containers through an `Rc` and must tell the manager when a container's geometry
/// changes with
/// [`LayoutManager::text_container_changed_geometry`](crate::LayoutManager::text_container_changed_geometry).
pub trait TextContainer {
    /// The size of the container. Its origin is at `(0, 0)`.
    fn size(&self) -> Size;

    /// Horizontal inset applied to both ends of every line fragment.
    fn line_fragment_padding(&self) -> f64 {
        0.0
    }

    /// Negotiates the rectangle of a line fragment.
    ///
    /// Given a proposed rectangle, returns the largest rectangle inside the container
    /// that text can occupy, and the remainder of the proposed row that is still free
    /// for a further fragment on the same row. An empty fragment means the container
    /// is full.
    ///
    /// The default implementation treats the container as a plain rectangle: it clips
    /// the proposal horizontally, moves it down to the top edge when allowed and
    /// rejects it if it does not fit vertically.
    fn line_fragment_rect(
        &self,
        proposed: Rect,
        sweep: SweepDirection,
        movement: MovementDirection,
    ) -> (Rect, Rect) {
        let _ = sweep;
        let bounds = self.size().to_rect();
        let mut rect = proposed;
        if rect.y0 < bounds.y0 {
            if movement != MovementDirection::Down {
                return (Rect::ZERO, Rect::ZERO);
            }
            rect = rect.with_origin((rect.x0, bounds.y0));
        }
        rect.x0 = rect.x0.max(bounds.x0);
        rect.x1 = rect.x1.min(bounds.x1);
        if rect.x1 <= rect.x0 || rect.y1 > bounds.y1 || rect.height() <= 0.0 {
            return (Rect::ZERO, Rect::ZERO);
        }
        (rect, Rect::ZERO)
    }
}

/// A rectangular [`TextContainer`].
///
/// The size can be changed through a shared reference, so that the owner of an
/// `Rc<RectContainer>` can resize it while a layout manager refers to it.
#[derive(Debug)]
pub struct RectContainer {
    size: Cell<Size>,
    padding: f64,
}

impl RectContainer {
    /// Creates a container of the given size without padding.
    pub fn new(size: Size) -> Self {
        Self {
            size: Cell::new(size),
            padding: 0.0,
        }
    }

    /// Returns the container with line fragment padding.
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Resizes the container.
    ///
    /// Layout already computed for the container stays in place until the layout
    /// manager is notified.
    pub fn set_size(&self, size: Size) {
        self.size.set(size);
    }
}

impl TextContainer for RectContainer {
    fn size(&self) -> Size {
        self.size.get()
    }

    fn line_fragment_padding(&self) -> f64 {
        self.padding
    }
}

#[cfg(test)]
mod tests {
    use peniko::kurbo::{Rect, Size};

    use super::{MovementDirection, RectContainer, SweepDirection, TextContainer};

    #[test]
    fn rectangular_negotiation() {
        let container = RectContainer::new(Size::new(100.0, 30.0));
        let (rect, remaining) = container.line_fragment_rect(
            Rect::new(0.0, 10.0, 150.0, 22.0),
            SweepDirection::Right,
            MovementDirection::Down,
        );
        assert_eq!(rect, Rect::new(0.0, 10.0, 100.0, 22.0), "clipped to the width");
        assert_eq!(remaining, Rect::ZERO, "nothing left on the row");

        let (rect, _) = container.line_fragment_rect(
            Rect::new(0.0, 20.0, 100.0, 32.0),
            SweepDirection::Right,
            MovementDirection::Down,
        );
        assert_eq!(rect, Rect::ZERO, "row past the bottom edge");

        container.set_size(Size::new(100.0, 40.0));
        let (rect, _) = container.line_fragment_rect(
            Rect::new(0.0, 20.0, 100.0, 32.0),
            SweepDirection::Right,
            MovementDirection::Down,
        );
        assert_eq!(rect.height(), 12.0, "row fits after growing");
    }
}
