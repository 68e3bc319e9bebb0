/// Sequence strip
/// Shows where the cursor and the marks sit within the whole image set
use iced::widget::canvas;
use iced::{Color, Point, Rectangle, Size};

use crate::state::AnnotationSession;
use crate::Message;

/// Snapshot of the positions to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceStrip {
    pub total: usize,
    pub cursor: usize,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub single: bool,
}

impl SequenceStrip {
    pub fn from_session(session: &AnnotationSession) -> Self {
        let marks = session.marks();
        Self {
            total: session.images().len(),
            cursor: session.images().position(),
            start: marks.start_index,
            end: marks.end_index,
            single: marks.single_image_mode,
        }
    }

    /// Cells between the two marks, inclusive, in either order
    fn marked_range(&self) -> Option<(usize, usize)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start.min(end), start.max(end))),
            _ => None,
        }
    }
}

const BACKGROUND: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.08);
const RANGE: Color = Color::from_rgba(0.3, 0.6, 1.0, 0.35);
const START: Color = Color::from_rgb(0.2, 0.8, 0.3);
const END: Color = Color::from_rgb(0.9, 0.3, 0.3);
const SINGLE: Color = Color::from_rgb(0.95, 0.75, 0.2);
const CURSOR: Color = Color::WHITE;

impl canvas::Program<Message> for SequenceStrip {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &iced::Theme,
        bounds: Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let height = bounds.height;

        frame.fill_rectangle(Point::ORIGIN, bounds.size(), BACKGROUND);

        if self.total == 0 {
            return vec![frame.into_geometry()];
        }

        let cell = bounds.width / self.total as f32;
        let column = |index: usize, color: Color, frame: &mut canvas::Frame| {
            frame.fill_rectangle(
                Point::new(index as f32 * cell, 0.0),
                Size::new(cell.max(2.0), height),
                color,
            );
        };

        if let Some((low, high)) = self.marked_range() {
            frame.fill_rectangle(
                Point::new(low as f32 * cell, 0.0),
                Size::new((high - low + 1) as f32 * cell, height),
                RANGE,
            );
        }

        if self.single {
            if let Some(index) = self.start {
                column(index, SINGLE, &mut frame);
            }
        } else {
            if let Some(index) = self.start {
                column(index, START, &mut frame);
            }
            if let Some(index) = self.end {
                column(index, END, &mut frame);
            }
        }

        // Cursor as a thin line centered on its cell
        let x = (self.cursor as f32 + 0.5) * cell;
        frame.fill_rectangle(Point::new(x - 1.0, 0.0), Size::new(2.0, height), CURSOR);

        vec![frame.into_geometry()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_range_in_either_order() {
        let strip = SequenceStrip {
            total: 10,
            cursor: 0,
            start: Some(7),
            end: Some(2),
            single: false,
        };
        assert_eq!(strip.marked_range(), Some((2, 7)));

        let start_only = SequenceStrip { end: None, ..strip };
        assert_eq!(start_only.marked_range(), None);
    }
}
