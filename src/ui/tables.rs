/// Read-only grids for saved annotations and the assignment roster
use iced::widget::{column, horizontal_rule, scrollable, text, Column, Row};
use iced::{Color, Element, Length};

use crate::state::records::{AnnotationRecord, RecordSchema};
use crate::sync::roster::{Roster, STATUS_COLUMN};
use crate::Message;

const CELL_WIDTH: f32 = 150.0;
const GRID_HEIGHT: f32 = 220.0;

const ANNOTATION_TYPE: &str = "Annotation Type";
const IS_SINGLE_IMAGE: &str = "Is Single Image";

/// Saved-annotation columns as shown: the annotation kind first, the raw
/// single-image flag dropped
pub fn record_headers(schema: &RecordSchema) -> Vec<String> {
    std::iter::once(ANNOTATION_TYPE.to_string())
        .chain(schema.headers().into_iter().filter(|h| h != IS_SINGLE_IMAGE))
        .collect()
}

pub fn record_cells(record: &AnnotationRecord, schema: &RecordSchema) -> Vec<String> {
    let headers = schema.headers();

    std::iter::once(record.kind_label().to_string())
        .chain(
            schema
                .row(record)
                .into_iter()
                .zip(headers.iter())
                .filter(|(_, header)| header.as_str() != IS_SINGLE_IMAGE)
                .map(|(cell, _)| cell),
        )
        .collect()
}

pub fn records<'a>(records: &[AnnotationRecord], schema: &RecordSchema) -> Element<'a, Message> {
    let rows: Vec<Vec<String>> = records.iter().map(|r| record_cells(r, schema)).collect();
    let empty = rows.is_empty();

    let grid = grid(record_headers(schema), rows, |_, _| None);
    if empty {
        column![grid, text("No annotations saved yet.").size(13)]
            .spacing(6)
            .into()
    } else {
        grid
    }
}

/// Text color of a roster status cell
fn status_color(status: &str) -> Option<Color> {
    match status.trim() {
        "Completed" => Some(Color::from_rgb(0.45, 0.85, 0.5)),
        "In Progress" => Some(Color::from_rgb(0.45, 0.7, 1.0)),
        "Not Started" => Some(Color::from_rgb(0.95, 0.8, 0.35)),
        _ => None,
    }
}

pub fn roster<'a>(roster: Option<&Result<Roster, String>>) -> Element<'a, Message> {
    match roster {
        None => text("Loading assignments...").size(13).into(),
        Some(Err(err)) => text(format!(
            "Error: could not load the assignment roster. Check logs, credentials and sharing. ({})",
            err
        ))
        .size(13)
        .color(Color::from_rgb(0.95, 0.4, 0.4))
        .into(),
        Some(Ok(roster)) if roster.rows.is_empty() => text("No assignments found.").size(13).into(),
        Some(Ok(roster)) => {
            let status = roster.column(STATUS_COLUMN);
            let summary = roster
                .status_summary()
                .map(|s| {
                    format!(
                        "{} completed · {} in progress · {} not started",
                        s.completed, s.in_progress, s.not_started
                    )
                })
                .unwrap_or_else(|| "No 'Status' column in the roster".to_string());

            let width = roster.headers.len();
            let rows = (0..roster.rows.len())
                .map(|row| (0..width).map(|col| roster.cell(row, col).to_string()).collect())
                .collect();

            column![
                text(summary).size(13),
                grid(roster.headers.clone(), rows, |col, cell| {
                    (Some(col) == status).then(|| status_color(cell)).flatten()
                }),
            ]
            .spacing(6)
            .into()
        }
    }
}

fn grid<'a>(
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    color_of: impl Fn(usize, &str) -> Option<Color>,
) -> Element<'a, Message> {
    let header: Row<'a, Message> = Row::with_children(
        headers
            .into_iter()
            .map(|h| text(h).size(13).width(Length::Fixed(CELL_WIDTH)).into()),
    )
    .spacing(8);

    let body: Column<'a, Message> = Column::with_children(rows.into_iter().map(|cells| {
        Row::with_children(cells.into_iter().enumerate().map(|(col, cell)| {
            let color = color_of(col, &cell);
            let mut cell = text(cell).size(12).width(Length::Fixed(CELL_WIDTH));
            if let Some(color) = color {
                cell = cell.color(color);
            }
            cell.into()
        }))
        .spacing(8)
        .into()
    }))
    .spacing(4);

    scrollable(column![header, horizontal_rule(1), body].spacing(6))
        .direction(scrollable::Direction::Both {
            vertical: scrollable::Scrollbar::default(),
            horizontal: scrollable::Scrollbar::default(),
        })
        .height(Length::Fixed(GRID_HEIGHT))
        .into()
}
