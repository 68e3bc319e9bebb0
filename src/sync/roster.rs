/// Reviewer assignment roster
///
/// A second remote table lists which reviewer handles which camera and how
/// far along they are. It is read-only here: it feeds the reviewer
/// dropdown and a status overview, and failing to load it never blocks
/// annotation.

use tracing::{info, warn};

use super::table::{is_blank_row, ApiFailureKind, Row, TableClient, TableError};
use super::Backend;

pub const REVIEWER_COLUMN: &str = "Reviewer";
pub const STATUS_COLUMN: &str = "Status";

/// Placeholder offered when the roster could not be loaded
pub const LOAD_ERROR_CHOICE: &str = "Error loading sheet";
/// Placeholder offered when the roster has no reviewer column
pub const MISSING_COLUMN_CHOICE: &str = "'Reviewer' column missing";
/// Placeholder offered when the reviewer column has no names in it
pub const NO_REVIEWERS_CHOICE: &str = "No reviewers listed";

/// Header and data rows of the assignments table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// How many assignments are in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub other: usize,
}

impl Roster {
    /// First row is the header; blank rows are skipped
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut rows = rows.into_iter();
        let headers = rows
            .next()
            .map(|header| header.into_iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default();

        Self {
            headers,
            rows: rows.filter(|row| !is_blank_row(row)).collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text, "" where the row is shorter than the header
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Unique non-blank reviewer names, sorted. `None` without a reviewer column.
    pub fn reviewers(&self) -> Option<Vec<String>> {
        let column = self.column(REVIEWER_COLUMN)?;

        let mut names: Vec<String> = (0..self.rows.len())
            .map(|row| self.cell(row, column).trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        Some(names)
    }

    /// Counts per status. `None` without a status column.
    pub fn status_summary(&self) -> Option<StatusSummary> {
        let column = self.column(STATUS_COLUMN)?;

        let mut summary = StatusSummary::default();
        for row in 0..self.rows.len() {
            match self.cell(row, column).trim() {
                "Completed" => summary.completed += 1,
                "In Progress" => summary.in_progress += 1,
                "Not Started" => summary.not_started += 1,
                _ => summary.other += 1,
            }
        }
        Some(summary)
    }
}

/// Read the roster. The table is looked up but never created.
pub fn fetch_roster<C: TableClient + ?Sized>(
    client: &mut C,
    title: &str,
) -> Result<Roster, TableError> {
    let table = client.find(title)?.ok_or_else(|| {
        TableError::api(
            ApiFailureKind::NotFound,
            format!("Spreadsheet '{}' not found", title),
        )
    })?;

    let roster = Roster::from_rows(client.read_all(&table)?);
    if roster.rows.is_empty() {
        warn!("No assignments found in '{}'", title);
    } else {
        info!("Fetched {} assignments from '{}'", roster.rows.len(), title);
    }
    Ok(roster)
}

/// Connect `backend` and read the roster, flattening every failure to text
pub fn load_roster(backend: &Backend, title: &str) -> Result<Roster, String> {
    let result = backend
        .connect()
        .map_err(|e| e.to_string())
        .and_then(|mut client| fetch_roster(&mut client, title).map_err(|e| e.to_string()));

    if let Err(err) = &result {
        warn!("⚠️  Could not load roster '{}': {}", title, err);
    }
    result
}

/// Options for the reviewer dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerChoices {
    pub options: Vec<String>,
    /// False when `options` is a single placeholder explaining the failure
    pub available: bool,
}

impl ReviewerChoices {
    pub fn from_result(result: &Result<Roster, String>) -> Self {
        match result.as_ref().map(Roster::reviewers) {
            Ok(Some(names)) if names.is_empty() => {
                warn!("'{}' column has no names", REVIEWER_COLUMN);
                Self::placeholder(NO_REVIEWERS_CHOICE)
            }
            Ok(Some(names)) => Self {
                options: names,
                available: true,
            },
            Ok(None) => {
                warn!("'{}' column not found in assignments", REVIEWER_COLUMN);
                Self::placeholder(MISSING_COLUMN_CHOICE)
            }
            Err(_) => Self::placeholder(LOAD_ERROR_CHOICE),
        }
    }

    fn placeholder(text: &str) -> Self {
        Self {
            options: vec![text.to_string()],
            available: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::memory::MemoryClient;

    const TITLE: &str = "Seabird Camera Assignments";

    fn roster_client() -> MemoryClient {
        MemoryClient::new().with_table(
            TITLE,
            vec![
                vec!["Camera", "Reviewer", "Status"],
                vec!["CAM001", "Noe", "Completed"],
                vec!["CAM002", "Kai", "In Progress"],
                vec!["CAM003", "Noe", "Not Started"],
                vec!["", "", ""],
                vec!["CAM004", " ", "Not Started"],
                vec!["CAM005"],
            ],
        )
    }

    #[test]
    fn test_fetch_roster() {
        let mut client = roster_client();
        let roster = fetch_roster(&mut client, TITLE).unwrap();

        assert_eq!(roster.headers, ["Camera", "Reviewer", "Status"]);
        assert_eq!(roster.rows.len(), 5);
        assert_eq!(roster.reviewers().unwrap(), ["Kai", "Noe"]);
        assert_eq!(
            roster.status_summary().unwrap(),
            StatusSummary {
                completed: 1,
                in_progress: 1,
                not_started: 2,
                other: 1,
            }
        );
    }

    #[test]
    fn test_missing_roster_is_not_created() {
        let mut client = MemoryClient::new();

        let err = fetch_roster(&mut client, TITLE).unwrap_err();
        assert!(matches!(
            err,
            TableError::Api {
                kind: ApiFailureKind::NotFound,
                ..
            }
        ));
        assert_eq!(client.calls, ["find"]);
        assert!(client.tables.is_empty());
    }

    #[test]
    fn test_reviewer_choices_degrade() {
        let loaded = Ok(Roster::from_rows(vec![
            vec!["Reviewer".to_string()],
            vec!["Mele".to_string()],
        ]));
        assert_eq!(
            ReviewerChoices::from_result(&loaded),
            ReviewerChoices {
                options: vec!["Mele".to_string()],
                available: true,
            }
        );

        let no_column = Ok(Roster::from_rows(vec![vec!["Camera".to_string()]]));
        let choices = ReviewerChoices::from_result(&no_column);
        assert_eq!(choices.options, [MISSING_COLUMN_CHOICE]);
        assert!(!choices.available);

        let unnamed = Ok(Roster::from_rows(vec![
            vec!["Camera".to_string(), "Reviewer".to_string()],
            vec!["CAM001".to_string(), " ".to_string()],
        ]));
        let choices = ReviewerChoices::from_result(&unnamed);
        assert_eq!(choices.options, [NO_REVIEWERS_CHOICE]);
        assert!(!choices.available);

        let failed = Err("Spreadsheet not found".to_string());
        assert_eq!(
            ReviewerChoices::from_result(&failed).options,
            [LOAD_ERROR_CHOICE]
        );
    }

    #[test]
    fn test_empty_table() {
        let roster = Roster::from_rows(Vec::new());
        assert!(roster.headers.is_empty());
        assert_eq!(roster.reviewers(), None);
        assert_eq!(roster.status_summary(), None);
    }

    #[test]
    fn test_load_roster_without_credentials() {
        let backend = Backend::Sheets {
            credentials_path: "/nonexistent/credentials.json".into(),
        };
        let result = load_roster(&backend, TITLE);

        assert!(result.unwrap_err().contains("credentials"));
        assert_eq!(
            ReviewerChoices::from_result(&load_roster(&backend, TITLE)).options,
            [LOAD_ERROR_CHOICE]
        );
    }
}
