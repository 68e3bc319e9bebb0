/// Google Sheets backend
///
/// Talks to the Sheets v4 and Drive v3 REST APIs with a blocking `reqwest`
/// client. Spreadsheets are looked up by title through Drive; cells are
/// read and written on the first sheet. Values go through
/// `USER_ENTERED` so the sheet parses them the way it would typed input.

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::table::{ApiFailureKind, Row, TableClient, TableError, TableHandle};
use super::SyncError;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Whole first sheet
const FULL_RANGE: &str = "A1:ZZ";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Contents of the credentials file
#[derive(Deserialize)]
struct Credentials {
    access_token: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FileList {
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ValueRange {
    values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
    http: Client,
    token: String,
}

impl SheetsClient {
    /// Read the bearer token from `path`. A missing, unreadable or malformed
    /// file is reported as missing credentials.
    pub fn from_credentials_file(path: &Path) -> Result<Self, SyncError> {
        let missing = || SyncError::CredentialsMissing {
            path: path.to_path_buf(),
        };

        let text = std::fs::read_to_string(path).map_err(|_| missing())?;
        let token = parse_access_token(&text).ok_or_else(missing)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::Unexpected {
                detail: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, token })
    }

    fn send(&self, request: RequestBuilder) -> Result<Value, TableError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| TableError::Unexpected(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TableError::Unexpected(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(TableError::api(
                classify_failure(status.as_u16(), &body),
                format!("HTTP {}: {}", status, body),
            ));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| TableError::Unexpected(format!("Malformed response: {}", e)))
    }

    fn values_url(&self, table: &TableHandle, suffix: &str) -> String {
        format!("{}/spreadsheets/{}/values/{}", SHEETS_API, table.id, suffix)
    }
}

fn decode<T: serde::de::DeserializeOwned + Default>(value: Value) -> Result<T, TableError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value)
        .map_err(|e| TableError::Unexpected(format!("Unexpected response shape: {}", e)))
}

impl TableClient for SheetsClient {
    fn find(&mut self, title: &str) -> Result<Option<TableHandle>, TableError> {
        let query = drive_title_query(title);
        let request = self
            .http
            .get(format!("{}/files", DRIVE_API))
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);

        let list: FileList = decode(self.send(request)?)?;
        debug!("Drive search for '{}' returned {} files", title, list.files.len());

        Ok(list.files.into_iter().next().map(|file| TableHandle {
            id: file.id,
            title: file.name,
        }))
    }

    fn create(&mut self, title: &str) -> Result<TableHandle, TableError> {
        let request = self
            .http
            .post(format!("{}/spreadsheets", SHEETS_API))
            .json(&json!({ "properties": { "title": title } }));

        let created: Spreadsheet = serde_json::from_value(self.send(request)?)
            .map_err(|e| TableError::Unexpected(format!("Unexpected create response: {}", e)))?;

        Ok(TableHandle {
            id: created.spreadsheet_id,
            title: title.to_string(),
        })
    }

    fn read_all(&mut self, table: &TableHandle) -> Result<Vec<Row>, TableError> {
        let request = self.http.get(self.values_url(table, FULL_RANGE));
        let range: ValueRange = decode(self.send(request)?)?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn write_top(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        // A single values update: only the cells covered by `rows` change
        let update = self
            .http
            .put(self.values_url(table, "A1"))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": rows }));
        self.send(update)?;
        Ok(())
    }

    fn append_rows(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        if rows.is_empty() {
            return Ok(());
        }

        let request = self
            .http
            .post(self.values_url(table, "A1:append"))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": rows }));
        self.send(request)?;
        Ok(())
    }
}

fn parse_access_token(text: &str) -> Option<String> {
    let credentials: Credentials = serde_json::from_str(text).ok()?;
    let token = credentials.access_token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Drive search expression for a spreadsheet with exactly this title
fn drive_title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME
    )
}

/// Map an HTTP failure onto the kinds the user is told about
fn classify_failure(status: u16, body: &str) -> ApiFailureKind {
    if status == 403 || body.contains("PERMISSION_DENIED") {
        ApiFailureKind::PermissionDenied
    } else if status == 429 || body.contains("RESOURCE_EXHAUSTED") || body.contains("Quota exceeded") {
        ApiFailureKind::QuotaExceeded
    } else if status == 404 {
        ApiFailureKind::NotFound
    } else {
        ApiFailureKind::Other
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure(403, ""), ApiFailureKind::PermissionDenied);
        assert_eq!(
            classify_failure(400, r#"{"error":{"status":"PERMISSION_DENIED"}}"#),
            ApiFailureKind::PermissionDenied
        );
        assert_eq!(classify_failure(429, ""), ApiFailureKind::QuotaExceeded);
        assert_eq!(
            classify_failure(400, "Quota exceeded for quota metric"),
            ApiFailureKind::QuotaExceeded
        );
        assert_eq!(classify_failure(404, ""), ApiFailureKind::NotFound);
        assert_eq!(classify_failure(500, "backend error"), ApiFailureKind::Other);
    }

    #[test]
    fn test_drive_query_escapes_quotes() {
        let query = drive_title_query("Noe's data");
        assert!(query.starts_with("name = 'Noe\\'s data'"));
        assert!(query.contains(SPREADSHEET_MIME));
    }

    #[test]
    fn test_parse_access_token() {
        assert_eq!(
            parse_access_token(r#"{"access_token": " ya29.token "}"#),
            Some("ya29.token".to_string())
        );
        assert_eq!(parse_access_token(r#"{"access_token": ""}"#), None);
        assert_eq!(parse_access_token(r#"{"type": "service_account"}"#), None);
        assert_eq!(parse_access_token("not json"), None);
    }

    #[test]
    fn test_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        assert!(matches!(
            SheetsClient::from_credentials_file(&path),
            Err(SyncError::CredentialsMissing { .. })
        ));

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{"access_token": "abc"}"#).unwrap();
        let client = SheetsClient::from_credentials_file(&path).unwrap();
        assert_eq!(client.token, "abc");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(json!("Site")), "Site");
        assert_eq!(cell_text(json!(3)), "3");
        assert_eq!(cell_text(json!(true)), "true");
        assert_eq!(cell_text(Value::Null), "");
    }

    #[test]
    fn test_value_range_without_values() {
        let range: ValueRange = decode(json!({ "range": "Sheet1!A1:ZZ1000" })).unwrap();
        assert!(range.values.is_empty());
    }
}
