//! Drive v3 / Sheets v4 adapter.
//!
//! Containers are Drive folders and documents are native spreadsheets. All
//! requests carry one bearer token; when it is refreshed a new
//! [`GoogleStore`] is built and swapped into the
//! [`StoreHandle`](crate::StoreHandle) by [`GoogleSession`](crate::GoogleSession).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daysheet_core::schema::CellRange;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::model::{FormatRequest, NewResource, Query, Resource, ResourceKind};
use crate::store::DocumentStore;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

const DRIVE_URL: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4";

const FILE_FIELDS: &str = "id,name,mimeType,parents,appProperties,createdTime,trashed";
const MULTIPART_BOUNDARY: &str = "daysheet-upload-boundary";

/// Connection settings for [`GoogleStore`].
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth bearer token with Drive and Sheets scopes.
    pub access_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub drive_url: String,
    pub upload_url: String,
    pub sheets_url: String,
}

impl GoogleConfig {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            timeout,
            drive_url: DRIVE_URL.to_string(),
            upload_url: UPLOAD_URL.to_string(),
            sheets_url: SHEETS_URL.to_string(),
        }
    }
}

/// [`DocumentStore`] backed by Google Drive and Google Sheets.
pub struct GoogleStore {
    client: reqwest::Client,
    config: GoogleConfig,
}

/// A Drive file as returned with [`FILE_FIELDS`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    app_properties: BTreeMap<String, String>,
    created_time: DateTime<Utc>,
    #[serde(default)]
    trashed: bool,
}

impl From<DriveFile> for Resource {
    fn from(file: DriveFile) -> Self {
        let kind = if file.mime_type == FOLDER_MIME {
            ResourceKind::Container
        } else {
            ResourceKind::Document
        };
        Resource {
            id: file.id,
            name: file.name,
            kind,
            parents: file.parents,
            properties: file.app_properties,
            created_at: file.created_time,
            trashed: file.trashed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetMeta {
    properties: SheetProperties,
    #[serde(default)]
    protected_ranges: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
}

impl GoogleStore {
    pub fn new(config: GoogleConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a store reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GoogleConfig) -> Self {
        Self { client, config }
    }

    async fn first_sheet(&self, id: &str) -> Result<SheetMeta, StoreError> {
        let response = self
            .client
            .get(format!("{}/spreadsheets/{id}", self.config.sheets_url))
            .bearer_auth(&self.config.access_token)
            .query(&[("fields", "sheets(properties(sheetId),protectedRanges(protectedRangeId))")])
            .send()
            .await?;
        let sheet: Spreadsheet = Self::parse_response(response, id).await?;
        sheet
            .sheets
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("Spreadsheet {id} has no sheets")))
    }

    // ---- private helpers ----

    /// Map a non-2xx response to [`StoreError`]. A 404 becomes
    /// [`StoreError::NotFound`] for `subject`.
    async fn ensure_success(
        response: reqwest::Response,
        subject: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        subject: &str,
    ) -> Result<T, StoreError> {
        let response = Self::ensure_success(response, subject).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response, subject: &str) -> Result<(), StoreError> {
        Self::ensure_success(response, subject).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for GoogleStore {
    async fn list(&self, query: &Query) -> Result<Vec<Resource>, StoreError> {
        let q = drive_query(query);
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut found = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q.clone()),
                ("fields", fields.clone()),
                ("orderBy", "createdTime".to_string()),
                ("pageSize", "1000".to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }
            let response = self
                .client
                .get(format!("{}/files", self.config.drive_url))
                .bearer_auth(&self.config.access_token)
                .query(&params)
                .send()
                .await?;
            let subject = query.parent.as_deref().unwrap_or("files");
            let page: FileList = Self::parse_response(response, subject).await?;
            found.extend(page.files.into_iter().map(Resource::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(query = %q, count = found.len(), "Listed drive files");
        Ok(found)
    }

    async fn create(&self, resource: NewResource) -> Result<Resource, StoreError> {
        let body = file_metadata(&resource);
        let response = self
            .client
            .post(format!("{}/files", self.config.drive_url))
            .bearer_auth(&self.config.access_token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&body)
            .send()
            .await?;
        let subject = resource.parent.as_deref().unwrap_or(&resource.name);
        let file: DriveFile = Self::parse_response(response, subject).await?;
        Ok(file.into())
    }

    async fn trash(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(format!("{}/files/{id}", self.config.drive_url))
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "trashed": true }))
            .send()
            .await?;
        Self::check_status(response, id).await
    }

    async fn get_cell_range(
        &self,
        id: &str,
        range: CellRange,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let response = self
            .client
            .get(format!(
                "{}/spreadsheets/{id}/values/{}",
                self.config.sheets_url,
                range.to_a1()
            ))
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let values: ValueRange = Self::parse_response(response, id).await?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn set_cell_range(
        &self,
        id: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        if values.len() > range.height() as usize
            || values.iter().any(|row| row.len() > range.width() as usize)
        {
            return Err(StoreError::InvalidRange(format!(
                "{} values do not fit {}",
                values.len(),
                range.to_a1()
            )));
        }

        // The service account owns every file, so sheet protection alone
        // would not stop our own writes.
        let sheet = self.first_sheet(id).await?;
        if !sheet.protected_ranges.is_empty() {
            return Err(StoreError::ReadOnly(id.to_string()));
        }

        let a1 = range.to_a1();
        let response = self
            .client
            .put(format!("{}/spreadsheets/{id}/values/{a1}", self.config.sheets_url))
            .bearer_auth(&self.config.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": a1,
                "majorDimension": "ROWS",
                "values": values,
            }))
            .send()
            .await?;
        Self::check_status(response, id).await
    }

    async fn is_protected(&self, id: &str) -> Result<bool, StoreError> {
        Ok(!self.first_sheet(id).await?.protected_ranges.is_empty())
    }

    async fn batch_format(&self, id: &str, requests: Vec<FormatRequest>) -> Result<(), StoreError> {
        if requests.is_empty() {
            return Ok(());
        }
        let sheet_id = self.first_sheet(id).await?.properties.sheet_id;
        let body: Vec<Value> = requests
            .iter()
            .map(|r| format_request_json(sheet_id, r))
            .collect();

        let response = self
            .client
            .post(format!("{}/spreadsheets/{id}:batchUpdate", self.config.sheets_url))
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "requests": body }))
            .send()
            .await?;
        Self::check_status(response, id).await
    }

    async fn upload(&self, path: &Path, resource: NewResource) -> Result<Resource, StoreError> {
        let content = tokio::fs::read(path).await?;
        let metadata = file_metadata(&NewResource {
            kind: ResourceKind::Document,
            ..resource
        });

        let mut body = Vec::with_capacity(content.len() + 512);
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{MULTIPART_BOUNDARY}\r\nContent-Type: text/csv\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&content);
        body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--").as_bytes());

        let response = self
            .client
            .post(format!("{}/files", self.config.upload_url))
            .bearer_auth(&self.config.access_token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?;
        let file: DriveFile = Self::parse_response(response, &path.display().to_string()).await?;
        tracing::info!(file_id = %file.id, path = %path.display(), "Uploaded document");
        Ok(file.into())
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get(format!("{}/files/{id}/export", self.config.drive_url))
            .bearer_auth(&self.config.access_token)
            .query(&[("mimeType", "text/csv")])
            .send()
            .await?;
        let response = Self::ensure_success(response, id).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Quote a literal for the Drive query language.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Translate a [`Query`] into a Drive `q` expression.
fn drive_query(query: &Query) -> String {
    let mut clauses = Vec::new();
    if let Some(parent) = &query.parent {
        clauses.push(format!("{} in parents", quote_literal(parent)));
    }
    if let Some(name) = &query.name {
        clauses.push(format!("name = {}", quote_literal(name)));
    }
    match query.kind {
        Some(ResourceKind::Container) => clauses.push(format!("mimeType = '{FOLDER_MIME}'")),
        Some(ResourceKind::Document) => clauses.push(format!("mimeType = '{SPREADSHEET_MIME}'")),
        None => {}
    }
    if let Some((key, value)) = &query.property {
        clauses.push(format!(
            "appProperties has {{ key={} and value={} }}",
            quote_literal(key),
            quote_literal(value)
        ));
    }
    if !query.include_trashed {
        clauses.push("trashed = false".to_string());
    }
    clauses.join(" and ")
}

fn file_metadata(resource: &NewResource) -> Value {
    let mime = match resource.kind {
        ResourceKind::Container => FOLDER_MIME,
        ResourceKind::Document => SPREADSHEET_MIME,
    };
    let mut body = json!({
        "name": resource.name,
        "mimeType": mime,
        "parents": resource.parent.iter().collect::<Vec<_>>(),
    });
    if !resource.properties.is_empty() {
        body["appProperties"] = json!(resource.properties);
    }
    body
}

/// Zero-based, end-exclusive grid range for the Sheets batch API.
fn grid_range(sheet_id: i64, range: &CellRange) -> Value {
    json!({
        "sheetId": sheet_id,
        "startRowIndex": range.start_row - 1,
        "endRowIndex": range.end_row,
        "startColumnIndex": range.start_col - 1,
        "endColumnIndex": range.end_col,
    })
}

fn format_request_json(sheet_id: i64, request: &FormatRequest) -> Value {
    match request {
        FormatRequest::Style { range, style } => {
            let mut text_format = json!({ "bold": style.bold, "italic": style.italic });
            if let Some(fg) = style.foreground {
                text_format["foregroundColor"] = json!(fg);
            }
            let mut format = json!({ "textFormat": text_format });
            if let Some(bg) = style.background {
                format["backgroundColor"] = json!(bg);
            }
            if style.centered {
                format["horizontalAlignment"] = json!("CENTER");
            }
            json!({
                "repeatCell": {
                    "range": grid_range(sheet_id, range),
                    "cell": { "userEnteredFormat": format },
                    "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)",
                }
            })
        }
        FormatRequest::ColumnWidth {
            start_col,
            end_col,
            pixels,
        } => json!({
            "updateDimensionProperties": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "COLUMNS",
                    "startIndex": start_col.saturating_sub(1),
                    "endIndex": end_col,
                },
                "properties": { "pixelSize": pixels },
                "fields": "pixelSize",
            }
        }),
        FormatRequest::Protect { description } => json!({
            "addProtectedRange": {
                "protectedRange": {
                    "range": { "sheetId": sheet_id },
                    "description": description,
                    "warningOnly": false,
                }
            }
        }),
    }
}

/// Sheets returns formatted values as strings, but numbers and booleans can
/// appear when a cell was typed by hand.
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
    use crate::model::{CellStyle, Color};

    #[test]
    fn query_for_named_child_folder() {
        let q = drive_query(
            &Query::children_of("root-id")
                .with_name("March_2025")
                .of_kind(ResourceKind::Container),
        );
        assert_eq!(
            q,
            "'root-id' in parents and name = 'March_2025' and mimeType = 'application/vnd.google-apps.folder' and trashed = false"
        );
    }

    #[test]
    fn query_escapes_quotes() {
        let q = drive_query(&Query::named("O'Brien").including_trashed());
        assert_eq!(q, "name = 'O\\'Brien'");
    }

    #[test]
    fn query_by_app_property() {
        let q = drive_query(&Query::default().with_property("employee_id", "E-7"));
        assert_eq!(
            q,
            "appProperties has { key='employee_id' and value='E-7' } and trashed = false"
        );
    }

    #[test]
    fn drive_file_becomes_resource() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "abc",
            "name": "Day 3",
            "mimeType": SPREADSHEET_MIME,
            "parents": ["month"],
            "createdTime": "2025-03-03T09:00:00Z",
        }))
        .unwrap();
        let resource = Resource::from(file);
        assert_eq!(resource.kind, ResourceKind::Document);
        assert_eq!(resource.parents, vec!["month".to_string()]);
        assert!(!resource.trashed);
        assert!(resource.properties.is_empty());
    }

    #[test]
    fn metadata_carries_properties_and_parent() {
        let body = file_metadata(
            &NewResource::container("Alice")
                .under("root")
                .with_property("employee_id", "E-1"),
        );
        assert_eq!(body["mimeType"], FOLDER_MIME);
        assert_eq!(body["parents"], json!(["root"]));
        assert_eq!(body["appProperties"]["employee_id"], "E-1");
    }

    #[test]
    fn style_request_uses_zero_based_grid_range() {
        let request = FormatRequest::Style {
            range: CellRange::new(4, 1, 4, 5),
            style: CellStyle {
                background: Some(Color::rgb(0.2, 0.4, 0.8)),
                bold: true,
                ..CellStyle::default()
            },
        };
        let body = format_request_json(7, &request);
        let range = &body["repeatCell"]["range"];
        assert_eq!(range["sheetId"], 7);
        assert_eq!(range["startRowIndex"], 3);
        assert_eq!(range["endRowIndex"], 4);
        assert_eq!(range["startColumnIndex"], 0);
        assert_eq!(range["endColumnIndex"], 5);
        assert_eq!(body["repeatCell"]["cell"]["userEnteredFormat"]["textFormat"]["bold"], true);
    }

    #[test]
    fn column_width_and_protect_requests() {
        let width = format_request_json(
            0,
            &FormatRequest::ColumnWidth {
                start_col: 2,
                end_col: 3,
                pixels: 200,
            },
        );
        assert_eq!(width["updateDimensionProperties"]["range"]["startIndex"], 1);
        assert_eq!(width["updateDimensionProperties"]["properties"]["pixelSize"], 200);

        let protect = format_request_json(
            0,
            &FormatRequest::Protect {
                description: "Locked after 20:00".into(),
            },
        );
        assert_eq!(
            protect["addProtectedRange"]["protectedRange"]["warningOnly"],
            false
        );
    }

    #[test]
    fn non_string_cells_are_rendered() {
        assert_eq!(cell_text(json!("x")), "x");
        assert_eq!(cell_text(json!(4)), "4");
        assert_eq!(cell_text(Value::Null), "");
    }
}
