//! Remote spreadsheet HTTP API client and wire types.
//!
//! Only the request shape (range strings, value matrices, tab ids) is part
//! of this crate's contract; the exact JSON field names and verbs follow the
//! remote service and can change with it.

use {
    crate::http_client::HttpClientFactory,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    thiserror::Error,
    url::Url,
};

/// Metadata of a remote table: its id and the tabs it contains.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheets: Vec<Tab>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tab {
    pub properties: TabProperties,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridProperties {
    pub row_count: u32,
    pub column_count: u32,
}

/// A rectangular region of cell values in the remote wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

/// Structured error payload of the remote service. Both fields are optional,
/// the service does not always populate them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    pub code: Option<i64>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorPayload>,
}

/// Raw transport failure, before classification into transient or permanent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connectivity or non-response error, including timeouts.
    #[error("failed to send request: {0}")]
    Send(#[source] reqwest::Error),

    /// Got a response but failed to fetch its body.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("HTTP {status}")]
    Status {
        status: u16,
        payload: Option<ErrorPayload>,
    },

    #[error("failed to deserialize response: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// Abstract remote spreadsheet API. Provides a mockable implementation.
#[mockall::automock]
#[async_trait::async_trait]
pub trait SheetsApi: Send + Sync {
    /// Fetches table metadata without any cell data.
    async fn get_metadata(&self, table_id: &str) -> Result<TableMetadata, ApiError>;

    /// Reads the values occupying `range`.
    async fn get_values(&self, table_id: &str, range: &str) -> Result<ValueRange, ApiError>;

    /// Deletes the cell contents of `range` without removing any rows.
    async fn clear_values(&self, table_id: &str, range: &str) -> Result<(), ApiError>;

    /// Overwrites `range` with the given rows.
    async fn update_values(
        &self,
        table_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), ApiError>;

    /// Lets the remote service find the end of the occupied region in
    /// `range` and insert the rows there.
    async fn append_values(
        &self,
        table_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), ApiError>;

    /// Adds a new tab. Not idempotent, the remote service decides what a
    /// duplicate title means.
    async fn add_tab(&self, table_id: &str, title: &str, rows: u32, cols: u32)
    -> Result<(), ApiError>;

    /// Deletes whole rows `[start_index, end_index)` (0-based) of a tab.
    async fn delete_rows(
        &self,
        table_id: &str,
        tab_id: i64,
        start_index: u32,
        end_index: u32,
    ) -> Result<(), ApiError>;
}

/// Remote spreadsheet API client implementation.
#[derive(Debug)]
pub struct HttpSheetsApi {
    client: reqwest::Client,
    base: Url,
    auth_token: String,
}

impl HttpSheetsApi {
    pub const DEFAULT_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets/";

    pub fn new(factory: &HttpClientFactory, auth_token: String) -> Self {
        Self::with_url(
            factory,
            Url::parse(Self::DEFAULT_URL).unwrap(),
            auth_token,
        )
    }

    pub fn with_url(factory: &HttpClientFactory, base: Url, auth_token: String) -> Self {
        Self {
            client: factory.create(),
            base,
            auth_token,
        }
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .expect("base url cannot be a base")
            .pop_if_empty()
            .extend(segments);
        url
    }

    async fn send<T: for<'a> Deserialize<'a>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(ApiError::Send)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::Body)?;
        tracing::trace!(%status, %body, "spreadsheet api response");
        if !status.is_success() {
            let payload = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error);
            return Err(ApiError::Status {
                status: status.as_u16(),
                payload,
            });
        }
        serde_json::from_str(&body).map_err(ApiError::Deserialize)
    }

    async fn send_expect_success(&self, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        self.send::<Value>(request).await.map(|_| ())
    }

    async fn batch_update(&self, table_id: &str, request: TabRequest) -> Result<(), ApiError> {
        let url = self.url(&[&format!("{table_id}:batchUpdate")]);
        self.send_expect_success(self.client.post(url).json(&BatchUpdate {
            requests: vec![request],
        }))
        .await
    }
}

#[async_trait::async_trait]
impl SheetsApi for HttpSheetsApi {
    async fn get_metadata(&self, table_id: &str) -> Result<TableMetadata, ApiError> {
        let mut url = self.url(&[table_id]);
        url.query_pairs_mut().append_pair("includeGridData", "false");
        self.send(self.client.get(url)).await
    }

    async fn get_values(&self, table_id: &str, range: &str) -> Result<ValueRange, ApiError> {
        let url = self.url(&[table_id, "values", range]);
        self.send(self.client.get(url)).await
    }

    async fn clear_values(&self, table_id: &str, range: &str) -> Result<(), ApiError> {
        let url = self.url(&[table_id, "values", &format!("{range}:clear")]);
        self.send_expect_success(self.client.post(url)).await
    }

    async fn update_values(
        &self,
        table_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), ApiError> {
        let mut url = self.url(&[table_id, "values", range]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.send_expect_success(self.client.put(url).json(&ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_string()),
            values: rows.to_vec(),
        }))
        .await
    }

    async fn append_values(
        &self,
        table_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<(), ApiError> {
        let mut url = self.url(&[table_id, "values", &format!("{range}:append")]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.send_expect_success(self.client.post(url).json(&ValueRange {
            range: None,
            major_dimension: Some("ROWS".to_string()),
            values: rows.to_vec(),
        }))
        .await
    }

    async fn add_tab(
        &self,
        table_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), ApiError> {
        self.batch_update(
            table_id,
            TabRequest::AddSheet(AddSheet {
                properties: NewTabProperties {
                    title: title.to_string(),
                    grid_properties: GridProperties {
                        row_count: rows,
                        column_count: cols,
                    },
                },
            }),
        )
        .await
    }

    async fn delete_rows(
        &self,
        table_id: &str,
        tab_id: i64,
        start_index: u32,
        end_index: u32,
    ) -> Result<(), ApiError> {
        self.batch_update(
            table_id,
            TabRequest::DeleteDimension(DeleteDimension {
                range: DimensionRange {
                    sheet_id: tab_id,
                    dimension: "ROWS",
                    start_index,
                    end_index,
                },
            }),
        )
        .await
    }
}

/// Internal helper types for serializing batch update requests.
#[derive(Serialize)]
struct BatchUpdate {
    requests: Vec<TabRequest>,
}

#[derive(Serialize)]
enum TabRequest {
    #[serde(rename = "addSheet")]
    AddSheet(AddSheet),
    #[serde(rename = "deleteDimension")]
    DeleteDimension(DeleteDimension),
}

#[derive(Serialize)]
struct AddSheet {
    properties: NewTabProperties,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTabProperties {
    title: String,
    grid_properties: GridProperties,
}

#[derive(Serialize)]
struct DeleteDimension {
    range: DimensionRange,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DimensionRange {
    sheet_id: i64,
    dimension: &'static str,
    start_index: u32,
    end_index: u32,
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn deserializes_table_metadata() {
        let metadata = serde_json::from_value::<TableMetadata>(json!({
            "spreadsheetId": "1x_8Jq6d",
            "properties": {"title": "household budget"},
            "sheets": [
                {
                    "properties": {
                        "sheetId": 0,
                        "title": "transactions",
                        "index": 0,
                        "gridProperties": {"rowCount": 1000, "columnCount": 26},
                    }
                },
                {
                    "properties": {"sheetId": 1444219712, "title": "categories"}
                }
            ]
        }))
        .unwrap();

        assert_eq!(metadata.spreadsheet_id, "1x_8Jq6d");
        assert_eq!(metadata.sheets.len(), 2);
        assert_eq!(metadata.sheets[0].properties.title, "transactions");
        assert_eq!(
            metadata.sheets[0].properties.grid_properties,
            Some(GridProperties {
                row_count: 1000,
                column_count: 26,
            })
        );
        assert_eq!(metadata.sheets[1].properties.sheet_id, 1444219712);
        assert_eq!(metadata.sheets[1].properties.grid_properties, None);
    }

    #[test]
    fn deserializes_value_range() {
        let values = serde_json::from_value::<ValueRange>(json!({
            "range": "transactions!A1:C3",
            "majorDimension": "ROWS",
            "values": [["date", "amount"], ["2024-01-01", "5"]],
        }))
        .unwrap();
        assert_eq!(
            values.values,
            vec![vec![json!("date"), json!("amount")], vec![
                json!("2024-01-01"),
                json!("5")
            ]]
        );

        // An empty tab comes back without a `values` field at all.
        let empty = serde_json::from_value::<ValueRange>(json!({
            "range": "empty!A1:C1",
            "majorDimension": "ROWS",
        }))
        .unwrap();
        assert!(empty.values.is_empty());
    }

    #[test]
    fn serializes_add_tab_request() {
        let request = BatchUpdate {
            requests: vec![TabRequest::AddSheet(AddSheet {
                properties: NewTabProperties {
                    title: "archive".to_string(),
                    grid_properties: GridProperties {
                        row_count: 100,
                        column_count: 5,
                    },
                },
            })],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "requests": [{
                    "addSheet": {
                        "properties": {
                            "title": "archive",
                            "gridProperties": {"rowCount": 100, "columnCount": 5},
                        }
                    }
                }]
            })
        );
    }

    #[test]
    fn serializes_delete_rows_request() {
        let request = BatchUpdate {
            requests: vec![TabRequest::DeleteDimension(DeleteDimension {
                range: DimensionRange {
                    sheet_id: 7,
                    dimension: "ROWS",
                    start_index: 1,
                    end_index: 4,
                },
            })],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "requests": [{
                    "deleteDimension": {
                        "range": {
                            "sheetId": 7,
                            "dimension": "ROWS",
                            "startIndex": 1,
                            "endIndex": 4,
                        }
                    }
                }]
            })
        );
    }

    #[test]
    fn escapes_range_url_segments() {
        let api = HttpSheetsApi::with_url(
            &HttpClientFactory::default(),
            Url::parse("https://example.com/v4/spreadsheets/").unwrap(),
            "token".to_string(),
        );
        let url = api.url(&["table", "values", "my tab!A1:C:append"]);
        assert_eq!(
            url.as_str(),
            "https://example.com/v4/spreadsheets/table/values/my%20tab!A1:C:append"
        );
    }

    #[tokio::test]
    async fn connection_failures_are_classified_transient() {
        // Nothing listens on this port, the connection is refused outright.
        let api = HttpSheetsApi::with_url(
            &HttpClientFactory::default(),
            Url::parse("http://127.0.0.1:1/").unwrap(),
            "token".to_string(),
        );
        let err = api.get_metadata("table").await.unwrap_err();
        assert!(matches!(err, ApiError::Send(_)));
        assert!(crate::error::RemoteError::from(err).is_transient());
    }

    #[tokio::test]
    #[ignore]
    async fn test_api_e2e() {
        let api = HttpSheetsApi::new(
            &HttpClientFactory::default(),
            std::env::var("SHEETS_AUTH_TOKEN").unwrap(),
        );
        let table_id = std::env::var("SHEETS_TABLE_ID").unwrap();
        let metadata = api.get_metadata(&table_id).await;
        dbg!(&metadata);
        assert!(metadata.is_ok());
    }
}

