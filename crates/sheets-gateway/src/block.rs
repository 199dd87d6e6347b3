use {
    crate::error::GatewayError,
    serde_json::Value,
};

/// A rectangular block of tabular data: named columns plus row-major cell
/// values. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularBlock {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TabularBlock {
    /// Builds a block from caller provided data. Ragged rows are rejected.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, GatewayError> {
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(GatewayError::Precondition(format!(
                "ragged block: row has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Builds a block from rows fetched from the remote service, which trims
    /// trailing empty cells. Short rows are padded with nulls; rows wider
    /// than the header indicate a malformed tab and are rejected.
    pub fn from_remote(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, GatewayError> {
        let mut padded = rows;
        for row in &mut padded {
            if row.len() > columns.len() {
                return Err(GatewayError::Precondition(format!(
                    "malformed tab: row has {} cells but the header has {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            row.resize(columns.len(), Value::Null);
        }
        Ok(Self {
            columns,
            rows: padded,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of data rows, excluding the header.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts the block into the remote service's nested array wire
    /// format, optionally prefixed with the column-name row.
    pub fn to_wire_rows(&self, include_header: bool) -> Vec<Vec<Value>> {
        let mut wire = Vec::with_capacity(self.rows.len() + usize::from(include_header));
        if include_header {
            wire.push(
                self.columns
                    .iter()
                    .map(|column| Value::String(column.clone()))
                    .collect(),
            );
        }
        wire.extend(self.rows.iter().cloned());
        wire
    }
}
