use std::sync::Arc;

use bytes::Bytes;
use csv::ReaderBuilder;
use polars::prelude::*;
use salesflow_bucket::BucketStore;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::layout::StorageLayout;
use crate::schema::TableSpec;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// Parses header-delimited UTF-8 text into a frame of nullable string columns.
///
/// Empty cells become nulls. A row whose field count differs from the header
/// is an error.
pub fn decode_csv(text: &str) -> Result<DataFrame> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (idx, field) in record.iter().enumerate() {
            let cell = if field.is_empty() {
                None
            } else {
                Some(field.to_string())
            };
            values[idx].push(cell);
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(values)
        .map(|(name, cells)| Column::from(Series::new(name.as_str().into(), cells)))
        .collect();

    Ok(DataFrame::new(columns)?)
}

pub fn encode_csv(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut clone = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut clone)?;
    Ok(buffer)
}

/// Table-level access to the lake: reads from the bronze tier, writes to the silver tier.
#[derive(Clone)]
pub struct TableStore {
    bucket: Arc<dyn BucketStore>,
    layout: StorageLayout,
}

impl TableStore {
    pub fn new(bucket: Arc<dyn BucketStore>, layout: StorageLayout) -> Self {
        Self { bucket, layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub async fn read_table(&self, file_name: &str) -> Result<DataFrame> {
        let key = self.layout.bronze_key(file_name);
        debug!(%key, "reading table");
        let bytes = self.bucket.get_object(&key).await?;
        let text = std::str::from_utf8(&bytes).map_err(|source| EtlError::Decode {
            key: key.clone(),
            source,
        })?;
        let df = decode_csv(text)?;
        info!(%key, rows = df.height(), columns = df.width(), "table loaded");
        Ok(df)
    }

    /// Reads `spec.file_name` and applies the declared column types.
    pub async fn read_typed(&self, spec: &TableSpec) -> Result<DataFrame> {
        let df = self.read_table(spec.file_name).await?;
        spec.conform(df)
    }

    /// Uploads `df` as CSV, replacing any existing object. Returns the object key.
    pub async fn write_table(&self, df: &DataFrame, file_name: &str) -> Result<String> {
        let key = self.layout.silver_key(file_name);
        let payload = encode_csv(df)?;
        self.bucket
            .put_object(&key, Bytes::from(payload), CSV_CONTENT_TYPE)
            .await?;
        info!(%key, rows = df.height(), "table written");
        Ok(key)
    }
}
