//! LanceDB connection and housekeeping helpers.
//!
//! Opening the database, ensure-* helpers for tables, SQL literal quoting, and
//! the conversions between `IndexEntry` rows and Arrow record batches.
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, Int32Array, ListArray, RecordBatch, RecordBatchIterator, RecordBatchReader, StringArray,
    TimestampMillisecondArray,
};
use arrow_schema::{ArrowError, Schema};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::arrow::SendableRecordBatchStream;
use lancedb::{connect, Connection, Table};
use std::sync::Arc;

use vaultdb_core::types::IndexEntry;
use vaultdb_core::{Error, Result};

use crate::schema::build_entries_schema;

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(Error::storage)
}

/// Open `name`, creating it empty with `schema` if it does not exist yet.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<Schema>) -> Result<Table> {
    let names = conn.table_names().execute().await.map_err(Error::storage)?;
    if !names.iter().any(|n| n == name) {
        let iter = RecordBatchIterator::new(Vec::<std::result::Result<RecordBatch, ArrowError>>::new(), schema.clone());
        conn.create_table(name, Box::new(iter)).execute().await.map_err(Error::storage)?;
    }
    conn.open_table(name).execute().await.map_err(Error::storage)
}

/// Quote a string as a SQL literal for Lance filter expressions.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn doc_filter(doc_id: &str) -> String {
    format!("doc_id = {}", sql_literal(doc_id))
}

pub fn vector_array<'a, I>(vectors: I) -> ListArray
where
    I: IntoIterator<Item = &'a Vec<f32>>,
{
    ListArray::from_iter_primitive::<Float32Type, _, _>(
        vectors.into_iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>())),
    )
}

pub fn entries_to_record_batch(entries: &[IndexEntry]) -> Result<RecordBatch> {
    let now = Utc::now().timestamp_millis();
    let mut chunk_ids = Vec::with_capacity(entries.len());
    let mut doc_ids = Vec::with_capacity(entries.len());
    let mut ordinals = Vec::with_capacity(entries.len());
    let mut contents = Vec::with_capacity(entries.len());
    let mut hashes = Vec::with_capacity(entries.len());
    let mut embedder_ids = Vec::with_capacity(entries.len());
    for e in entries {
        chunk_ids.push(e.chunk_id.as_str());
        doc_ids.push(e.doc_id.as_str());
        ordinals.push(i32::try_from(e.ordinal).map_err(|_| Error::Storage(format!("ordinal {} out of range", e.ordinal)))?);
        contents.push(e.content.as_str());
        hashes.push(e.content_hash.as_str());
        embedder_ids.push(e.embedder_id.as_str());
    }
    RecordBatch::try_new(
        build_entries_schema(),
        vec![
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(Int32Array::from(ordinals)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(hashes)),
            Arc::new(StringArray::from(embedder_ids)),
            Arc::new(vector_array(entries.iter().map(|e| &e.vector))),
            Arc::new(TimestampMillisecondArray::from(vec![now; entries.len()])),
        ],
    )
    .map_err(Error::storage)
}

pub fn batch_reader(batch: RecordBatch) -> Box<dyn RecordBatchReader + Send> {
    let schema = batch.schema();
    Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema))
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Storage(format!("column {name} missing or not utf8")))
}

pub fn record_batch_to_entries(batch: &RecordBatch) -> Result<Vec<IndexEntry>> {
    let chunk_ids = string_column(batch, "chunk_id")?;
    let doc_ids = string_column(batch, "doc_id")?;
    let contents = string_column(batch, "content")?;
    let hashes = string_column(batch, "content_hash")?;
    let embedder_ids = string_column(batch, "embedder_id")?;
    let ordinals = batch
        .column_by_name("ordinal")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| Error::Storage("column ordinal missing or not int32".into()))?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<ListArray>())
        .ok_or_else(|| Error::Storage("column vector missing or not a list".into()))?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let vector = if vectors.is_valid(i) {
            vectors.value(i).as_primitive::<Float32Type>().values().to_vec()
        } else {
            Vec::new()
        };
        let ordinal = usize::try_from(ordinals.value(i)).map_err(|_| {
            Error::Storage(format!("chunk {} has negative ordinal {}", chunk_ids.value(i), ordinals.value(i)))
        })?;
        out.push(IndexEntry {
            chunk_id: chunk_ids.value(i).to_string(),
            doc_id: doc_ids.value(i).to_string(),
            ordinal,
            content: contents.value(i).to_string(),
            content_hash: hashes.value(i).to_string(),
            embedder_id: embedder_ids.value(i).to_string(),
            vector,
        });
    }
    Ok(out)
}

/// Drain a query stream into entries.
pub async fn collect_entries(mut stream: SendableRecordBatchStream) -> Result<Vec<IndexEntry>> {
    let mut out = Vec::new();
    while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
        out.extend(record_batch_to_entries(&batch)?);
    }
    Ok(out)
}
