use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Vectors are variable-length lists: the store accepts whatever dimension
/// the embedding service returns.
pub fn vector_type() -> DataType {
	DataType::List(Arc::new(Field::new("item", DataType::Float32, true)))
}

pub fn build_entries_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("chunk_id", DataType::Utf8, false),
		Field::new("doc_id", DataType::Utf8, false),
		Field::new("ordinal", DataType::Int32, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("embedder_id", DataType::Utf8, false),
		Field::new("vector", vector_type(), false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}

pub fn build_cache_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("embedder_id", DataType::Utf8, false),
		Field::new("vector", vector_type(), false),
		Field::new("created_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
