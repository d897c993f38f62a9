//! CSV serialization of Arrow record batches
//!
//! Files carry a header row. When the row index is kept, it is written as a
//! leading unnamed column of 0-based row numbers.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, UInt64Array};
use arrow::compute::concat_batches;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::Result;

/// Write `batch` as CSV to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns error if the file cannot be created or a column type has no CSV
/// representation
pub fn write_csv(batch: &RecordBatch, path: &Path, strip_row_index: bool) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);

    if strip_row_index {
        writer.write(batch)?;
    } else {
        writer.write(&with_row_index(batch)?)?;
    }
    Ok(())
}

/// Read a CSV file with a header row into a single batch of `schema`.
///
/// # Errors
///
/// Returns error if the file cannot be opened or a value does not parse as
/// its column type
pub fn read_csv(path: &Path, schema: SchemaRef) -> Result<RecordBatch> {
    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(File::open(path)?)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Prepend an unnamed `UInt64` column holding the row numbers.
fn with_row_index(batch: &RecordBatch) -> Result<RecordBatch> {
    let index: ArrayRef = Arc::new(UInt64Array::from_iter_values(0..batch.num_rows() as u64));

    let mut fields: Vec<FieldRef> = vec![Arc::new(Field::new("", DataType::UInt64, false))];
    fields.extend(batch.schema().fields().iter().cloned());

    let mut columns = vec![index];
    columns.extend(batch.columns().iter().cloned());

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
