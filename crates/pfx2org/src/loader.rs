//! Source-table loading
//!
//! Reads the prefix→organization table from a Parquet file into
//! [`PrefixRecord`]s using the sync Arrow record-batch reader. The core only
//! requires a sequence of homogeneous records; this module is the one place
//! that knows the on-disk format.
//!
//! The prefix column must be a string column. The owner column is optional —
//! when absent every record loads with `owner == None` and organization
//! search matches nothing. All other columns pass through opaquely as typed
//! [`AttrValue`]s in schema order.

use crate::error::LoadError;
use crate::record::{AttrValue, PrefixRecord};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default name of the CIDR prefix column.
pub const DEFAULT_PREFIX_COLUMN: &str = "prefix";

/// Default name of the organization-owner column, as produced by the
/// upstream dataset.
pub const DEFAULT_OWNER_COLUMN: &str = "Direct Owner (DO)";

const DEFAULT_BATCH_SIZE: usize = 8192;

/// Column mapping and read options for the source table.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Name of the CIDR prefix column
    pub prefix_column: String,
    /// Name of the organization-owner column
    pub owner_column: String,
    /// Rows per Arrow record batch
    pub batch_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            prefix_column: DEFAULT_PREFIX_COLUMN.to_string(),
            owner_column: DEFAULT_OWNER_COLUMN.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl TableConfig {
    /// Configuration with the upstream dataset's column names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the prefix column name.
    pub fn with_prefix_column(mut self, name: impl Into<String>) -> Self {
        self.prefix_column = name.into();
        self
    }

    /// Override the owner column name.
    pub fn with_owner_column(mut self, name: impl Into<String>) -> Self {
        self.owner_column = name.into();
        self
    }

    /// Override the record-batch size.
    pub fn with_batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }
}

/// Load the full prefix table into memory.
///
/// Fails when the file is missing or unreadable, or when the prefix column
/// is absent or not a string column. Rows with a null prefix cell are
/// skipped with a warning; validating the dataset's contents beyond that is
/// out of scope here.
pub fn load_prefix_table(path: &Path, config: &TableConfig) -> Result<Vec<PrefixRecord>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();

    let prefix_idx = schema
        .fields()
        .iter()
        .position(|f| f.name() == &config.prefix_column)
        .ok_or_else(|| LoadError::MissingColumn(config.prefix_column.clone()))?;

    let owner_idx = schema
        .fields()
        .iter()
        .position(|f| f.name() == &config.owner_column);
    if owner_idx.is_none() {
        warn!(
            column = %config.owner_column,
            "owner column absent; organization search will match nothing"
        );
    }

    let reader = builder.with_batch_size(config.batch_size).build()?;

    let mut records = Vec::new();
    let mut null_prefixes = 0usize;
    for batch in reader {
        let batch = batch?;
        append_batch(&batch, prefix_idx, owner_idx, &mut records, &mut null_prefixes)?;
    }

    if null_prefixes > 0 {
        warn!(rows = null_prefixes, "skipped rows with a null prefix cell");
    }
    info!(
        path = %path.display(),
        rows = records.len(),
        "loaded prefix table"
    );
    Ok(records)
}

/// View over the two Arrow string encodings a key column may use.
enum StrColumn<'a> {
    Utf8(&'a StringArray),
    LargeUtf8(&'a LargeStringArray),
}

impl StrColumn<'_> {
    fn value(&self, row: usize) -> Option<&str> {
        match self {
            StrColumn::Utf8(array) => (!array.is_null(row)).then(|| array.value(row)),
            StrColumn::LargeUtf8(array) => (!array.is_null(row)).then(|| array.value(row)),
        }
    }
}

fn string_column(batch: &RecordBatch, idx: usize) -> Result<StrColumn<'_>, LoadError> {
    let column = batch.column(idx);
    match column.data_type() {
        DataType::Utf8 => column
            .as_any()
            .downcast_ref::<StringArray>()
            .map(StrColumn::Utf8),
        DataType::LargeUtf8 => column
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(StrColumn::LargeUtf8),
        _ => None,
    }
    .ok_or_else(|| LoadError::BadColumnType {
        column: batch.schema().field(idx).name().clone(),
        datatype: column.data_type().to_string(),
    })
}

fn append_batch(
    batch: &RecordBatch,
    prefix_idx: usize,
    owner_idx: Option<usize>,
    out: &mut Vec<PrefixRecord>,
    null_prefixes: &mut usize,
) -> Result<(), LoadError> {
    let prefix_col = string_column(batch, prefix_idx)?;

    // A non-string owner column is treated as absent rather than fatal.
    let owner_col = match owner_idx {
        Some(idx) => match string_column(batch, idx) {
            Ok(col) => Some(col),
            Err(err) => {
                warn!(%err, "owner column is not a string column; ignoring it");
                None
            }
        },
        None => None,
    };

    let schema = batch.schema();
    for row in 0..batch.num_rows() {
        let Some(prefix) = prefix_col.value(row) else {
            *null_prefixes += 1;
            continue;
        };
        let owner = owner_col
            .as_ref()
            .and_then(|col| col.value(row))
            .map(str::to_string);

        let mut attrs = Vec::with_capacity(batch.num_columns().saturating_sub(2));
        for (idx, field) in schema.fields().iter().enumerate() {
            if idx == prefix_idx || Some(idx) == owner_idx {
                continue;
            }
            attrs.push((field.name().clone(), attr_value(batch.column(idx), row)));
        }

        out.push(PrefixRecord {
            prefix: prefix.to_string(),
            owner,
            attrs,
        });
    }
    Ok(())
}

/// Convert one cell to an [`AttrValue`].
///
/// Directly typed for the common Arrow types; anything else falls back to
/// its display string so no column is ever dropped.
fn attr_value(column: &ArrayRef, row: usize) -> AttrValue {
    if column.is_null(row) {
        return AttrValue::Null;
    }

    let any = column.as_any();
    let typed = match column.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| AttrValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| AttrValue::String(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| AttrValue::Int(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| AttrValue::Int(a.value(row))),
        DataType::UInt32 => any
            .downcast_ref::<UInt32Array>()
            .map(|a| AttrValue::Uint(u64::from(a.value(row)))),
        DataType::UInt64 => any
            .downcast_ref::<UInt64Array>()
            .map(|a| AttrValue::Uint(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| AttrValue::Double(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| AttrValue::Double(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| AttrValue::Bool(a.value(row))),
        _ => None,
    };

    typed.unwrap_or_else(|| match array_value_to_string(column, row) {
        Ok(rendered) => AttrValue::String(rendered),
        Err(err) => {
            debug!(%err, "cell not renderable; storing null");
            AttrValue::Null
        }
    })
}
