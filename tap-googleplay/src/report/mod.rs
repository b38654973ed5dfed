//! Report decoding and record shaping.
//!
//! Play Console exports are UTF-16LE CSV files. [`decode_report`] turns one
//! export into header-keyed rows and [`RecordShaper`] maps each row onto the
//! stream schema.

mod decoder;
mod shaper;

pub use decoder::{decode_report, decode_utf16le, normalize_header, DecodedReport, DecodedRow, UTF16_LE_BOM};
pub use shaper::{
    coerce_record, coerce_value, Record, RecordShaper, DIMENSION_COLUMN_INDEX, DIMENSION_NAME_FIELD,
    DIMENSION_VALUE_FIELD,
};
