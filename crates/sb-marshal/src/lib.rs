mod reader;
mod value;
mod writer;
pub mod zlib;

pub use reader::read_value;
pub use value::{MarshalString, MarshalValue, StringEncoding};
pub use writer::write_value;

use sb_core::{BundleError, Record, RecordSerializer};
use thiserror::Error;

pub const MARSHAL_MAJOR: u8 = 4;
pub const MARSHAL_MINOR: u8 = 8;

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("Unsupported marshal version {major}.{minor}.")]
    BadVersion { major: u8, minor: u8 },
    #[error("Unexpected end of data at offset {offset}.")]
    UnexpectedEnd { offset: usize },
    #[error("Unsupported type tag 0x{tag:02x} at offset {offset}.")]
    UnsupportedTag { offset: usize, tag: u8 },
    #[error("Link {index} at offset {offset} points to nothing.")]
    BadLink { offset: usize, index: usize },
    #[error("Negative length {len} at offset {offset}.")]
    NegativeLength { offset: usize, len: i64 },
    #[error("Nesting too deep at offset {offset}.")]
    TooDeep { offset: usize },
    #[error("Integer out of range at offset {offset}.")]
    IntegerRange { offset: usize },
    #[error("Expected {expected} at offset {offset}, found {found}.")]
    UnexpectedValue {
        offset: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Record {index} is malformed: {detail}")]
    RecordShape { index: usize, detail: String },
    #[error("Zlib stream error: {0}")]
    Zlib(#[source] std::io::Error),
}

impl From<MarshalError> for BundleError {
    fn from(error: MarshalError) -> Self {
        BundleError::corrupt(error.to_string())
    }
}

/// Marshal-backed record array, the on-disk form of `Scripts.*data`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarshalSerializer {
    pub name_encoding: StringEncoding,
}

impl MarshalSerializer {
    pub fn new(name_encoding: StringEncoding) -> Self {
        Self { name_encoding }
    }
}

impl RecordSerializer for MarshalSerializer {
    fn encode(&self, records: &[Record]) -> Result<Vec<u8>, BundleError> {
        let value = records_to_value(records, self.name_encoding);
        write_value(&value).map_err(|error| BundleError::persist(error.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Record>, BundleError> {
        let value = read_value(bytes)?;
        Ok(records_from_value(value)?)
    }

    fn encode_record(&self, record: &Record) -> Result<Vec<u8>, BundleError> {
        let value = record_to_value(record, self.name_encoding);
        write_value(&value).map_err(|error| BundleError::persist(error.to_string()))
    }

    fn decode_record(&self, bytes: &[u8]) -> Result<Record, BundleError> {
        let value = read_value(bytes)?;
        Ok(record_from_value(0, value)?)
    }
}

pub fn records_to_value(records: &[Record], name_encoding: StringEncoding) -> MarshalValue {
    MarshalValue::Array(
        records
            .iter()
            .map(|record| record_to_value(record, name_encoding))
            .collect(),
    )
}

pub fn record_to_value(record: &Record, name_encoding: StringEncoding) -> MarshalValue {
    MarshalValue::Array(vec![
        MarshalValue::Int(i64::from(record.key)),
        MarshalValue::Str(MarshalString {
            bytes: record.name.as_bytes().to_vec(),
            encoding: name_encoding,
        }),
        MarshalValue::raw_string(record.payload.clone()),
    ])
}

pub fn records_from_value(value: MarshalValue) -> Result<Vec<Record>, MarshalError> {
    let items = match value {
        MarshalValue::Array(items) => items,
        other => {
            return Err(MarshalError::RecordShape {
                index: 0,
                detail: format!("top level is {}, expected array", other.type_name()),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| record_from_value(index, item))
        .collect()
}

pub fn record_from_value(index: usize, item: MarshalValue) -> Result<Record, MarshalError> {
    let shape_error = |detail: String| MarshalError::RecordShape { index, detail };

    let fields = match item {
        MarshalValue::Array(fields) => fields,
        other => return Err(shape_error(format!("{} instead of array", other.type_name()))),
    };
    let [key, name, payload]: [MarshalValue; 3] = fields
        .try_into()
        .map_err(|fields: Vec<MarshalValue>| shape_error(format!("{} fields", fields.len())))?;

    let key = match key {
        MarshalValue::Int(key) => i32::try_from(key)
            .map_err(|_| shape_error(format!("key {} out of range", key)))?,
        other => return Err(shape_error(format!("key is {}", other.type_name()))),
    };
    let name = match name {
        MarshalValue::Str(name) => match String::from_utf8(name.bytes) {
            Ok(name) => name,
            Err(error) => {
                log::warn!("record {} has a non UTF-8 name, decoding lossily", index);
                String::from_utf8_lossy(error.as_bytes()).into_owned()
            }
        },
        other => return Err(shape_error(format!("name is {}", other.type_name()))),
    };
    let payload = match payload {
        MarshalValue::Str(payload) => payload.bytes,
        other => return Err(shape_error(format!("payload is {}", other.type_name()))),
    };

    Ok(Record { key, name, payload })
}
