//! Compressed on-disk container for named arrays.
//!
//! The payload is a JSON document compressed with zstd. Floats are stored as
//! shortest round-trip strings so NaN and infinities survive.

use super::{ArrayData, DType, NdArray};
use crate::capability::Backend;
use crate::domain::{RegressionError, RegressionResult};
use crate::numerics::format_f64_repr;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const ARCHIVE_EXTENSION: &str = ".ndz";
const ARCHIVE_FORMAT: &str = "regressions-ndarrays";
const ARCHIVE_VERSION: u32 = 1;
const FIXTURE: &str = "ndarrays";
#[cfg(feature = "ndarrays")]
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct StoredArchive {
    format: String,
    version: u32,
    arrays: BTreeMap<String, StoredArray>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredArray {
    dtype: String,
    shape: Vec<usize>,
    data: Value,
}

pub fn write_archive(path: &Path, arrays: &BTreeMap<String, NdArray>) -> RegressionResult<()> {
    Backend::Zstd.require(FIXTURE)?;
    let stored = StoredArchive {
        format: ARCHIVE_FORMAT.to_string(),
        version: ARCHIVE_VERSION,
        arrays: arrays
            .iter()
            .map(|(name, array)| (name.clone(), store_array(array)))
            .collect(),
    };
    let json = serde_json::to_vec(&stored)
        .map_err(|error| RegressionError::Serialization(error.to_string()))?;
    let compressed = compress(&json)?;
    fs::write(path, compressed).map_err(|source| RegressionError::io("write", path, source))
}

pub fn read_archive(path: &Path) -> RegressionResult<BTreeMap<String, NdArray>> {
    Backend::Zstd.require(FIXTURE)?;
    let bytes = fs::read(path).map_err(|source| RegressionError::io("read", path, source))?;
    let json = decompress(&bytes).map_err(|reason| RegressionError::corrupt(path, reason))?;
    let stored: StoredArchive =
        serde_json::from_slice(&json).map_err(|error| RegressionError::corrupt(path, error))?;
    if stored.format != ARCHIVE_FORMAT || stored.version != ARCHIVE_VERSION {
        return Err(RegressionError::corrupt(
            path,
            format!("unsupported archive {} v{}", stored.format, stored.version),
        ));
    }

    stored
        .arrays
        .into_iter()
        .map(|(name, array)| {
            let loaded = load_array(array).map_err(|reason| {
                RegressionError::corrupt(path, format!("array '{name}': {reason}"))
            })?;
            Ok((name, loaded))
        })
        .collect()
}

#[cfg(feature = "ndarrays")]
fn compress(bytes: &[u8]) -> RegressionResult<Vec<u8>> {
    zstd::encode_all(bytes, COMPRESSION_LEVEL)
        .map_err(|error| RegressionError::Serialization(error.to_string()))
}

#[cfg(not(feature = "ndarrays"))]
fn compress(_bytes: &[u8]) -> RegressionResult<Vec<u8>> {
    Err(Backend::Zstd.unavailable(FIXTURE))
}

#[cfg(feature = "ndarrays")]
fn decompress(bytes: &[u8]) -> Result<Vec<u8>, String> {
    zstd::decode_all(bytes).map_err(|error| error.to_string())
}

#[cfg(not(feature = "ndarrays"))]
fn decompress(_bytes: &[u8]) -> Result<Vec<u8>, String> {
    Err(Backend::Zstd.unavailable(FIXTURE).to_string())
}

fn store_array(array: &NdArray) -> StoredArray {
    let data = match array.data() {
        ArrayData::Bool(values) => Value::from(values.clone()),
        ArrayData::Int(values) | ArrayData::Ticks(values) => Value::from(values.clone()),
        ArrayData::UInt(values) => Value::from(values.clone()),
        ArrayData::Float(values) => {
            Value::from(values.iter().map(|value| format_f64_repr(*value)).collect::<Vec<_>>())
        }
        ArrayData::Complex(values) => Value::from(
            values
                .iter()
                .map(|value| Value::from(vec![format_f64_repr(value.re), format_f64_repr(value.im)]))
                .collect::<Vec<_>>(),
        ),
        ArrayData::Unicode(values) => Value::from(values.clone()),
        ArrayData::Raw(values) => Value::from(
            values
                .iter()
                .map(|value| Value::from(value.clone()))
                .collect::<Vec<_>>(),
        ),
    };
    StoredArray {
        dtype: array.dtype().code(),
        shape: array.shape().to_vec(),
        data,
    }
}

fn load_array(stored: StoredArray) -> Result<NdArray, String> {
    use super::ElementKind;

    let dtype = DType::from_code(&stored.dtype)
        .ok_or_else(|| format!("unknown dtype '{}'", stored.dtype))?;
    let data = match dtype.kind {
        ElementKind::Bool => ArrayData::Bool(decode(stored.data)?),
        ElementKind::Int => ArrayData::Int(decode(stored.data)?),
        ElementKind::UInt => ArrayData::UInt(decode(stored.data)?),
        ElementKind::DateTime | ElementKind::TimeDelta => ArrayData::Ticks(decode(stored.data)?),
        ElementKind::Float => {
            let texts: Vec<String> = decode(stored.data)?;
            ArrayData::Float(texts.iter().map(|text| parse_float(text)).collect::<Result<_, _>>()?)
        }
        ElementKind::Complex => {
            let pairs: Vec<(String, String)> = decode(stored.data)?;
            ArrayData::Complex(
                pairs
                    .iter()
                    .map(|(re, im)| Ok(Complex64::new(parse_float(re)?, parse_float(im)?)))
                    .collect::<Result<_, String>>()?,
            )
        }
        ElementKind::Unicode => ArrayData::Unicode(decode(stored.data)?),
        ElementKind::Bytes | ElementKind::Object | ElementKind::Void => {
            ArrayData::Raw(decode(stored.data)?)
        }
    };
    NdArray::from_raw(dtype, stored.shape, data).map_err(|error| error.to_string())
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|error| error.to_string())
}

fn parse_float(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .map_err(|_| format!("invalid float literal '{text}'"))
}
