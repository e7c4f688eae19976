pub mod archive;

use crate::numerics::{format_f32_repr, format_f64_repr};
use num_complex::{Complex, Complex32, Complex64};
use std::fmt::{self, Display, Formatter};

/// Element category, following the one-letter kind codes of array libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Bool,
    Int,
    UInt,
    Float,
    Complex,
    Unicode,
    Bytes,
    Object,
    DateTime,
    TimeDelta,
    Void,
}

impl ElementKind {
    pub const fn code(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::Int => 'i',
            Self::UInt => 'u',
            Self::Float => 'f',
            Self::Complex => 'c',
            Self::Unicode => 'U',
            Self::Bytes => 'S',
            Self::Object => 'O',
            Self::DateTime => 'M',
            Self::TimeDelta => 'm',
            Self::Void => 'V',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        let kind = match code {
            'b' => Self::Bool,
            'i' => Self::Int,
            'u' => Self::UInt,
            'f' => Self::Float,
            'c' => Self::Complex,
            'U' => Self::Unicode,
            'S' => Self::Bytes,
            'O' => Self::Object,
            'M' => Self::DateTime,
            'm' => Self::TimeDelta,
            'V' => Self::Void,
            _ => return None,
        };
        Some(kind)
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::UInt | Self::Float | Self::Complex)
    }

    pub const fn is_inexact(self) -> bool {
        matches!(self, Self::Float | Self::Complex)
    }

    /// Kinds the tabular and N-D fixtures accept.
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::UInt | Self::Float | Self::Complex | Self::Unicode
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DType {
    pub kind: ElementKind,
    /// Bytes per element; characters per element for unicode.
    pub item_size: usize,
}

impl DType {
    pub const BOOL: Self = Self::new(ElementKind::Bool, 1);
    pub const INT64: Self = Self::new(ElementKind::Int, 8);
    pub const UINT64: Self = Self::new(ElementKind::UInt, 8);
    pub const FLOAT32: Self = Self::new(ElementKind::Float, 4);
    pub const FLOAT64: Self = Self::new(ElementKind::Float, 8);
    pub const COMPLEX128: Self = Self::new(ElementKind::Complex, 16);

    pub const fn new(kind: ElementKind, item_size: usize) -> Self {
        Self { kind, item_size }
    }

    pub const fn unicode(chars: usize) -> Self {
        Self::new(ElementKind::Unicode, chars)
    }

    /// Two dtypes can be compared element-wise: identical, both numeric or
    /// both unicode text.
    pub fn is_compatible_with(&self, other: &DType) -> bool {
        self == other
            || (self.kind.is_numeric() && other.kind.is_numeric())
            || (self.kind == ElementKind::Unicode && other.kind == ElementKind::Unicode)
    }

    /// Compact code used in archives, e.g. `f8`, `U5`, `b1`.
    pub fn code(&self) -> String {
        format!("{}{}", self.kind.code(), self.item_size)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let kind = ElementKind::from_code(chars.next()?)?;
        let item_size = chars.as_str().parse().ok()?;
        Some(Self::new(kind, item_size))
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let bits = self.item_size * 8;
        match self.kind {
            ElementKind::Bool => f.write_str("bool"),
            ElementKind::Int => write!(f, "int{bits}"),
            ElementKind::UInt => write!(f, "uint{bits}"),
            ElementKind::Float => write!(f, "float{bits}"),
            ElementKind::Complex => write!(f, "complex{bits}"),
            ElementKind::Unicode => write!(f, "<U{}", self.item_size),
            ElementKind::Bytes => write!(f, "|S{}", self.item_size),
            ElementKind::Object => f.write_str("object"),
            ElementKind::DateTime => f.write_str("datetime64"),
            ElementKind::TimeDelta => f.write_str("timedelta64"),
            ElementKind::Void => write!(f, "|V{}", self.item_size),
        }
    }
}

/// Flat row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    Complex(Vec<Complex64>),
    Unicode(Vec<String>),
    /// Raw per-element payloads for byte strings, objects and structured data.
    Raw(Vec<Vec<u8>>),
    /// Datetime and timedelta ticks.
    Ticks(Vec<i64>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(values) => values.len(),
            Self::Int(values) | Self::Ticks(values) => values.len(),
            Self::UInt(values) => values.len(),
            Self::Float(values) => values.len(),
            Self::Complex(values) => values.len(),
            Self::Unicode(values) => values.len(),
            Self::Raw(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches_kind(&self, kind: ElementKind) -> bool {
        matches!(
            (self, kind),
            (Self::Bool(_), ElementKind::Bool)
                | (Self::Int(_), ElementKind::Int)
                | (Self::UInt(_), ElementKind::UInt)
                | (Self::Float(_), ElementKind::Float)
                | (Self::Complex(_), ElementKind::Complex)
                | (Self::Unicode(_), ElementKind::Unicode)
                | (
                    Self::Raw(_),
                    ElementKind::Bytes | ElementKind::Object | ElementKind::Void
                )
                | (Self::Ticks(_), ElementKind::DateTime | ElementKind::TimeDelta)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayError {
    #[error("shape {} requires {expected} elements but {actual} were given", format_shape(.shape))]
    Length {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("storage does not hold elements of dtype '{dtype}'")]
    Storage { dtype: DType },
}

/// Values that can populate an [`NdArray`].
pub trait Element: Sized {
    fn dtype_of(values: &[Self]) -> DType;
    fn into_data(values: Vec<Self>) -> ArrayData;
}

macro_rules! int_element {
    ($variant:ident, $target:ty, $($ty:ty => $size:expr),+) => {
        $(
            impl Element for $ty {
                fn dtype_of(_: &[Self]) -> DType {
                    DType::new(ElementKind::$variant, $size)
                }

                fn into_data(values: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(values.into_iter().map(<$target>::from).collect())
                }
            }
        )+
    };
}

int_element!(Int, i64, i8 => 1, i16 => 2, i32 => 4, i64 => 8);
int_element!(UInt, u64, u8 => 1, u16 => 2, u32 => 4, u64 => 8);

impl Element for bool {
    fn dtype_of(_: &[Self]) -> DType {
        DType::BOOL
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Bool(values)
    }
}

impl Element for f32 {
    fn dtype_of(_: &[Self]) -> DType {
        DType::FLOAT32
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Float(values.into_iter().map(f64::from).collect())
    }
}

impl Element for f64 {
    fn dtype_of(_: &[Self]) -> DType {
        DType::FLOAT64
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Float(values)
    }
}

impl Element for Complex32 {
    fn dtype_of(_: &[Self]) -> DType {
        DType::new(ElementKind::Complex, 8)
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Complex(
            values
                .into_iter()
                .map(|value| Complex::new(f64::from(value.re), f64::from(value.im)))
                .collect(),
        )
    }
}

impl Element for Complex64 {
    fn dtype_of(_: &[Self]) -> DType {
        DType::COMPLEX128
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Complex(values)
    }
}

impl Element for String {
    fn dtype_of(values: &[Self]) -> DType {
        DType::unicode(
            values
                .iter()
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0)
                .max(1),
        )
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Unicode(values)
    }
}

impl Element for &str {
    fn dtype_of(values: &[Self]) -> DType {
        DType::unicode(
            values
                .iter()
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0)
                .max(1),
        )
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Unicode(values.into_iter().map(str::to_string).collect())
    }
}

/// Dense N-dimensional array. An empty shape is a scalar holding one element.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        let dtype = T::dtype_of(&values);
        let shape = vec![values.len()];
        Self {
            dtype,
            shape,
            data: T::into_data(values),
        }
    }

    pub fn from_shape_vec<T: Element>(shape: Vec<usize>, values: Vec<T>) -> Result<Self, ArrayError> {
        let dtype = T::dtype_of(&values);
        Self::from_raw(dtype, shape, T::into_data(values))
    }

    pub fn scalar<T: Element>(value: T) -> Self {
        let values = vec![value];
        Self {
            dtype: T::dtype_of(&values),
            shape: Vec::new(),
            data: T::into_data(values),
        }
    }

    pub fn from_raw(dtype: DType, shape: Vec<usize>, data: ArrayData) -> Result<Self, ArrayError> {
        if !data.matches_kind(dtype.kind) {
            return Err(ArrayError::Storage { dtype });
        }
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(ArrayError::Length {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    pub fn datetime64(shape: Vec<usize>, ticks: Vec<i64>) -> Result<Self, ArrayError> {
        Self::from_raw(DType::new(ElementKind::DateTime, 8), shape, ArrayData::Ticks(ticks))
    }

    pub fn timedelta64(shape: Vec<usize>, ticks: Vec<i64>) -> Result<Self, ArrayError> {
        Self::from_raw(DType::new(ElementKind::TimeDelta, 8), shape, ArrayData::Ticks(ticks))
    }

    pub fn byte_strings(shape: Vec<usize>, values: Vec<Vec<u8>>) -> Result<Self, ArrayError> {
        let item_size = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        Self::from_raw(DType::new(ElementKind::Bytes, item_size), shape, ArrayData::Raw(values))
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Promotes a scalar to a one-element 1-D array.
    pub fn at_least_1d(mut self) -> Self {
        if self.shape.is_empty() {
            self.shape = vec![1];
        }
        self
    }

    /// Coordinates of the element at `flat` in row-major order.
    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        let mut coords = vec![0; self.shape.len()];
        let mut remainder = flat;
        for (axis, extent) in self.shape.iter().enumerate().rev() {
            if *extent == 0 {
                continue;
            }
            coords[axis] = remainder % extent;
            remainder /= extent;
        }
        coords
    }

    pub fn scalar_at(&self, flat: usize) -> Option<Scalar> {
        let scalar = match &self.data {
            ArrayData::Bool(values) => Scalar::Bool(*values.get(flat)?),
            ArrayData::Int(values) => Scalar::Int(*values.get(flat)?),
            ArrayData::UInt(values) => Scalar::UInt(*values.get(flat)?),
            ArrayData::Float(values) if self.dtype.item_size <= 4 => {
                Scalar::Float32(*values.get(flat)? as f32)
            }
            ArrayData::Float(values) => Scalar::Float(*values.get(flat)?),
            ArrayData::Complex(values) => Scalar::Complex(*values.get(flat)?),
            ArrayData::Unicode(values) => Scalar::Text(values.get(flat)?.clone()),
            ArrayData::Raw(values) => Scalar::Raw(values.get(flat)?.clone()),
            ArrayData::Ticks(values) => Scalar::Int(*values.get(flat)?),
        };
        Some(scalar)
    }
}

impl<T: Element> From<Vec<T>> for NdArray {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

macro_rules! scalar_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for NdArray {
                fn from(value: $ty) -> Self {
                    Self::scalar(value)
                }
            }
        )+
    };
}

scalar_from!(bool, i32, i64, u32, u64, f32, f64, Complex64, String, &str);

/// One element pulled out of an array for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Float32(f32),
    Complex(Complex64),
    Text(String),
    Raw(Vec<u8>),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_f64_repr(*value)),
            Self::Float32(value) => f.write_str(&format_f32_repr(*value)),
            Self::Complex(value) => f.write_str(&format_complex(*value)),
            Self::Text(value) => f.write_str(value),
            Self::Raw(value) => write!(f, "{}", String::from_utf8_lossy(value)),
        }
    }
}

/// Python-style complex literal: `(1+2j)`, `2j`, `(1.5-0.25j)`.
pub fn format_complex(value: Complex64) -> String {
    let component = |part: f64| {
        let repr = format_f64_repr(part);
        match repr.strip_suffix(".0") {
            Some(trimmed) => trimmed.to_string(),
            None => repr,
        }
    };
    let imag = component(value.im);
    if value.re == 0.0 && value.re.is_sign_positive() {
        return format!("{imag}j");
    }
    let sign = if imag.starts_with('-') { "" } else { "+" };
    format!("({}{sign}{imag}j)", component(value.re))
}

/// Python tuple notation: `()`, `(10,)`, `(3, 4)`.
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({single},)"),
        many => format!(
            "({})",
            many.iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Index label for mismatch tables: bare for 1-D, tuple otherwise.
pub fn format_index(coords: &[usize]) -> String {
    match coords {
        [] => "()".to_string(),
        [single] => single.to_string(),
        many => format!(
            "({})",
            many.iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
