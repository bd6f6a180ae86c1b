//! value/array: n‑мерный числовой массив (row‑major) с явным dtype.

use crate::consts::{DTYPE_BOOL, DTYPE_F32, DTYPE_F64, DTYPE_I32, DTYPE_I64, DTYPE_U8};
use crate::error::EslError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F64,
    F32,
    I64,
    I32,
    U8,
    Bool,
}

impl DType {
    pub fn code(self) -> u8 {
        match self {
            DType::F64 => DTYPE_F64,
            DType::F32 => DTYPE_F32,
            DType::I64 => DTYPE_I64,
            DType::I32 => DTYPE_I32,
            DType::U8 => DTYPE_U8,
            DType::Bool => DTYPE_BOOL,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            DTYPE_F64 => DType::F64,
            DTYPE_F32 => DType::F32,
            DTYPE_I64 => DType::I64,
            DTYPE_I32 => DType::I32,
            DTYPE_U8 => DType::U8,
            DTYPE_BOOL => DType::Bool,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::U8 => "u8",
            DType::Bool => "bool",
        }
    }

    /// Размер элемента на диске (байт).
    pub fn elem_size(self) -> usize {
        match self {
            DType::F64 | DType::I64 => 8,
            DType::F32 | DType::I32 => 4,
            DType::U8 | DType::Bool => 1,
        }
    }
}

/// Плоский типизированный буфер.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    U8(Vec<u8>),
    Bool(Vec<bool>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::F64(v) => v.len(),
            ArrayData::F32(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::U8(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::F64(_) => DType::F64,
            ArrayData::F32(_) => DType::F32,
            ArrayData::I64(_) => DType::I64,
            ArrayData::I32(_) => DType::I32,
            ArrayData::U8(_) => DType::U8,
            ArrayData::Bool(_) => DType::Bool,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NumericArray {
    /// Проверяет, что product(shape) == len(data). Пустой shape: скаляр (1 элемент).
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, EslError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| EslError::InvalidValue(format!("shape {:?} overflows usize", shape)))?;
        if expected != data.len() {
            return Err(EslError::InvalidValue(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Одномерный массив из буфера.
    pub fn from_data(data: ArrayData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, EslError> {
        Self::new(shape, self.data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Размер первой оси (0 для скаляра).
    pub fn leading_dim(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }
}

impl From<Vec<f64>> for NumericArray {
    fn from(v: Vec<f64>) -> Self {
        Self::from_data(ArrayData::F64(v))
    }
}

impl From<Vec<f32>> for NumericArray {
    fn from(v: Vec<f32>) -> Self {
        Self::from_data(ArrayData::F32(v))
    }
}

impl From<Vec<i64>> for NumericArray {
    fn from(v: Vec<i64>) -> Self {
        Self::from_data(ArrayData::I64(v))
    }
}

impl From<Vec<i32>> for NumericArray {
    fn from(v: Vec<i32>) -> Self {
        Self::from_data(ArrayData::I32(v))
    }
}
