//! value/tensor: тензор с размещением на устройстве.
//!
//! Хранение всегда на хосте; `Device` лишь помечает исходное размещение.
//! При восстановлении с диска тензор всегда возвращается на `Device::Cpu`.

use super::array::{ArrayData, DType, NumericArray};
use crate::error::EslError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    values: NumericArray,
    device: Device,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, EslError> {
        Ok(Self {
            values: NumericArray::new(shape, data)?,
            device: Device::Cpu,
        })
    }

    /// 1‑D f32 тензор (аналог FloatTensor из списка).
    pub fn from_f32(v: Vec<f32>) -> Self {
        Self {
            values: NumericArray::from(v),
            device: Device::Cpu,
        }
    }

    pub fn from_array(values: NumericArray) -> Self {
        Self {
            values,
            device: Device::Cpu,
        }
    }

    /// Перенести на устройство (меняется только метка размещения).
    pub fn to(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn cpu(self) -> Self {
        self.to(Device::Cpu)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub fn values(&self) -> &NumericArray {
        &self.values
    }

    /// Равенство значений без учёта устройства.
    pub fn same_values(&self, other: &Tensor) -> bool {
        self.values == other.values
    }
}
