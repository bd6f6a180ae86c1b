//! codec/tensor: Tensor ↔ ESLTEN01.
//!
//! body (после version): [device u8][ordinal u32][array body].
//! Устройство пишется только для диагностики: decode всегда отдаёт тензор на CPU.

use anyhow::{anyhow, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::fs;
use std::path::Path;

use super::binio::{body_with_version, open_sealed, parse_body, read_array, seal, write_array};
use super::{wrong_tag, Codec};
use crate::consts::{DEVICE_CPU, DEVICE_CUDA, TENSOR_MAGIC};
use crate::value::{Device, Tensor, TypeTag, Value};

pub struct TensorCodec;

impl Codec for TensorCodec {
    fn tag(&self) -> TypeTag {
        TypeTag::Tensor
    }

    fn extension(&self) -> &'static str {
        "tensor"
    }

    fn encode(&self, value: &Value, path: &Path) -> Result<()> {
        let Value::Tensor(t) = value else {
            return Err(wrong_tag(self.tag(), value).into());
        };
        let (code, ordinal) = match t.device() {
            Device::Cpu => (DEVICE_CPU, 0),
            Device::Cuda(i) => (DEVICE_CUDA, i),
        };
        let mut body = body_with_version();
        body.write_u8(code)?;
        body.write_u32::<LittleEndian>(ordinal)?;
        write_array(&mut body, t.values())?;
        fs::write(path, seal(TENSOR_MAGIC, &body))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Value> {
        let body = open_sealed(path, TENSOR_MAGIC)?;
        let (origin, values) = parse_body(path, &body, |cur| {
            let code = cur.read_u8()?;
            let ordinal = cur.read_u32::<LittleEndian>()?;
            let origin = match code {
                DEVICE_CPU => Device::Cpu,
                DEVICE_CUDA => Device::Cuda(ordinal),
                other => return Err(anyhow!("unknown device code {other}")),
            };
            Ok((origin, read_array(cur)?))
        })?;
        if origin != Device::Cpu {
            debug!("tensor {} saved on {origin}, restored on cpu", path.display());
        }
        Ok(Value::Tensor(Tensor::from_array(values)))
    }
}
