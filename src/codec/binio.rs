//! codec/binio: общая "рамка" бинарных payload и кодирование тела массива.
//!
//! Рамка файла (LE):
//!   [magic8][body ...][crc32 u32]
//! body начинается с [version u32]; CRC считается по body (magic не входит).
//!
//! Тело массива (используется array/lgraph/tensor):
//!   [dtype u8][ndim u32][dim u64 × ndim][count u64][elements LE × count]
//! bool пишется как u8 0/1.

use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::consts::PAYLOAD_VERSION;
use crate::error::EslError;
use crate::util::read_existing;
use crate::value::{ArrayData, DType, NumericArray};

/// Запечатать body: magic + body + crc32(body).
pub(crate) fn seal(magic: &[u8; 8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len() + 4);
    out.extend_from_slice(magic);
    out.extend_from_slice(body);
    let mut h = Crc32::new();
    h.update(body);
    let mut buf4 = [0u8; 4];
    LittleEndian::write_u32(&mut buf4, h.finalize());
    out.extend_from_slice(&buf4);
    out
}

/// Прочитать запечатанный файл: NotFound если нет, Corrupt при плохой magic/CRC/версии.
/// Возвращает body без версии (курсор уже за полем version).
pub(crate) fn open_sealed(path: &Path, magic: &[u8; 8]) -> Result<Vec<u8>> {
    let bytes = read_existing(path)?.ok_or_else(|| EslError::NotFound {
        path: path.display().to_string(),
    })?;
    if bytes.len() < 8 + 4 + 4 {
        return Err(EslError::corrupt(path, format!("too short ({} bytes)", bytes.len())).into());
    }
    if &bytes[0..8] != magic {
        return Err(EslError::corrupt(path, "bad magic").into());
    }
    let body = &bytes[8..bytes.len() - 4];
    let stored = LittleEndian::read_u32(&bytes[bytes.len() - 4..]);
    let mut h = Crc32::new();
    h.update(body);
    let calc = h.finalize();
    if calc != stored {
        return Err(EslError::corrupt(
            path,
            format!("CRC mismatch (stored={stored}, calc={calc})"),
        )
        .into());
    }
    let version = LittleEndian::read_u32(&body[0..4]);
    if version != PAYLOAD_VERSION {
        return Err(EslError::corrupt(path, format!("unsupported version {version}")).into());
    }
    Ok(body[4..].to_vec())
}

/// Разобрать body, превращая любую ошибку разбора в Corrupt(path).
pub(crate) fn parse_body<T>(path: &Path, body: &[u8], f: impl FnOnce(&mut Cursor<&[u8]>) -> Result<T>) -> Result<T> {
    let mut cur = Cursor::new(body);
    let out = f(&mut cur).map_err(|e| EslError::corrupt(path, format!("{e:#}")))?;
    if (cur.position() as usize) != body.len() {
        return Err(EslError::corrupt(
            path,
            format!("{} trailing bytes", body.len() - cur.position() as usize),
        )
        .into());
    }
    Ok(out)
}

pub(crate) fn body_with_version() -> Vec<u8> {
    let mut body = Vec::new();
    // Vec<u8> как Write не падает
    let _ = body.write_u32::<LittleEndian>(PAYLOAD_VERSION);
    body
}

// -------------------- строки --------------------

pub(crate) fn write_str(out: &mut Vec<u8>, s: &str) -> Result<()> {
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

pub(crate) fn read_str(cur: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cur.read_u32::<LittleEndian>()? as usize;
    ensure_remaining(cur, len)?;
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn ensure_remaining(cur: &Cursor<&[u8]>, need: usize) -> Result<()> {
    let rem = cur.get_ref().len().saturating_sub(cur.position() as usize);
    if need > rem {
        return Err(anyhow!("declared length {need} exceeds remaining {rem} bytes"));
    }
    Ok(())
}

// -------------------- массивы --------------------

pub(crate) fn write_u64s(out: &mut Vec<u8>, v: &[u64]) -> Result<()> {
    for &x in v {
        out.write_u64::<LittleEndian>(x)?;
    }
    Ok(())
}

pub(crate) fn read_u64s(cur: &mut Cursor<&[u8]>, n: usize) -> Result<Vec<u64>> {
    ensure_remaining(cur, n.saturating_mul(8))?;
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        v.push(cur.read_u64::<LittleEndian>()?);
    }
    Ok(v)
}

pub(crate) fn write_array(out: &mut Vec<u8>, a: &NumericArray) -> Result<()> {
    out.write_u8(a.dtype().code())?;
    out.write_u32::<LittleEndian>(a.ndim() as u32)?;
    for &d in a.shape() {
        out.write_u64::<LittleEndian>(d as u64)?;
    }
    out.write_u64::<LittleEndian>(a.len() as u64)?;
    match a.data() {
        ArrayData::F64(v) => {
            for &x in v {
                out.write_f64::<LittleEndian>(x)?;
            }
        }
        ArrayData::F32(v) => {
            for &x in v {
                out.write_f32::<LittleEndian>(x)?;
            }
        }
        ArrayData::I64(v) => {
            for &x in v {
                out.write_i64::<LittleEndian>(x)?;
            }
        }
        ArrayData::I32(v) => {
            for &x in v {
                out.write_i32::<LittleEndian>(x)?;
            }
        }
        ArrayData::U8(v) => out.extend_from_slice(v),
        ArrayData::Bool(v) => out.extend(v.iter().map(|&b| b as u8)),
    }
    Ok(())
}

pub(crate) fn read_array(cur: &mut Cursor<&[u8]>) -> Result<NumericArray> {
    let code = cur.read_u8()?;
    let dtype = DType::from_code(code).ok_or_else(|| anyhow!("unknown dtype code {code}"))?;
    let ndim = cur.read_u32::<LittleEndian>()? as usize;
    let shape: Vec<usize> = read_u64s(cur, ndim)?.into_iter().map(|d| d as usize).collect();
    let count = cur.read_u64::<LittleEndian>()? as usize;
    ensure_remaining(cur, count.saturating_mul(dtype.elem_size()))?;

    let data = match dtype {
        DType::F64 => {
            let mut v = vec![0f64; count];
            cur.read_f64_into::<LittleEndian>(&mut v)?;
            ArrayData::F64(v)
        }
        DType::F32 => {
            let mut v = vec![0f32; count];
            cur.read_f32_into::<LittleEndian>(&mut v)?;
            ArrayData::F32(v)
        }
        DType::I64 => {
            let mut v = vec![0i64; count];
            cur.read_i64_into::<LittleEndian>(&mut v)?;
            ArrayData::I64(v)
        }
        DType::I32 => {
            let mut v = vec![0i32; count];
            cur.read_i32_into::<LittleEndian>(&mut v)?;
            ArrayData::I32(v)
        }
        DType::U8 => {
            let mut v = vec![0u8; count];
            cur.read_exact(&mut v)?;
            ArrayData::U8(v)
        }
        DType::Bool => {
            let mut raw = vec![0u8; count];
            cur.read_exact(&mut raw)?;
            if let Some(b) = raw.iter().find(|&&b| b > 1) {
                return Err(anyhow!("bad bool byte {b}"));
            }
            ArrayData::Bool(raw.into_iter().map(|b| b == 1).collect())
        }
    };
    Ok(NumericArray::new(shape, data)?)
}
