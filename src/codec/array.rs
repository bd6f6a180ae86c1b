//! codec/array: NumericArray ↔ ESLARR01 (shape и dtype сохраняются точно).

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::binio::{body_with_version, open_sealed, parse_body, read_array, seal, write_array};
use super::{wrong_tag, Codec};
use crate::consts::ARRAY_MAGIC;
use crate::value::{TypeTag, Value};

pub struct ArrayCodec;

impl Codec for ArrayCodec {
    fn tag(&self) -> TypeTag {
        TypeTag::NumericArray
    }

    fn extension(&self) -> &'static str {
        "arr"
    }

    fn encode(&self, value: &Value, path: &Path) -> Result<()> {
        let Value::NumericArray(a) = value else {
            return Err(wrong_tag(self.tag(), value).into());
        };
        let mut body = body_with_version();
        write_array(&mut body, a)?;
        fs::write(path, seal(ARRAY_MAGIC, &body))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Value> {
        let body = open_sealed(path, ARRAY_MAGIC)?;
        let a = parse_body(path, &body, |cur| read_array(cur))?;
        Ok(Value::NumericArray(a))
    }
}
