//! codec/json: Primitive ↔ JSON файл.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::{wrong_tag, Codec};
use crate::error::EslError;
use crate::util::read_existing;
use crate::value::{Primitive, TypeTag, Value};

pub struct PrimitiveCodec;

impl Codec for PrimitiveCodec {
    fn tag(&self) -> TypeTag {
        TypeTag::Primitive
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value, path: &Path) -> Result<()> {
        let Value::Primitive(p) = value else {
            return Err(wrong_tag(self.tag(), value).into());
        };
        let json = p.to_json()?;
        let bytes = serde_json::to_vec(&json).context("serialize primitive json")?;
        fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Value> {
        let bytes = read_existing(path)?.ok_or_else(|| EslError::NotFound {
            path: path.display().to_string(),
        })?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| EslError::corrupt(path, e.to_string()))?;
        Ok(Value::Primitive(Primitive::from_json(json)))
    }
}
