//! codec/ggraph: GeneralGraph ↔ ESLGG001: полная глубокая сериализация (bincode).
//! Дороже lgraph, зато переносит произвольные ключи узлов и атрибуты.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

use super::binio::{body_with_version, open_sealed, seal};
use super::{wrong_tag, Codec};
use crate::consts::GGRAPH_MAGIC;
use crate::error::EslError;
use crate::value::{GeneralGraph, TypeTag, Value};

pub struct GeneralGraphCodec;

impl Codec for GeneralGraphCodec {
    fn tag(&self) -> TypeTag {
        TypeTag::GeneralGraph
    }

    fn extension(&self) -> &'static str {
        "ggraph"
    }

    fn encode(&self, value: &Value, path: &Path) -> Result<()> {
        let Value::GeneralGraph(g) = value else {
            return Err(wrong_tag(self.tag(), value).into());
        };
        let encoded = bincode::serialize(g).map_err(|e| anyhow!("bincode serialize: {e}"))?;
        let mut body = body_with_version();
        body.extend_from_slice(&encoded);
        fs::write(path, seal(GGRAPH_MAGIC, &body))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Value> {
        let body = open_sealed(path, GGRAPH_MAGIC)?;
        let g: GeneralGraph =
            bincode::deserialize(&body).map_err(|e| EslError::corrupt(path, e.to_string()))?;
        g.validate()
            .map_err(|e| EslError::corrupt(path, e.to_string()))?;
        Ok(Value::GeneralGraph(g))
    }
}
