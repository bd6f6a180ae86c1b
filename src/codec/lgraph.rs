//! codec/lgraph: LabeledGraph ↔ ESLLG001 (компактный нативный формат мультиграфа).
//!
//! body (LE, после version):
//!   [num_nodes u64][num_edges u64][src u64 × E][dst u64 × E]
//!   [n_node_feats u32] { [name str][array body] } × n
//!   [n_edge_feats u32] { [name str][array body] } × n

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use super::binio::{
    body_with_version, open_sealed, parse_body, read_array, read_str, read_u64s, seal,
    write_array, write_str, write_u64s,
};
use super::{wrong_tag, Codec};
use crate::consts::LGRAPH_MAGIC;
use crate::value::{LabeledGraph, NumericArray, TypeTag, Value};

pub struct LabeledGraphCodec;

fn write_feats(out: &mut Vec<u8>, feats: &BTreeMap<String, NumericArray>) -> Result<()> {
    out.write_u32::<LittleEndian>(feats.len() as u32)?;
    for (name, a) in feats {
        write_str(out, name)?;
        write_array(out, a)?;
    }
    Ok(())
}

fn read_feats(cur: &mut Cursor<&[u8]>) -> Result<BTreeMap<String, NumericArray>> {
    let n = cur.read_u32::<LittleEndian>()?;
    let mut out = BTreeMap::new();
    for _ in 0..n {
        let name = read_str(cur)?;
        let a = read_array(cur)?;
        out.insert(name, a);
    }
    Ok(out)
}

impl Codec for LabeledGraphCodec {
    fn tag(&self) -> TypeTag {
        TypeTag::LabeledGraph
    }

    fn extension(&self) -> &'static str {
        "lgraph"
    }

    fn encode(&self, value: &Value, path: &Path) -> Result<()> {
        let Value::LabeledGraph(g) = value else {
            return Err(wrong_tag(self.tag(), value).into());
        };
        let (src, dst): (Vec<u64>, Vec<u64>) = g.edges().unzip();

        let mut body = body_with_version();
        body.write_u64::<LittleEndian>(g.num_nodes())?;
        body.write_u64::<LittleEndian>(src.len() as u64)?;
        write_u64s(&mut body, &src)?;
        write_u64s(&mut body, &dst)?;
        write_feats(&mut body, g.node_features())?;
        write_feats(&mut body, g.edge_features())?;

        fs::write(path, seal(LGRAPH_MAGIC, &body))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Value> {
        let body = open_sealed(path, LGRAPH_MAGIC)?;
        let g = parse_body(path, &body, |cur| {
            let num_nodes = cur.read_u64::<LittleEndian>()?;
            let num_edges = cur.read_u64::<LittleEndian>()? as usize;
            let src = read_u64s(cur, num_edges)?;
            let dst = read_u64s(cur, num_edges)?;
            let ndata = read_feats(cur)?;
            let edata = read_feats(cur)?;
            Ok(LabeledGraph::from_parts(num_nodes, src, dst, ndata, edata)?)
        })?;
        Ok(Value::LabeledGraph(g))
    }
}
