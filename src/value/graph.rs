//! value/graph: два графовых домена.
//!
//! - LabeledGraph: компактный мультиграф (узлы 0..num_nodes, параллельные src/dst),
//!   с именованными признаками узлов/рёбер в виде NumericArray (первая ось = узлы/рёбра).
//! - GeneralGraph: неориентированный простой граф с произвольными ключами узлов и
//!   атрибутами (Primitive) на графе, узлах и рёбрах. Сериализуется целиком (serde).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::array::NumericArray;
use super::primitive::Primitive;
use crate::error::EslError;

// ---------------------- LabeledGraph ----------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledGraph {
    num_nodes: u64,
    src: Vec<u64>,
    dst: Vec<u64>,
    ndata: BTreeMap<String, NumericArray>,
    edata: BTreeMap<String, NumericArray>,
}

impl LabeledGraph {
    pub fn new(num_nodes: u64) -> Self {
        Self {
            num_nodes,
            ..Default::default()
        }
    }

    /// Добавить n узлов. Признаки узлов сбрасываются, т.к. их первая ось больше не совпадает.
    pub fn add_nodes(&mut self, n: u64) {
        self.num_nodes += n;
        if n > 0 {
            self.ndata.clear();
        }
    }

    /// Ребро u->v; параллельные рёбра допустимы.
    pub fn add_edge(&mut self, u: u64, v: u64) -> Result<(), EslError> {
        if u >= self.num_nodes || v >= self.num_nodes {
            return Err(EslError::InvalidValue(format!(
                "edge ({u}, {v}) out of range 0..{}",
                self.num_nodes
            )));
        }
        self.src.push(u);
        self.dst.push(v);
        self.edata.clear();
        Ok(())
    }

    pub fn add_edges(&mut self, edges: &[(u64, u64)]) -> Result<(), EslError> {
        for &(u, v) in edges {
            self.add_edge(u, v)?;
        }
        Ok(())
    }

    pub fn set_node_feature(&mut self, name: &str, feat: NumericArray) -> Result<(), EslError> {
        if feat.leading_dim() as u64 != self.num_nodes {
            return Err(EslError::InvalidValue(format!(
                "node feature '{name}' leading dim {} != num_nodes {}",
                feat.leading_dim(),
                self.num_nodes
            )));
        }
        self.ndata.insert(name.to_string(), feat);
        Ok(())
    }

    pub fn set_edge_feature(&mut self, name: &str, feat: NumericArray) -> Result<(), EslError> {
        if feat.leading_dim() != self.src.len() {
            return Err(EslError::InvalidValue(format!(
                "edge feature '{name}' leading dim {} != num_edges {}",
                feat.leading_dim(),
                self.src.len()
            )));
        }
        self.edata.insert(name.to_string(), feat);
        Ok(())
    }

    pub fn num_nodes(&self) -> u64 {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.src.iter().copied().zip(self.dst.iter().copied())
    }

    pub fn out_degree(&self, n: u64) -> usize {
        self.src.iter().filter(|&&s| s == n).count()
    }

    pub fn node_features(&self) -> &BTreeMap<String, NumericArray> {
        &self.ndata
    }

    pub fn edge_features(&self) -> &BTreeMap<String, NumericArray> {
        &self.edata
    }

    /// Сборка из готовых частей (для декодера); проверяет те же инварианты.
    pub(crate) fn from_parts(
        num_nodes: u64,
        src: Vec<u64>,
        dst: Vec<u64>,
        ndata: BTreeMap<String, NumericArray>,
        edata: BTreeMap<String, NumericArray>,
    ) -> Result<Self, EslError> {
        if src.len() != dst.len() {
            return Err(EslError::InvalidValue("src/dst length mismatch".into()));
        }
        let mut g = Self::new(num_nodes);
        for (u, v) in src.into_iter().zip(dst) {
            g.add_edge(u, v)?;
        }
        for (k, f) in ndata {
            g.set_node_feature(&k, f)?;
        }
        for (k, f) in edata {
            g.set_edge_feature(&k, f)?;
        }
        Ok(g)
    }
}

// ---------------------- GeneralGraph ----------------------

pub type Attrs = BTreeMap<String, Primitive>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneralGraph {
    attrs: Attrs,
    nodes: Vec<(Primitive, Attrs)>,
    /// (индекс u, индекс v, атрибуты); u <= v не гарантируется: порядок вставки.
    edges: Vec<(usize, usize, Attrs)>,
}

impl GeneralGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, key: &Primitive) -> Option<usize> {
        self.nodes.iter().position(|(k, _)| k == key)
    }

    /// Добавить узел (если уже есть: вернуть его индекс).
    pub fn add_node<K: Into<Primitive>>(&mut self, key: K) -> usize {
        let key = key.into();
        match self.index_of(&key) {
            Some(i) => i,
            None => {
                self.nodes.push((key, Attrs::new()));
                self.nodes.len() - 1
            }
        }
    }

    pub fn set_node_attr<K: Into<Primitive>, V: Into<Primitive>>(&mut self, key: K, name: &str, v: V) {
        let i = self.add_node(key);
        self.nodes[i].1.insert(name.to_string(), v.into());
    }

    fn edge_index(&self, a: usize, b: usize) -> Option<usize> {
        self.edges
            .iter()
            .position(|(u, v, _)| (*u == a && *v == b) || (*u == b && *v == a))
    }

    /// Неориентированное ребро; повторное добавление не создаёт дубликат.
    pub fn add_edge<A: Into<Primitive>, B: Into<Primitive>>(&mut self, a: A, b: B) -> usize {
        let ia = self.add_node(a);
        let ib = self.add_node(b);
        match self.edge_index(ia, ib) {
            Some(e) => e,
            None => {
                self.edges.push((ia, ib, Attrs::new()));
                self.edges.len() - 1
            }
        }
    }

    pub fn set_edge_attr<A, B, V>(&mut self, a: A, b: B, name: &str, v: V)
    where
        A: Into<Primitive>,
        B: Into<Primitive>,
        V: Into<Primitive>,
    {
        let e = self.add_edge(a, b);
        self.edges[e].2.insert(name.to_string(), v.into());
    }

    pub fn set_graph_attr<V: Into<Primitive>>(&mut self, name: &str, v: V) {
        self.attrs.insert(name.to_string(), v.into());
    }

    pub fn has_edge<A: Into<Primitive>, B: Into<Primitive>>(&self, a: A, b: B) -> bool {
        match (self.index_of(&a.into()), self.index_of(&b.into())) {
            (Some(ia), Some(ib)) => self.edge_index(ia, ib).is_some(),
            _ => false,
        }
    }

    pub fn degree<K: Into<Primitive>>(&self, key: K) -> usize {
        let Some(i) = self.index_of(&key.into()) else {
            return 0;
        };
        self.edges
            .iter()
            .map(|(u, v, _)| (*u == i) as usize + (*v == i) as usize)
            .sum()
    }

    pub fn neighbors<K: Into<Primitive>>(&self, key: K) -> Vec<&Primitive> {
        let Some(i) = self.index_of(&key.into()) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter_map(|(u, v, _)| {
                if *u == i {
                    Some(&self.nodes[*v].0)
                } else if *v == i {
                    Some(&self.nodes[*u].0)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn graph_attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn node_attrs<K: Into<Primitive>>(&self, key: K) -> Option<&Attrs> {
        self.index_of(&key.into()).map(|i| &self.nodes[i].1)
    }

    /// Проверка ссылочной целостности после десериализации.
    pub(crate) fn validate(&self) -> Result<(), EslError> {
        let n = self.nodes.len();
        if let Some((u, v, _)) = self.edges.iter().find(|(u, v, _)| *u >= n || *v >= n) {
            return Err(EslError::InvalidValue(format!(
                "edge ({u}, {v}) references a missing node (node_count={n})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::array::ArrayData;

    #[test]
    fn labeled_graph_keeps_parallel_edges() {
        let mut g = LabeledGraph::new(4);
        g.add_edges(&[(0, 1), (0, 1), (2, 3)]).unwrap();
        assert_eq!(g.num_edges(), 3);
        assert_eq!(g.out_degree(0), 2);
        assert!(g.add_edge(0, 4).is_err());
    }

    #[test]
    fn labeled_graph_feature_dims_checked() {
        let mut g = LabeledGraph::new(3);
        let ok = NumericArray::new(vec![3, 2], ArrayData::F32(vec![0.0; 6])).unwrap();
        let bad = NumericArray::from(vec![1.0f64, 2.0]);
        assert!(g.set_node_feature("h", ok).is_ok());
        assert!(g.set_node_feature("x", bad).is_err());
        g.add_nodes(1);
        assert!(g.node_features().is_empty(), "features reset on add_nodes");
    }

    #[test]
    fn general_graph_is_undirected_and_simple() {
        let mut g = GeneralGraph::new();
        g.add_edge(3i64, 4i64);
        g.add_edge(5i64, 3i64);
        g.add_edge(1i64, 3i64);
        g.add_edge(4i64, 3i64);
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree(3i64), 3);
        assert!(g.has_edge(4i64, 3i64));
        assert!(!g.has_edge(1i64, 5i64));
        assert_eq!(g.neighbors(5i64), vec![&Primitive::Int(3)]);
    }
}
