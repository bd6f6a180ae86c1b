//! cluster/view: read-only снимки содержимого кластера.
//!
//! ClusterView адресуется как [tag][name]. FlatView: как [name]; если имя живёт
//! под несколькими тегами, каждое значение доступно по ключу "<name>_<tag>", а
//! collisions() перечисляет такие имена.

use std::collections::BTreeMap;
use std::ops::Index;

use super::Cluster;
use crate::value::{TypeTag, Value};

pub type Partition = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
    parts: BTreeMap<TypeTag, Partition>,
}

impl ClusterView {
    pub fn get(&self, tag: TypeTag, name: &str) -> Option<&Value> {
        self.parts.get(&tag)?.get(name)
    }

    pub fn partition(&self, tag: TypeTag) -> &Partition {
        // все шесть партиций создаются в Cluster::view
        &self.parts[&tag]
    }

    pub fn primitive(&self) -> &Partition {
        self.partition(TypeTag::Primitive)
    }

    pub fn array(&self) -> &Partition {
        self.partition(TypeTag::NumericArray)
    }

    pub fn table(&self) -> &Partition {
        self.partition(TypeTag::Table)
    }

    pub fn lgraph(&self) -> &Partition {
        self.partition(TypeTag::LabeledGraph)
    }

    pub fn ggraph(&self) -> &Partition {
        self.partition(TypeTag::GeneralGraph)
    }

    pub fn tensor(&self) -> &Partition {
        self.partition(TypeTag::Tensor)
    }

    pub fn len(&self) -> usize {
        self.parts.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index<TypeTag> for ClusterView {
    type Output = Partition;

    fn index(&self, tag: TypeTag) -> &Partition {
        self.partition(tag)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatView {
    values: BTreeMap<String, Value>,
    collisions: BTreeMap<String, Vec<TypeTag>>,
}

impl FlatView {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Имена, принадлежащие нескольким тегам, и их теги.
    pub fn collisions(&self) -> &BTreeMap<String, Vec<TypeTag>> {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<&str> for FlatView {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.values.get(key) {
            Some(v) => v,
            None => panic!("no entry '{key}' in flattened view"),
        }
    }
}

impl Cluster {
    pub fn view(&self) -> ClusterView {
        let parts = TypeTag::ALL
            .into_iter()
            .map(|t| {
                let part = self
                    .data
                    .get(&t)
                    .map(|m| m.iter().map(|(n, e)| (n.clone(), e.value.clone())).collect())
                    .unwrap_or_default();
                (t, part)
            })
            .collect();
        ClusterView { parts }
    }

    pub fn flattened_view(&self) -> FlatView {
        let mut owners: BTreeMap<&str, Vec<(TypeTag, &Value)>> = BTreeMap::new();
        for t in TypeTag::ALL {
            if let Some(m) = self.data.get(&t) {
                for (name, e) in m {
                    owners.entry(name.as_str()).or_default().push((t, &e.value));
                }
            }
        }

        let mut flat = FlatView::default();
        // уникальные имена занимают ключи первыми
        for (name, tagged) in &owners {
            if let [(_, v)] = tagged.as_slice() {
                flat.values.insert(name.to_string(), (*v).clone());
            }
        }
        for (name, tagged) in owners.iter().filter(|(_, t)| t.len() > 1) {
            let mut tags = Vec::with_capacity(tagged.len());
            for (t, v) in tagged {
                let mut key = format!("{name}_{t}");
                while flat.values.contains_key(&key) {
                    key.push('_');
                }
                flat.values.insert(key, (*v).clone());
                tags.push(*t);
            }
            flat.collisions.insert(name.to_string(), tags);
        }
        flat
    }
}
