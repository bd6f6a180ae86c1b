//! value/primitive: скаляры, последовательности, отображения и множества.
//!
//! JSON‑представление (codec prim):
//! - скаляры/списки/словари: естественный JSON;
//! - Set: `{"$set": [...]}`;
//! - Map, единственный ключ которого "$set" или "$map", оборачивается в `{"$map": {...}}`,
//!   чтобы не спутать его с обёрткой.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::EslError;

const SET_KEY: &str = "$set";
const MAP_KEY: &str = "$map";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Primitive>),
    Map(BTreeMap<String, Primitive>),
    /// Дедуплицированный, канонически упорядоченный набор (см. Primitive::set).
    Set(Vec<Primitive>),
}

impl Primitive {
    /// Построить Set: убрать дубликаты и упорядочить канонически,
    /// чтобы равенство не зависело от порядка вставки.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Primitive>,
    {
        let mut keyed: Vec<(String, Primitive)> = items
            .into_iter()
            .map(Into::into)
            .map(|p| (format!("{p:?}"), p))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);
        Primitive::Set(keyed.into_iter().map(|(_, p)| p).collect())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Primitive::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Primitive::Float(v) => Some(*v),
            Primitive::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Primitive]> {
        match self {
            Primitive::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Primitive>> {
        match self {
            Primitive::Map(m) => Some(m),
            _ => None,
        }
    }

    /// В JSON‑дерево. Ошибка на NaN/Inf (JSON их не представляет).
    pub fn to_json(&self) -> Result<Json, EslError> {
        Ok(match self {
            Primitive::Null => Json::Null,
            Primitive::Bool(b) => Json::Bool(*b),
            Primitive::Int(v) => Json::Number((*v).into()),
            Primitive::Float(v) => Json::Number(Number::from_f64(*v).ok_or_else(|| {
                EslError::InvalidValue(format!("non-finite float {v} is not representable"))
            })?),
            Primitive::Str(s) => Json::String(s.clone()),
            Primitive::List(items) => {
                Json::Array(items.iter().map(|p| p.to_json()).collect::<Result<_, _>>()?)
            }
            Primitive::Set(items) => {
                let arr = items.iter().map(|p| p.to_json()).collect::<Result<_, _>>()?;
                let mut obj = JsonMap::new();
                obj.insert(SET_KEY.to_string(), Json::Array(arr));
                Json::Object(obj)
            }
            Primitive::Map(m) => {
                let mut obj = JsonMap::new();
                for (k, v) in m {
                    obj.insert(k.clone(), v.to_json()?);
                }
                let needs_wrap =
                    m.len() == 1 && m.keys().any(|k| k == SET_KEY || k == MAP_KEY);
                if needs_wrap {
                    let mut outer = JsonMap::new();
                    outer.insert(MAP_KEY.to_string(), Json::Object(obj));
                    Json::Object(outer)
                } else {
                    Json::Object(obj)
                }
            }
        })
    }

    /// Из JSON‑дерева (обратное к to_json).
    pub fn from_json(j: Json) -> Self {
        match j {
            Json::Null => Primitive::Null,
            Json::Bool(b) => Primitive::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(v) => Primitive::Int(v),
                // u64 > i64::MAX и дробные: как f64
                None => Primitive::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Primitive::Str(s),
            Json::Array(items) => {
                Primitive::List(items.into_iter().map(Primitive::from_json).collect())
            }
            Json::Object(mut obj) => {
                if obj.len() == 1 {
                    if let Some(Json::Array(items)) = obj.get(SET_KEY) {
                        return Primitive::set(items.iter().cloned().map(Primitive::from_json));
                    }
                    if let Some(Json::Object(_)) = obj.get(MAP_KEY) {
                        if let Some(Json::Object(inner)) = obj.remove(MAP_KEY) {
                            return Primitive::Map(
                                inner
                                    .into_iter()
                                    .map(|(k, v)| (k, Primitive::from_json(v)))
                                    .collect(),
                            );
                        }
                    }
                }
                Primitive::Map(
                    obj.into_iter()
                        .map(|(k, v)| (k, Primitive::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

// ---------- конверсии из обычных Rust‑типов ----------

macro_rules! prim_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Primitive {
            fn from(v: $t) -> Self {
                Primitive::Int(v as i64)
            }
        }
    )*};
}
prim_from_int!(i64, i32, i16, i8, u32, u16, u8);

impl From<usize> for Primitive {
    fn from(v: usize) -> Self {
        Primitive::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for Primitive {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Primitive::Int(i),
            Err(_) => Primitive::Float(v as f64),
        }
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<f32> for Primitive {
    fn from(v: f32) -> Self {
        Primitive::Float(v as f64)
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Bool(v)
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::Str(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::Str(v.to_string())
    }
}

impl<T: Into<Primitive>> From<Option<T>> for Primitive {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Primitive::Null)
    }
}

impl<T: Into<Primitive>> From<Vec<T>> for Primitive {
    fn from(v: Vec<T>) -> Self {
        Primitive::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Primitive>> From<BTreeMap<String, T>> for Primitive {
    fn from(m: BTreeMap<String, T>) -> Self {
        Primitive::Map(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Primitive>> From<BTreeSet<T>> for Primitive {
    fn from(s: BTreeSet<T>) -> Self {
        Primitive::set(s)
    }
}
