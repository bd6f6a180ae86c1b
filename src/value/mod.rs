//! value: замкнутый набор доменов значений и их классификация.
//!
//! `Value`: sum type над шестью доменами; `TypeTag`: его дискриминант со стабильным
//! коротким id (используется в именах файлов и в manifest.json).
//! Добавление домена = новый вариант Value + TypeTag + codec.

pub mod array;
pub mod graph;
pub mod primitive;
pub mod table;
pub mod tensor;

pub use array::{ArrayData, DType, NumericArray};
pub use graph::{Attrs, GeneralGraph, LabeledGraph};
pub use primitive::Primitive;
pub use table::{Cell, Table};
pub use tensor::{Device, Tensor};

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::EslError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    #[serde(rename = "prim")]
    Primitive,
    #[serde(rename = "array")]
    NumericArray,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "lgraph")]
    LabeledGraph,
    #[serde(rename = "ggraph")]
    GeneralGraph,
    #[serde(rename = "tensor")]
    Tensor,
}

impl TypeTag {
    /// Фиксированный порядок обхода партиций (dump/load/replay).
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Primitive,
        TypeTag::NumericArray,
        TypeTag::Table,
        TypeTag::LabeledGraph,
        TypeTag::GeneralGraph,
        TypeTag::Tensor,
    ];

    pub fn id(self) -> &'static str {
        match self {
            TypeTag::Primitive => "prim",
            TypeTag::NumericArray => "array",
            TypeTag::Table => "table",
            TypeTag::LabeledGraph => "lgraph",
            TypeTag::GeneralGraph => "ggraph",
            TypeTag::Tensor => "tensor",
        }
    }

    pub fn of(value: &Value) -> TypeTag {
        value.type_tag()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TypeTag {
    type Err = EslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| EslError::InvalidValue(format!("unknown type tag '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    NumericArray(NumericArray),
    Table(Table),
    LabeledGraph(LabeledGraph),
    GeneralGraph(GeneralGraph),
    Tensor(Tensor),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Primitive(_) => TypeTag::Primitive,
            Value::NumericArray(_) => TypeTag::NumericArray,
            Value::Table(_) => TypeTag::Table,
            Value::LabeledGraph(_) => TypeTag::LabeledGraph,
            Value::GeneralGraph(_) => TypeTag::GeneralGraph,
            Value::Tensor(_) => TypeTag::Tensor,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NumericArray> {
        match self {
            Value::NumericArray(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_labeled_graph(&self) -> Option<&LabeledGraph> {
        match self {
            Value::LabeledGraph(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_general_graph(&self) -> Option<&GeneralGraph> {
        match self {
            Value::GeneralGraph(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }
}

// ---------- From для доменов ----------

impl From<Primitive> for Value {
    fn from(v: Primitive) -> Self {
        Value::Primitive(v)
    }
}

impl From<NumericArray> for Value {
    fn from(v: NumericArray) -> Self {
        Value::NumericArray(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Value::Table(v)
    }
}

impl From<LabeledGraph> for Value {
    fn from(v: LabeledGraph) -> Self {
        Value::LabeledGraph(v)
    }
}

impl From<GeneralGraph> for Value {
    fn from(v: GeneralGraph) -> Self {
        Value::GeneralGraph(v)
    }
}

impl From<Tensor> for Value {
    fn from(v: Tensor) -> Self {
        Value::Tensor(v)
    }
}

// Скаляры и контейнеры → Primitive.
macro_rules! value_from_prim {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Primitive(Primitive::from(v))
            }
        }
    )*};
}
value_from_prim!(i64, i32, u32, u64, usize, f64, f32, bool, String, &str);

impl<T: Into<Primitive>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Primitive(Primitive::from(v))
    }
}

impl<T: Into<Primitive>> From<BTreeMap<String, T>> for Value {
    fn from(m: BTreeMap<String, T>) -> Self {
        Value::Primitive(Primitive::from(m))
    }
}

impl<T: Into<Primitive>> From<BTreeSet<T>> for Value {
    fn from(s: BTreeSet<T>) -> Self {
        Value::Primitive(Primitive::set(s))
    }
}

// ---------- динамическая классификация ----------

/// Значение для динамической регистрации: `Any` плюс имя конкретного типа.
pub trait DynValue: Any {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> DynValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Классифицировать произвольное значение по его конкретному типу.
/// Значение копируется (clone): дальнейшие мутации оригинала на реестр не влияют.
/// Неподдерживаемый тип → `UnsupportedType` с именем типа (без приведения к строке).
pub fn classify_any(name: &str, dynv: &dyn DynValue) -> Result<Value, EslError> {
    let value = dynv.as_any();
    macro_rules! try_as {
        ($($t:ty),* $(,)?) => {$(
            if let Some(v) = value.downcast_ref::<$t>() {
                return Ok(Value::from(v.clone()));
            }
        )*};
    }

    if let Some(v) = value.downcast_ref::<Value>() {
        return Ok(v.clone());
    }
    try_as!(
        Primitive,
        NumericArray,
        Table,
        LabeledGraph,
        GeneralGraph,
        Tensor,
        i64,
        i32,
        u32,
        u64,
        usize,
        f64,
        f32,
        bool,
        String,
        &'static str,
        Vec<i64>,
        Vec<i32>,
        Vec<f64>,
        Vec<bool>,
        Vec<String>,
        Vec<Primitive>,
        BTreeMap<String, i64>,
        BTreeMap<String, f64>,
        BTreeMap<String, String>,
        BTreeMap<String, Primitive>,
        BTreeSet<i64>,
        BTreeSet<String>,
    );

    Err(EslError::UnsupportedType {
        name: name.to_string(),
        type_name: dynv.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_back_from_ids() {
        for t in TypeTag::ALL {
            assert_eq!(t.id().parse::<TypeTag>().unwrap(), t);
        }
        assert!("pd".parse::<TypeTag>().is_err());
    }

    #[test]
    fn tag_serde_uses_short_ids() {
        let s = serde_json::to_string(&TypeTag::LabeledGraph).unwrap();
        assert_eq!(s, "\"lgraph\"");
    }

    #[test]
    fn classify_any_clones_supported_values() {
        let v = vec![1i64, 2, 3];
        let got = classify_any("a", &v).unwrap();
        assert_eq!(got.type_tag(), TypeTag::Primitive);
        let t = Tensor::from_f32(vec![1.2, -5.6]);
        assert_eq!(classify_any("t", &t).unwrap().type_tag(), TypeTag::Tensor);
    }

    #[test]
    fn classify_any_rejects_unknown() {
        struct Opaque;
        let err = classify_any("o", &Opaque).unwrap_err();
        match err {
            EslError::UnsupportedType { name, type_name } => {
                assert_eq!(name, "o");
                assert!(type_name.ends_with("Opaque"), "{type_name}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
