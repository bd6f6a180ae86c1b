//! codec: encode/decode payload файлов по TypeTag.
//!
//! Состав:
//! - Codec: трейт пары encode/decode для одного тега.
//! - CodecRegistry: по одному codec на тег; `standard()`: встроенный набор.
//! - save_name()/payload_file()/parse_save_name(): схема имён `<tag>-<entry>.<ext>`.
//!
//! Форматы:
//!   prim   → .json   (serde_json, дерево объект/массив/скаляр)
//!   array  → .arr    (ESLARR01, shape + dtype)
//!   table  → .csv    (строки/колонки; индекс строк не сохраняется)
//!   lgraph → .lgraph (ESLLG001, компактный мультиграф)
//!   ggraph → .ggraph (ESLGG001, полная сериализация через bincode)
//!   tensor → .tensor (ESLTEN01, всегда восстанавливается на CPU)

pub(crate) mod binio;
pub mod array;
pub mod ggraph;
pub mod json;
pub mod lgraph;
pub mod table;
pub mod tensor;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::EslError;
use crate::value::{TypeTag, Value};

pub trait Codec: Send + Sync {
    fn tag(&self) -> TypeTag;

    /// Расширение payload файла (без точки).
    fn extension(&self) -> &'static str;

    /// Записать значение в path. Значение другого тега: InvalidValue.
    fn encode(&self, value: &Value, path: &Path) -> Result<()>;

    /// Восстановить значение. Нет файла: NotFound, битый файл: Corrupt.
    fn decode(&self, path: &Path) -> Result<Value>;
}

/// По одному codec на TypeTag. Ключ: сам тег, поэтому теги взаимоисключающие.
pub struct CodecRegistry {
    codecs: BTreeMap<TypeTag, Box<dyn Codec>>,
}

impl CodecRegistry {
    pub fn standard() -> Self {
        let mut r = Self {
            codecs: BTreeMap::new(),
        };
        r.register_codec(Box::new(json::PrimitiveCodec));
        r.register_codec(Box::new(array::ArrayCodec));
        r.register_codec(Box::new(table::CsvTableCodec));
        r.register_codec(Box::new(lgraph::LabeledGraphCodec));
        r.register_codec(Box::new(ggraph::GeneralGraphCodec));
        r.register_codec(Box::new(tensor::TensorCodec));
        r
    }

    /// Установить/заменить codec для его тега. Возвращает предыдущий, если был.
    pub fn register_codec(&mut self, codec: Box<dyn Codec>) -> Option<Box<dyn Codec>> {
        self.codecs.insert(codec.tag(), codec)
    }

    pub fn codec(&self, tag: TypeTag) -> &dyn Codec {
        // standard() заполняет все теги, а register_codec только заменяет.
        match self.codecs.get(&tag) {
            Some(c) => c.as_ref(),
            None => unreachable!("codec registry always covers every TypeTag"),
        }
    }

    pub fn classify(&self, value: &Value) -> TypeTag {
        value.type_tag()
    }

    /// Имя payload файла для (tag, entry).
    pub fn payload_file(&self, tag: TypeTag, entry: &str) -> String {
        format!("{}.{}", save_name(tag, entry), self.codec(tag).extension())
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// `<tag>-<entry>`: ключ записи в manifest.json.
pub fn save_name(tag: TypeTag, entry: &str) -> String {
    format!("{}-{}", tag.id(), entry)
}

/// Обратное к save_name: делим по первому '-', имя записи может содержать '-'.
pub fn parse_save_name(s: &str) -> Option<(TypeTag, &str)> {
    let (tag, name) = s.trim().split_once('-')?;
    let tag = tag.parse::<TypeTag>().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((tag, name))
}

/// Имя записи становится частью имени файла: запрещаем пустые, разделители путей и NUL.
pub fn validate_entry_name(name: &str) -> Result<(), EslError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| c == '/' || c == '\\' || c == '\0');
    if bad {
        return Err(EslError::InvalidValue(format!("invalid entry name '{name}'")));
    }
    Ok(())
}

/// Ошибка "значение не того тега" для encode.
pub(crate) fn wrong_tag(expected: TypeTag, got: &Value) -> EslError {
    EslError::InvalidValue(format!(
        "codec {} cannot encode a {} value",
        expected,
        got.type_tag()
    ))
}
