//! cluster: именованное хранилище, разбитое по TypeTag.
//!
//! Данные: tag → (name → Entry{value, persisted}).
//! - register*: классификация + upsert в слот (tag, name), persisted=false;
//!   при auto_save сразу dump().
//! - dump(): кодирует только записи с persisted=false и после успешной записи ставит
//!   persisted=true; manifest.json переписывается целиком (см. dump.rs).
//! - load(): восстановление по manifest с частичным восстановлением (см. load.rs).
//! - view()/flattened_view(): read-only снимки (см. view.rs).
//!
//! Одно и то же имя может одновременно жить в нескольких тегах.

mod dump;
pub mod id;
mod load;
pub mod view;

pub use dump::DumpReport;
pub use id::{ClusterId, ClusterKind};
pub use load::LoadReport;
pub use view::{ClusterView, FlatView};

use anyhow::Result;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::{validate_entry_name, CodecRegistry};
use crate::config::ClusterOptions;
use crate::value::{classify_any, DynValue, TypeTag, Value};

/// Значение в слоте (tag, name) и признак "уже записано на диск".
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    value: Value,
    persisted: bool,
}

impl Entry {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

pub struct Cluster {
    id: ClusterId,
    dir: PathBuf,
    options: ClusterOptions,
    pretty: bool,
    fsync: bool,
    codecs: Arc<CodecRegistry>,
    data: BTreeMap<TypeTag, BTreeMap<String, Entry>>,
}

impl Cluster {
    /// Создаётся только реестром (Registry::construct / get_or_create).
    pub(crate) fn new(
        id: ClusterId,
        dir: PathBuf,
        options: ClusterOptions,
        pretty: bool,
        fsync: bool,
        codecs: Arc<CodecRegistry>,
    ) -> Self {
        Self {
            id,
            dir,
            options,
            pretty,
            fsync,
            codecs,
            data: TypeTag::ALL.into_iter().map(|t| (t, BTreeMap::new())).collect(),
        }
    }

    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    /// Каталог кластера (<root>/<kind>@<name>).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> ClusterOptions {
        self.options
    }

    pub fn set_auto_save(&mut self, on: bool) {
        self.options.auto_save = on;
    }

    // -------- register --------

    fn insert(&mut self, name: String, value: Value) {
        let tag = self.codecs.classify(&value);
        debug!("{}: register {}/{}", self.id, tag, name);
        self.data.entry(tag).or_default().insert(
            name,
            Entry {
                value,
                persisted: false,
            },
        );
    }

    fn auto_dump(&mut self) -> Result<()> {
        if self.options.auto_save {
            self.dump()?;
        }
        Ok(())
    }

    /// Зарегистрировать одно значение. Перезапись (tag, name) сбрасывает persisted.
    pub fn register<V: Into<Value>>(&mut self, name: &str, value: V) -> Result<()> {
        validate_entry_name(name)?;
        self.insert(name.to_string(), value.into());
        self.auto_dump()
    }

    /// Пакетная регистрация; имена проверяются до первой вставки, dump один раз в конце.
    pub fn register_many<I, S, V>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        let batch: Vec<(String, Value)> = items
            .into_iter()
            .map(|(n, v)| (n.into(), v.into()))
            .collect();
        for (name, _) in &batch {
            validate_entry_name(name)?;
        }
        for (name, value) in batch {
            self.insert(name, value);
        }
        self.auto_dump()
    }

    /// Регистрация произвольных значений с динамической классификацией.
    /// Политика all-or-nothing: сначала классифицируются все значения; если хоть одно
    /// неподдерживаемое: UnsupportedType, и кластер не меняется.
    pub fn register_dyn(&mut self, items: &[(&str, &dyn DynValue)]) -> Result<()> {
        let mut batch = Vec::with_capacity(items.len());
        for (name, value) in items {
            validate_entry_name(name)?;
            batch.push((name.to_string(), classify_any(name, *value)?));
        }
        for (name, value) in batch {
            self.insert(name, value);
        }
        self.auto_dump()
    }

    // -------- доступ --------

    pub fn get(&self, tag: TypeTag, name: &str) -> Option<&Value> {
        self.data.get(&tag)?.get(name).map(|e| &e.value)
    }

    pub fn entry(&self, tag: TypeTag, name: &str) -> Option<&Entry> {
        self.data.get(&tag)?.get(name)
    }

    /// Первое совпадение по имени в порядке TypeTag::ALL.
    pub fn find(&self, name: &str) -> Option<(TypeTag, &Value)> {
        TypeTag::ALL
            .into_iter()
            .find_map(|t| self.get(t, name).map(|v| (t, v)))
    }

    /// Все теги, под которыми зарегистрировано имя.
    pub fn tags_of(&self, name: &str) -> Vec<TypeTag> {
        TypeTag::ALL
            .into_iter()
            .filter(|t| self.get(*t, name).is_some())
            .collect()
    }

    pub fn names(&self, tag: TypeTag) -> Vec<&str> {
        self.data
            .get(&tag)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Убрать запись из памяти. Payload на диске остаётся, из manifest запись уйдёт при
    /// следующем dump.
    pub fn remove(&mut self, tag: TypeTag, name: &str) -> Option<Value> {
        self.data.get_mut(&tag)?.remove(name).map(|e| e.value)
    }

    /// Очистить все партиции (без dump).
    pub fn clear(&mut self) {
        for m in self.data.values_mut() {
            m.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Число записей, ещё не записанных на диск.
    pub fn pending(&self) -> usize {
        self.data
            .values()
            .flat_map(BTreeMap::values)
            .filter(|e| !e.persisted)
            .count()
    }
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.id.key())
            .field("dir", &self.dir)
            .field("entries", &self.len())
            .field("pending", &self.pending())
            .finish()
    }
}
