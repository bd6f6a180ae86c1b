//! manifest: per‑cluster manifest.json.
//!
//! Формат (JSON, serde_json):
//! {
//!   "prim":   { "prim-a1": "prim-a1.json", ... },
//!   "array":  { "array-a1": "array-a1.arr" },
//!   "table":  {}, "lgraph": {}, "ggraph": {}, "tensor": {}
//! }
//! tag → save-name → относительный путь payload. Все шесть тегов присутствуют всегда.
//! Файл переписывается целиком (tmp+rename) при каждом dump.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::consts::MANIFEST_FILE;
use crate::error::EslError;
use crate::util::{read_existing, write_atomic};
use crate::value::TypeTag;

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    entries: BTreeMap<TypeTag, BTreeMap<String, String>>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            entries: TypeTag::ALL.into_iter().map(|t| (t, BTreeMap::new())).collect(),
        }
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: TypeTag, save_name: String, rel_path: String) {
        self.entries.entry(tag).or_default().insert(save_name, rel_path);
    }

    pub fn get(&self, tag: TypeTag, save_name: &str) -> Option<&str> {
        self.entries.get(&tag)?.get(save_name).map(String::as_str)
    }

    /// Все записи в порядке TypeTag::ALL: (tag, save_name, rel_path).
    pub fn iter(&self) -> impl Iterator<Item = (TypeTag, &str, &str)> + '_ {
        self.entries
            .iter()
            .flat_map(|(t, m)| m.iter().map(move |(s, p)| (*t, s.as_str(), p.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_json(&self) -> BTreeMap<&'static str, &BTreeMap<String, String>> {
        self.entries.iter().map(|(t, m)| (t.id(), m)).collect()
    }

    fn from_json(raw: BTreeMap<String, BTreeMap<String, String>>) -> Result<Self, String> {
        let mut m = Manifest::new();
        for (tag, names) in raw {
            let tag: TypeTag = tag.parse().map_err(|e: EslError| e.to_string())?;
            for (save_name, rel) in names {
                m.insert(tag, save_name, rel);
            }
        }
        Ok(m)
    }
}

pub fn manifest_path(cluster_dir: &Path) -> PathBuf {
    cluster_dir.join(MANIFEST_FILE)
}

/// Записать manifest атомарно.
pub fn write_manifest(cluster_dir: &Path, m: &Manifest, pretty: bool, fsync: bool) -> Result<()> {
    let path = manifest_path(cluster_dir);
    let json = if pretty {
        serde_json::to_vec_pretty(&m.to_json())
    } else {
        serde_json::to_vec(&m.to_json())
    }
    .context("serialize manifest")?;
    write_atomic(&path, &json, fsync)
}

/// Прочитать manifest. Ok(None): файла нет; нечитаемый файл: ManifestCorrupt.
pub fn read_manifest(cluster_dir: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(cluster_dir);
    let corrupt = |reason: String| EslError::ManifestCorrupt {
        what: "manifest",
        path: path.display().to_string(),
        reason,
    };
    let bytes = match read_existing(&path) {
        Ok(Some(b)) => b,
        Ok(None) => return Ok(None),
        Err(e) => return Err(corrupt(format!("{e:#}")).into()),
    };
    let raw: BTreeMap<String, BTreeMap<String, String>> =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
    let m = Manifest::from_json(raw).map_err(corrupt)?;
    Ok(Some(m))
}
