//! cluster/load: восстановление кластера из manifest.json.
//!
//! - нет manifest → пустая успешная загрузка;
//! - manifest нечитаем → warn, считаем пустым, manifest_corrupt=true;
//! - каждая запись декодируется отдельно; NotFound/Corrupt → warn и skip;
//! - загруженные записи заменяют состояние в памяти и помечаются persisted.

use anyhow::Result;
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Component, Path};

use super::{Cluster, Entry};
use crate::codec::parse_save_name;
use crate::error::EslError;
use crate::manifest::read_manifest;
use crate::value::TypeTag;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// save-name записей, которые не удалось восстановить.
    pub failed: Vec<String>,
    pub manifest_corrupt: bool,
}

impl LoadReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty() && !self.manifest_corrupt
    }
}

/// Путь payload: ровно одно имя файла внутри каталога кластера.
fn plain_file_name(rel: &str) -> bool {
    let mut comps = Path::new(rel).components();
    matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None))
}

impl Cluster {
    pub fn load(&mut self) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let manifest = match read_manifest(&self.dir) {
            Ok(Some(m)) => m,
            Ok(None) => {
                info!("{}: no manifest, starting empty", self.id);
                return Ok(report);
            }
            Err(e) => {
                warn!("{}: {:#}; treating as empty", self.id, e);
                report.manifest_corrupt = true;
                return Ok(report);
            }
        };

        let mut data: BTreeMap<TypeTag, BTreeMap<String, Entry>> =
            TypeTag::ALL.into_iter().map(|t| (t, BTreeMap::new())).collect();

        for (tag, sname, rel) in manifest.iter() {
            let name = match parse_save_name(sname) {
                Some((t, name)) if t == tag => name,
                _ => {
                    warn!("{}: save-name '{}' does not match tag {}", self.id, sname, tag);
                    report.failed.push(sname.to_string());
                    continue;
                }
            };
            if !plain_file_name(rel) {
                warn!("{}: refusing payload path '{}' for {}", self.id, rel, sname);
                report.failed.push(sname.to_string());
                continue;
            }
            match self.codecs.codec(tag).decode(&self.dir.join(rel)) {
                Ok(value) => {
                    data.entry(tag).or_default().insert(
                        name.to_string(),
                        Entry {
                            value,
                            persisted: true,
                        },
                    );
                    report.loaded += 1;
                }
                Err(e) => {
                    match EslError::kind_of(&e) {
                        Some(kind) => warn!("{}: skip {} ({:?}): {:#}", self.id, sname, kind, e),
                        None => warn!("{}: skip {}: {:#}", self.id, sname, e),
                    }
                    report.failed.push(sname.to_string());
                }
            }
        }

        self.data = data;
        info!(
            "{}: load loaded={} failed={}",
            self.id,
            report.loaded,
            report.failed.len()
        );
        Ok(report)
    }
}
