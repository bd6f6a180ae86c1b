//! cluster/dump: запись кластера на диск.
//!
//! Политика skip-if-persisted:
//! - запись с persisted=false кодируется; после успешного encode persisted=true;
//! - запись с persisted=true не перекодируется, но остаётся в manifest;
//! - ошибка encode одной записи: warn, запись остаётся pending и не попадает в manifest;
//! - manifest.json переписывается целиком; ошибка его записи фатальна.

use anyhow::{Context, Result};
use log::{info, warn};

use super::Cluster;
use crate::codec::save_name;
use crate::manifest::{write_manifest, Manifest};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    /// Записей закодировано в этом dump.
    pub encoded: usize,
    /// Записей пропущено (уже на диске).
    pub skipped: usize,
    /// save-name записей, которые не удалось закодировать.
    pub failed: Vec<String>,
}

impl DumpReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Cluster {
    pub fn dump(&mut self) -> Result<DumpReport> {
        let mut manifest = Manifest::new();
        let mut report = DumpReport::default();

        for (tag, entries) in self.data.iter_mut() {
            let codec = self.codecs.codec(*tag);
            for (name, entry) in entries.iter_mut() {
                let sname = save_name(*tag, name);
                let file = self.codecs.payload_file(*tag, name);
                if entry.persisted {
                    report.skipped += 1;
                    manifest.insert(*tag, sname, file);
                    continue;
                }
                match codec.encode(&entry.value, &self.dir.join(&file)) {
                    Ok(()) => {
                        entry.persisted = true;
                        report.encoded += 1;
                        manifest.insert(*tag, sname, file);
                    }
                    Err(e) => {
                        warn!("{}: failed to encode {}: {:#}", self.id, sname, e);
                        report.failed.push(sname);
                    }
                }
            }
        }

        write_manifest(&self.dir, &manifest, self.pretty, self.fsync)
            .with_context(|| format!("write manifest of {}", self.id))?;
        info!(
            "{}: dump encoded={} skipped={} failed={}",
            self.id,
            report.encoded,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }
}
