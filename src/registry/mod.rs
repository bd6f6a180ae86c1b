//! registry: процесс-локальная карта ClusterId → живой кластер | Silenced.
//!
//! Жизненный цикл:
//! - `Registry::init(cfg)`: создать корень и пустой registry.json, затем attach;
//! - `Registry::attach(cfg)`: подключиться к существующему хранилищу, все id из
//!   снапшота становятся Silenced;
//! - `get_or_create`: живой → тот же handle; иначе сверка со снапшотом, сборка
//!   (load/force_recreate), активация; новый id сразу попадает в снапшот;
//! - `construct`: прямая сборка, для активного id: DuplicateActiveCluster;
//! - `release` / `detach`.
//!
//! Межпроцессной блокировки нет: один писатель на id.

pub mod snapshot;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cluster::{Cluster, ClusterId};
use crate::codec::CodecRegistry;
use crate::config::{ClusterOptions, EslConfig};
use crate::consts::MANIFEST_FILE;
use crate::error::EslError;

pub use snapshot::{read_snapshot, snapshot_path, write_snapshot};

/// Разделяемый handle живого кластера. Идентичность: `Arc::ptr_eq`.
pub type ClusterHandle = Arc<Mutex<Cluster>>;

/// Захватить кластер; отравленный mutex превращается в ошибку.
pub fn lock(handle: &ClusterHandle) -> Result<MutexGuard<'_, Cluster>> {
    handle.lock().map_err(|_| anyhow!("cluster handle poisoned"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Active,
    Silenced,
}

enum Slot {
    Active(ClusterHandle),
    Silenced,
}

pub struct Registry {
    cfg: EslConfig,
    codecs: Arc<CodecRegistry>,
    slots: BTreeMap<ClusterId, Slot>,
}

impl Registry {
    /// Создать хранилище при необходимости и подключиться к нему.
    pub fn init(cfg: EslConfig) -> Result<Self> {
        let root = cfg.root_dir.clone();
        fs::create_dir_all(&root).map_err(|e| EslError::StoreUnavailable {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        if !snapshot_path(&root).exists() {
            write_snapshot(&root, std::iter::empty(), cfg.pretty, cfg.fsync)
                .with_context(|| format!("init registry snapshot in {}", root.display()))?;
            info!("initialized store at {}", root.display());
        }
        Self::attach(cfg)
    }

    /// Подключиться к существующему хранилищу.
    pub fn attach(cfg: EslConfig) -> Result<Self> {
        let root = cfg.root_dir.clone();
        if !root.is_dir() {
            return Err(EslError::StoreUnavailable {
                path: root.display().to_string(),
                reason: "root directory does not exist".into(),
            }
            .into());
        }
        let ids = read_snapshot(&root)?.unwrap_or_default();
        debug!("attached to {} ({} known clusters)", root.display(), ids.len());
        Ok(Self {
            cfg,
            codecs: Arc::new(CodecRegistry::standard()),
            slots: ids.into_iter().map(|id| (id, Slot::Silenced)).collect(),
        })
    }

    /// Обычная точка входа: init идемпотентен.
    pub fn open(cfg: EslConfig) -> Result<Self> {
        Self::init(cfg)
    }

    /// Заменить набор codec (действует на кластеры, собранные после вызова).
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Arc::new(codecs);
        self
    }

    pub fn root(&self) -> &Path {
        &self.cfg.root_dir
    }

    pub fn config(&self) -> &EslConfig {
        &self.cfg
    }

    pub fn cluster_dir(&self, id: &ClusterId) -> PathBuf {
        self.cfg.root_dir.join(id.key())
    }

    pub fn is_active(&self, id: &ClusterId) -> bool {
        matches!(self.slots.get(id), Some(Slot::Active(_)))
    }

    /// Все известные id и их состояние.
    pub fn known(&self) -> Vec<(ClusterId, ClusterState)> {
        self.slots
            .iter()
            .map(|(id, s)| {
                let st = match s {
                    Slot::Active(_) => ClusterState::Active,
                    Slot::Silenced => ClusterState::Silenced,
                };
                (id.clone(), st)
            })
            .collect()
    }

    /// Живой кластер или новый экземпляр, собранный из каталога.
    pub fn get_or_create(&mut self, id: &ClusterId, options: ClusterOptions) -> Result<ClusterHandle> {
        id.validate()?;
        if let Some(Slot::Active(h)) = self.slots.get(id) {
            debug!("{id}: reuse live cluster");
            return Ok(h.clone());
        }
        self.activate(id, options)
    }

    /// Прямая сборка без переиспользования.
    pub fn construct(&mut self, id: &ClusterId, options: ClusterOptions) -> Result<ClusterHandle> {
        id.validate()?;
        if self.is_active(id) {
            error!("{id}: direct construction of an active cluster");
            return Err(EslError::DuplicateActiveCluster { id: id.key() }.into());
        }
        self.activate(id, options)
    }

    /// Сбросить живой экземпляр. Возвращает true, если он был.
    pub fn release(&mut self, id: &ClusterId) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) if matches!(slot, Slot::Active(_)) => {
                *slot = Slot::Silenced;
                debug!("{id}: released");
                true
            }
            _ => false,
        }
    }

    /// Сохранить снапшот и завершить сессию.
    pub fn detach(self) -> Result<()> {
        self.persist_snapshot()?;
        debug!("detached from {}", self.cfg.root_dir.display());
        Ok(())
    }

    /// Переписать registry.json: снапшот с диска плюс все известные id, всё silenced.
    /// Нечитаемый снапшот: warn, пишем только живую карту.
    pub fn persist_snapshot(&self) -> Result<()> {
        let mut ids = match read_snapshot(&self.cfg.root_dir) {
            Ok(ids) => ids.unwrap_or_default(),
            Err(e) => {
                warn!("{:#}; rewriting registry snapshot from live map", e);
                BTreeSet::new()
            }
        };
        ids.extend(self.slots.keys().cloned());
        write_snapshot(&self.cfg.root_dir, ids.iter(), self.cfg.pretty, self.cfg.fsync)
    }

    /// Собрать кластер без активации: ни карта, ни снапшот не меняются.
    pub(crate) fn open_detached(&self, id: &ClusterId, options: ClusterOptions) -> Result<Cluster> {
        id.validate()?;
        self.build(id, options)
    }

    // -------- internals --------

    /// Перечитать снапшот с диска и добавить неизвестные процессу id как Silenced.
    /// Возвращает true, если `id` есть в снапшоте.
    fn reconcile(&mut self, id: &ClusterId) -> bool {
        let on_disk = match read_snapshot(&self.cfg.root_dir) {
            Ok(ids) => ids.unwrap_or_default(),
            Err(e) => {
                warn!("{:#}; treating registry snapshot as empty", e);
                Default::default()
            }
        };
        let found = on_disk.contains(id);
        for other in on_disk {
            self.slots.entry(other).or_insert(Slot::Silenced);
        }
        found
    }

    fn activate(&mut self, id: &ClusterId, options: ClusterOptions) -> Result<ClusterHandle> {
        let known = self.slots.contains_key(id) || self.reconcile(id);
        let cluster = self.build(id, options)?;
        let handle: ClusterHandle = Arc::new(Mutex::new(cluster));
        self.slots.insert(id.clone(), Slot::Active(handle.clone()));
        if !known {
            self.persist_snapshot()
                .with_context(|| format!("register {id} in snapshot"))?;
            info!("{id}: new cluster registered");
        }
        Ok(handle)
    }

    fn build(&self, id: &ClusterId, options: ClusterOptions) -> Result<Cluster> {
        let dir = self.cluster_dir(id);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let mut cluster = Cluster::new(
            id.clone(),
            dir,
            options,
            self.cfg.pretty,
            self.cfg.fsync,
            self.codecs.clone(),
        );
        if !options.load {
            return Ok(cluster);
        }

        let report = cluster.load()?;
        if report.is_ok() {
            return Ok(cluster);
        }
        if !options.force_recreate {
            let mut failed = report.failed;
            if report.manifest_corrupt {
                failed.insert(0, MANIFEST_FILE.to_string());
            }
            error!("{id}: load failed for {} entries", failed.len());
            return Err(EslError::LoadFailure {
                id: id.key(),
                failed,
            }
            .into());
        }
        warn!(
            "{id}: recreating after failed load ({} entries kept, {} lost)",
            report.loaded,
            report.failed.len()
        );
        cluster.dump()?;
        Ok(cluster)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("root", &self.cfg.root_dir)
            .field("known", &self.slots.len())
            .finish()
    }
}
