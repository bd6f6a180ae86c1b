//! cli: инспекция хранилища: `esl ls | show <id> | verify <id>`.
//!
//! Только чтение через публичный API (attach, manifest, load). Корень берётся из
//! --root, иначе из ESL_ROOT_DIR/дефолта.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cluster::{ClusterId, LoadReport};
use crate::config::{ClusterOptions, EslConfig};
use crate::error::EslError;
use crate::manifest::read_manifest;
use crate::registry::{read_snapshot, Registry};

#[derive(Parser, Debug)]
#[command(
    name = "esl",
    version,
    about = "Inspect an easysl store: clusters, manifests, payload health",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Корень хранилища (по умолчанию ESL_ROOT_DIR или .esl_store).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Список кластеров (снапшот + каталоги).
    Ls {
        #[arg(long)]
        json: bool,
    },
    /// Записи manifest кластера, например `glb@global`.
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Декодировать все payload кластера; ненулевой код при ошибках.
    Verify { id: String },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = match cli.root {
        Some(root) => EslConfig::from_env().with_root_dir(root),
        None => EslConfig::from_env(),
    };
    match cli.cmd {
        Cmd::Ls { json } => cmd_ls(&cfg, json),
        Cmd::Show { id, json } => cmd_show(&cfg, &id.parse()?, json),
        Cmd::Verify { id } => {
            let report = cmd_verify(&cfg, &id.parse()?)?;
            if report.is_ok() {
                Ok(())
            } else {
                Err(anyhow!("{} entr(y/ies) failed verification", report.failed.len()))
            }
        }
    }
}

fn require_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(EslError::StoreUnavailable {
            path: root.display().to_string(),
            reason: "root directory does not exist".into(),
        }
        .into());
    }
    Ok(())
}

/// Кластеры из снапшота и из каталогов `<kind>@<name>` под корнем.
pub fn list_clusters(root: &Path) -> Result<BTreeSet<ClusterId>> {
    require_root(root)?;
    let mut ids = read_snapshot(root)?.unwrap_or_default();
    for ent in fs::read_dir(root)? {
        let ent = ent?;
        if !ent.file_type()?.is_dir() {
            continue;
        }
        if let Some(id) = ent.file_name().to_str().and_then(|s| s.parse::<ClusterId>().ok()) {
            ids.insert(id);
        }
    }
    Ok(ids)
}

pub fn cmd_ls(cfg: &EslConfig, as_json: bool) -> Result<()> {
    let root = &cfg.root_dir;
    let mut rows = Vec::new();
    for id in list_clusters(root)? {
        let dir = root.join(id.key());
        let entries = match read_manifest(&dir) {
            Ok(Some(m)) => Some(m.len()),
            Ok(None) => Some(0),
            Err(_) => None,
        };
        rows.push((id, entries));
    }

    if as_json {
        let arr: Vec<_> = rows
            .iter()
            .map(|(id, n)| json!({ "id": id.key(), "entries": n, "manifest_ok": n.is_some() }))
            .collect();
        println!("{}", serde_json::to_string(&arr)?);
        return Ok(());
    }

    println!("store: {}", root.display());
    for (id, n) in rows {
        match n {
            Some(n) => println!("  {:<32} {} entries", id.key(), n),
            None => println!("  {:<32} <corrupt manifest>", id.key()),
        }
    }
    Ok(())
}

pub fn cmd_show(cfg: &EslConfig, id: &ClusterId, as_json: bool) -> Result<()> {
    require_root(&cfg.root_dir)?;
    let dir = cfg.root_dir.join(id.key());
    let manifest = read_manifest(&dir)?.ok_or_else(|| EslError::NotFound {
        path: dir.display().to_string(),
    })?;

    let rows: Vec<_> = manifest
        .iter()
        .map(|(tag, sname, rel)| {
            let size = fs::metadata(dir.join(rel)).map(|m| m.len()).ok();
            (tag, sname, rel, size)
        })
        .collect();

    if as_json {
        let arr: Vec<_> = rows
            .iter()
            .map(|(tag, sname, rel, size)| {
                json!({ "tag": tag.id(), "save_name": sname, "path": rel, "bytes": size })
            })
            .collect();
        println!("{}", serde_json::to_string(&json!({ "id": id.key(), "entries": arr }))?);
        return Ok(());
    }

    println!("{} ({} entries)", id, rows.len());
    for (tag, sname, rel, size) in rows {
        let size = size.map_or_else(|| "missing".to_string(), |b| format!("{b} B"));
        println!("  {:<7} {:<32} {:<40} {}", tag.id(), sname, rel, size);
    }
    Ok(())
}

/// Полная загрузка кластера без активации: каждый payload декодируется,
/// registry.json не переписывается.
pub fn cmd_verify(cfg: &EslConfig, id: &ClusterId) -> Result<LoadReport> {
    let reg = Registry::attach(cfg.clone())?;
    if !reg.cluster_dir(id).is_dir() {
        return Err(EslError::NotFound {
            path: reg.cluster_dir(id).display().to_string(),
        }
        .into());
    }
    let opts = ClusterOptions::new().load(false).auto_save(false);
    let mut cluster = reg.open_detached(id, opts)?;
    let report = cluster.load()?;

    if report.manifest_corrupt {
        println!("{id}: manifest is corrupt");
    }
    println!("{id}: {} ok, {} failed", report.loaded, report.failed.len());
    for f in &report.failed {
        println!("  FAIL {f}");
    }
    Ok(report)
}
