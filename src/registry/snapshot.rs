//! registry/snapshot: <root>/registry.json.
//!
//! Формат:
//! { "glb@global": "silenced", "func@train": "silenced" }
//! Отсутствующий id: неизвестный кластер. Запись атомарная (tmp+rename).

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::cluster::ClusterId;
use crate::consts::{REGISTRY_FILE, SILENCED};
use crate::error::EslError;
use crate::util::{read_existing, write_atomic};

pub fn snapshot_path(root: &Path) -> PathBuf {
    root.join(REGISTRY_FILE)
}

/// Ok(None): снапшота нет. Нечитаемый JSON, чужой статус или кривой id: ManifestCorrupt.
pub fn read_snapshot(root: &Path) -> Result<Option<BTreeSet<ClusterId>>> {
    let path = snapshot_path(root);
    let corrupt = |reason: String| EslError::ManifestCorrupt {
        what: "registry snapshot",
        path: path.display().to_string(),
        reason,
    };
    let bytes = match read_existing(&path) {
        Ok(Some(b)) => b,
        Ok(None) => return Ok(None),
        Err(e) => return Err(corrupt(format!("{e:#}")).into()),
    };
    let raw: BTreeMap<String, String> =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;

    let mut ids = BTreeSet::new();
    for (key, status) in raw {
        if status != SILENCED {
            return Err(corrupt(format!("unexpected status '{status}' for {key}")).into());
        }
        let id: ClusterId = key.parse().map_err(|e: EslError| corrupt(e.to_string()))?;
        ids.insert(id);
    }
    Ok(Some(ids))
}

/// Переписать снапшот целиком: все переданные id: "silenced".
pub fn write_snapshot<'a, I>(root: &Path, ids: I, pretty: bool, fsync: bool) -> Result<()>
where
    I: IntoIterator<Item = &'a ClusterId>,
{
    let raw: BTreeMap<String, &str> = ids.into_iter().map(|id| (id.key(), SILENCED)).collect();
    let json = if pretty {
        serde_json::to_vec_pretty(&raw)
    } else {
        serde_json::to_vec(&raw)
    }
    .context("serialize registry.json")?;
    write_atomic(&snapshot_path(root), &json, fsync)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tmp_root(tag: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("esl-snap-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&p);
        fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn snapshot_roundtrip_and_format() {
        let root = tmp_root("rt");
        assert!(read_snapshot(&root).unwrap().is_none());

        let ids = [ClusterId::general("global"), ClusterId::function("train")];
        write_snapshot(&root, ids.iter(), false, false).unwrap();

        let text = fs::read_to_string(snapshot_path(&root)).unwrap();
        assert_eq!(text, r#"{"func@train":"silenced","glb@global":"silenced"}"#);

        let back = read_snapshot(&root).unwrap().unwrap();
        assert_eq!(back.len(), 2);
        assert!(back.contains(&ClusterId::function("train")));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let root = tmp_root("bad");
        fs::write(snapshot_path(&root), r#"{"glb@x":"active"}"#).unwrap();
        let err = read_snapshot(&root).unwrap_err();
        assert_eq!(
            EslError::kind_of(&err),
            Some(crate::error::ErrorKind::ManifestCorrupt)
        );
        let _ = fs::remove_dir_all(&root);
    }
}
