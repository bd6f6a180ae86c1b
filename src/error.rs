//! Типизированная таксономия ошибок.
//!
//! Публичные функции возвращают `anyhow::Result`; типизированную причину можно
//! достать через `EslError::kind_of(&err)` или `err.downcast_ref::<EslError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EslError {
    /// Значение вне поддерживаемых доменов (fatal для register).
    #[error("unsupported value type {type_name} for entry '{name}'")]
    UnsupportedType { name: String, type_name: String },

    /// Прямое создание второго живого экземпляра для активного id.
    #[error("cluster {id} is already active in this registry; use get_or_create")]
    DuplicateActiveCluster { id: String },

    /// Manifest есть, но часть payload не читается, а force_recreate не задан.
    #[error("cluster {id} failed to load {} entr(y/ies): {}; use force_recreate to recover", .failed.len(), .failed.join(", "))]
    LoadFailure { id: String, failed: Vec<String> },

    /// Снапшот реестра или manifest кластера не читается.
    #[error("unreadable {what} at {path}: {reason}")]
    ManifestCorrupt {
        what: &'static str,
        path: String,
        reason: String,
    },

    /// Replay не нашёл слот возвращаемого значения.
    #[error("capture {id} is incomplete: missing {slot}")]
    IncompleteCapture { id: String, slot: String },

    #[error("payload not found: {path}")]
    NotFound { path: String },

    #[error("corrupt payload {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// attach к несуществующему/недоступному корню хранилища.
    #[error("store root {path} is unavailable: {reason}")]
    StoreUnavailable { path: String, reason: String },

    /// Значение нарушает инварианты своего домена (shape, размеры колонок и т.п.).
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Короткий дискриминант для сопоставления в тестах и на call‑site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedType,
    DuplicateActiveCluster,
    LoadFailure,
    ManifestCorrupt,
    IncompleteCapture,
    NotFound,
    Corrupt,
    StoreUnavailable,
    InvalidValue,
}

impl EslError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EslError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            EslError::DuplicateActiveCluster { .. } => ErrorKind::DuplicateActiveCluster,
            EslError::LoadFailure { .. } => ErrorKind::LoadFailure,
            EslError::ManifestCorrupt { .. } => ErrorKind::ManifestCorrupt,
            EslError::IncompleteCapture { .. } => ErrorKind::IncompleteCapture,
            EslError::NotFound { .. } => ErrorKind::NotFound,
            EslError::Corrupt { .. } => ErrorKind::Corrupt,
            EslError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            EslError::InvalidValue(_) => ErrorKind::InvalidValue,
        }
    }

    /// Найти EslError в цепочке anyhow (включая обёртки .context()).
    pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
        err.chain()
            .find_map(|e| e.downcast_ref::<EslError>())
            .map(|e| e.kind())
    }

    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        EslError::Corrupt {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn kind_of_sees_through_context() {
        let r: anyhow::Result<()> = Err(EslError::IncompleteCapture {
            id: "func@f".into(),
            slot: "__ret_0__".into(),
        })
        .context("replay f");
        let err = r.unwrap_err();
        assert_eq!(EslError::kind_of(&err), Some(ErrorKind::IncompleteCapture));
    }

    #[test]
    fn load_failure_message_lists_entries() {
        let e = EslError::LoadFailure {
            id: "glb@x".into(),
            failed: vec!["prim-a".into(), "array-b".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("prim-a, array-b"), "got: {msg}");
    }
}
