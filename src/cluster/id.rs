//! cluster/id: идентификатор кластера `<kind>@<name>` (он же имя каталога).

use std::fmt;
use std::str::FromStr;

use crate::error::EslError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterKind {
    /// Пользовательские данные.
    General,
    /// Запись входов/выходов функции (capture/replay).
    Function,
}

impl ClusterKind {
    pub fn id(self) -> &'static str {
        match self {
            ClusterKind::General => "glb",
            ClusterKind::Function => "func",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId {
    kind: ClusterKind,
    name: String,
}

impl ClusterId {
    pub fn new(kind: ClusterKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn general(name: impl Into<String>) -> Self {
        Self::new(ClusterKind::General, name)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(ClusterKind::Function, name)
    }

    pub fn kind(&self) -> ClusterKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Строковый ключ (registry.json) и имя каталога кластера.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Имя идёт в путь: без разделителей, не пустое, не "."/"..".
    pub fn validate(&self) -> Result<(), EslError> {
        let n = self.name.as_str();
        if n.is_empty() || n == "." || n == ".." || n.contains(['/', '\\', '\0']) {
            return Err(EslError::InvalidValue(format!(
                "invalid cluster name '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind.id(), self.name)
    }
}

impl FromStr for ClusterId {
    type Err = EslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('@')
            .ok_or_else(|| EslError::InvalidValue(format!("cluster id '{s}' has no '@'")))?;
        let kind = match kind {
            "glb" => ClusterKind::General,
            "func" => ClusterKind::Function,
            other => {
                return Err(EslError::InvalidValue(format!(
                    "unknown cluster kind '{other}' in '{s}'"
                )))
            }
        };
        let id = ClusterId::new(kind, name);
        id.validate()?;
        Ok(id)
    }
}
