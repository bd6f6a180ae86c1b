//! capture: запись входов/выходов функции в кластер `func@<name>` и replay из него.
//!
//! Запись (capture_call):
//! - кластер открывается с ClusterOptions::capture() (без load, без auto-save) и очищается;
//! - каждый kwarg регистрируется под своим именем;
//! - результат нормализуется в последовательность: `__ret_len__` + `__ret_<i>__`;
//! - один dump в конце; вызывающему возвращается исходная форма результата.
//!
//! Replay (replay_capture) функцию не вызывает: читает `__ret_len__` и ищет каждый
//! `__ret_<i>__` по партициям в порядке TypeTag::ALL. Пропуск → IncompleteCapture.

use anyhow::Result;
use log::{debug, info};
use std::collections::BTreeMap;

use crate::cluster::{Cluster, ClusterId};
use crate::config::ClusterOptions;
use crate::consts::{ret_slot, RET_LEN};
use crate::error::EslError;
use crate::registry::{lock, Registry};
use crate::value::{TypeTag, Value};

/// Именованные аргументы вызова.
pub type Kwargs = BTreeMap<String, Value>;

/// Собрать Kwargs из пар (имя, значение).
pub fn kwargs<I, S, V>(items: I) -> Kwargs
where
    I: IntoIterator<Item = (S, V)>,
    S: Into<String>,
    V: Into<Value>,
{
    items
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Результат функции: одно значение или последовательность.
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
    One(Value),
    Many(Vec<Value>),
}

impl Returned {
    pub fn len(&self) -> usize {
        match self {
            Returned::One(_) => 1,
            Returned::Many(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_one(&self) -> Option<&Value> {
        match self {
            Returned::One(v) => Some(v),
            Returned::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Value]> {
        match self {
            Returned::One(_) => None,
            Returned::Many(vs) => Some(vs),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Returned::One(v) => vec![v],
            Returned::Many(vs) => vs,
        }
    }

    /// Обратная нормализация: ровно одно значение → One.
    fn from_values(mut vs: Vec<Value>) -> Self {
        if vs.len() == 1 {
            Returned::One(vs.remove(0))
        } else {
            Returned::Many(vs)
        }
    }
}

impl From<Value> for Returned {
    fn from(v: Value) -> Self {
        Returned::One(v)
    }
}

impl From<Vec<Value>> for Returned {
    fn from(vs: Vec<Value>) -> Self {
        Returned::Many(vs)
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Returned {
    fn from((a, b): (A, B)) -> Self {
        Returned::Many(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Returned {
    fn from((a, b, c): (A, B, C)) -> Self {
        Returned::Many(vec![a.into(), b.into(), c.into()])
    }
}

/// Ссылка на записанный вызов: кластер `func@<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    id: ClusterId,
}

impl CaptureRecord {
    pub fn for_function(func_name: &str) -> Self {
        Self {
            id: ClusterId::function(func_name),
        }
    }

    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    /// Записанные kwargs (все записи, кроме слотов результата).
    pub fn inputs(&self, reg: &mut Registry) -> Result<Kwargs> {
        let handle = reg.get_or_create(&self.id, ClusterOptions::replay())?;
        let cluster = lock(&handle)?;
        let mut out = Kwargs::new();
        for tag in TypeTag::ALL {
            for name in cluster.names(tag) {
                if is_ret_slot(name) || out.contains_key(name) {
                    continue;
                }
                if let Some(v) = cluster.get(tag, name) {
                    out.insert(name.to_string(), v.clone());
                }
            }
        }
        Ok(out)
    }
}

fn is_ret_slot(name: &str) -> bool {
    name == RET_LEN
        || name
            .strip_prefix("__ret_")
            .and_then(|s| s.strip_suffix("__"))
            .is_some_and(|i| !i.is_empty() && i.bytes().all(|b| b.is_ascii_digit()))
}

/// Вызвать `f` и записать его входы и выходы.
pub fn capture_call<F, R>(
    reg: &mut Registry,
    func_name: &str,
    f: F,
    kwargs: Kwargs,
) -> Result<(Returned, CaptureRecord)>
where
    F: FnOnce(&Kwargs) -> R,
    R: Into<Returned>,
{
    let record = CaptureRecord::for_function(func_name);
    let handle = reg.get_or_create(record.id(), ClusterOptions::capture())?;

    let saved_auto = {
        let mut cluster = lock(&handle)?;
        let saved = cluster.options().auto_save;
        cluster.set_auto_save(false);
        cluster.clear();
        cluster.register_many(kwargs.iter().map(|(k, v)| (k.clone(), v.clone())))?;
        saved
    };

    let returned: Returned = f(&kwargs).into();

    let mut cluster = lock(&handle)?;
    let outcome = record_returns(&mut cluster, &returned);
    cluster.set_auto_save(saved_auto);
    outcome?;
    info!("{}: captured {} input(s), {} output(s)", record.id(), kwargs.len(), returned.len());
    Ok((returned, record))
}

fn record_returns(cluster: &mut Cluster, returned: &Returned) -> Result<()> {
    let values: Vec<Value> = match returned {
        Returned::One(v) => vec![v.clone()],
        Returned::Many(vs) => vs.clone(),
    };
    cluster.register(RET_LEN, values.len() as i64)?;
    cluster.register_many(values.into_iter().enumerate().map(|(i, v)| (ret_slot(i), v)))?;
    let report = cluster.dump()?;
    debug!("{}: capture dump {:?}", cluster.id(), report);
    Ok(())
}

/// Восстановить результат записанного вызова без вызова функции.
pub fn replay_capture(reg: &mut Registry, record: &CaptureRecord) -> Result<Returned> {
    let handle = reg.get_or_create(record.id(), ClusterOptions::replay())?;
    let cluster = lock(&handle)?;
    let missing = |slot: String| EslError::IncompleteCapture {
        id: record.id().key(),
        slot,
    };

    let n = cluster
        .get(TypeTag::Primitive, RET_LEN)
        .and_then(Value::as_primitive)
        .and_then(|p| p.as_i64())
        .filter(|n| *n >= 0)
        .ok_or_else(|| missing(RET_LEN.to_string()))?;

    let mut values = Vec::with_capacity(n as usize);
    for i in 0..n as usize {
        let slot = ret_slot(i);
        match cluster.find(&slot) {
            Some((_, v)) => values.push(v.clone()),
            None => return Err(missing(slot).into()),
        }
    }
    debug!("{}: replayed {} output(s)", record.id(), values.len());
    Ok(Returned::from_values(values))
}

/// Обёртка, записывающая каждый вызов `f`.
pub struct Captured<F> {
    record: CaptureRecord,
    f: F,
}

pub fn capture_on_call<F>(func_name: &str, f: F) -> Captured<F> {
    Captured {
        record: CaptureRecord::for_function(func_name),
        f,
    }
}

impl<F> Captured<F> {
    pub fn record(&self) -> &CaptureRecord {
        &self.record
    }

    pub fn call<R>(&mut self, reg: &mut Registry, kwargs: Kwargs) -> Result<Returned>
    where
        F: FnMut(&Kwargs) -> R,
        R: Into<Returned>,
    {
        let f = &mut self.f;
        let (ret, _) = capture_call(reg, self.record.id().name(), |kw: &Kwargs| f(kw), kwargs)?;
        Ok(ret)
    }
}

/// Обёртка, отдающая записанный результат вместо вызова.
#[derive(Debug, Clone)]
pub struct Replayed {
    record: CaptureRecord,
}

pub fn replay_from_capture(func_name: &str) -> Replayed {
    Replayed {
        record: CaptureRecord::for_function(func_name),
    }
}

impl Replayed {
    pub fn record(&self) -> &CaptureRecord {
        &self.record
    }

    /// Аргументы не сверяются с записанными: отдаётся последний записанный результат.
    pub fn call(&self, reg: &mut Registry, _kwargs: Kwargs) -> Result<Returned> {
        replay_capture(reg, &self.record)
    }
}
