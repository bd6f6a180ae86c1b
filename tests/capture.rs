use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use easysl::consts::RET_LEN;
use easysl::{
    capture_call, capture_on_call, kwargs, lock, replay_capture, replay_from_capture,
    CaptureRecord, ClusterId, ClusterOptions, ErrorKind, EslConfig, EslError, Kwargs,
    NumericArray, Primitive, Registry, Returned, TypeTag, Value,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("esltest-capture-{prefix}-{pid}-{t}-{id}"))
}

fn open(root: &PathBuf) -> Result<Registry> {
    Registry::open(EslConfig::at(root).with_pretty(false))
}

fn sum_b(kw: &Kwargs) -> Value {
    let a = kw["a"].as_primitive().and_then(Primitive::as_i64).unwrap_or(0);
    let b: i64 = kw["b"]
        .as_primitive()
        .and_then(Primitive::as_list)
        .map(|l| l.iter().filter_map(Primitive::as_i64).sum())
        .unwrap_or(0);
    Value::from(a + b)
}

/// f(a=1, b=[1,2,3]) → одно значение; кластер хранит входы и единственный выход.
#[test]
fn capture_is_transparent_for_single_value() -> Result<()> {
    let root = unique_root("single");
    let mut reg = open(&root)?;
    let args = kwargs([("a", Value::from(1)), ("b", Value::from(vec![1, 2, 3]))]);

    let (ret, record) = capture_call(&mut reg, "f", sum_b, args.clone())?;
    assert_eq!(ret, Returned::One(Value::from(7)));
    assert_eq!(record.id(), &ClusterId::function("f"));

    {
        let h = reg.get_or_create(record.id(), ClusterOptions::replay())?;
        let c = lock(&h)?;
        assert_eq!(c.get(TypeTag::Primitive, "a"), Some(&Value::from(1)));
        assert_eq!(c.get(TypeTag::Primitive, "b"), Some(&Value::from(vec![1, 2, 3])));
        assert_eq!(c.get(TypeTag::Primitive, RET_LEN), Some(&Value::from(1)));
        assert_eq!(c.get(TypeTag::Primitive, "__ret_0__"), Some(&Value::from(7)));
        assert_eq!(c.len(), 4);
        assert_eq!(c.pending(), 0);
    }
    reg.detach()?;

    // новый реестр: replay с диска, функция не вызывается
    let mut reg = open(&root)?;
    assert_eq!(replay_capture(&mut reg, &record)?, Returned::One(Value::from(7)));
    assert_eq!(record.inputs(&mut reg)?, args);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// g(...) → (x, y): два слота, вызывающий получает пару без изменений.
#[test]
fn capture_keeps_multiple_returns() -> Result<()> {
    let root = unique_root("multi");
    let mut reg = open(&root)?;
    let x = NumericArray::from(vec![0.5, 1.5]);

    let (ret, record) = capture_call(
        &mut reg,
        "g",
        |kw: &Kwargs| (kw["n"].clone(), x.clone()),
        kwargs([("n", 3)]),
    )?;
    let expected = Returned::Many(vec![Value::from(3), Value::from(x.clone())]);
    assert_eq!(ret, expected);

    {
        let h = reg.get_or_create(record.id(), ClusterOptions::replay())?;
        let c = lock(&h)?;
        assert_eq!(c.get(TypeTag::Primitive, RET_LEN), Some(&Value::from(2)));
        assert_eq!(c.get(TypeTag::Primitive, "__ret_0__"), Some(&Value::from(3)));
        assert_eq!(c.get(TypeTag::NumericArray, "__ret_1__"), Some(&Value::from(x)));
    }
    reg.detach()?;

    let mut reg = open(&root)?;
    assert_eq!(replay_capture(&mut reg, &record)?, expected);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// Повторный capture той же функции начинает запись с чистого листа.
#[test]
fn recapture_replaces_previous_record() -> Result<()> {
    let root = unique_root("again");
    let mut reg = open(&root)?;

    capture_call(&mut reg, "h", |_: &Kwargs| (1, 2), kwargs([("old", 1)]))?;
    capture_call(&mut reg, "h", |_: &Kwargs| Value::from("one"), kwargs([("new", 2)]))?;
    reg.detach()?;

    let mut reg = open(&root)?;
    let record = CaptureRecord::for_function("h");
    assert_eq!(replay_capture(&mut reg, &record)?, Returned::One(Value::from("one")));
    let inputs = record.inputs(&mut reg)?;
    assert_eq!(inputs.keys().collect::<Vec<_>>(), vec!["new"]);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn replay_without_a_slot_is_incomplete() -> Result<()> {
    let root = unique_root("incomplete");
    let mut reg = open(&root)?;

    // никогда не записывалась
    let err = replay_capture(&mut reg, &CaptureRecord::for_function("never")).unwrap_err();
    assert_eq!(EslError::kind_of(&err), Some(ErrorKind::IncompleteCapture));

    // __ret_len__ обещает два слота, а на диске только один
    let id = ClusterId::function("broken");
    {
        let h = reg.get_or_create(&id, ClusterOptions::default())?;
        let mut c = lock(&h)?;
        c.register(RET_LEN, 2)?;
        c.register("__ret_0__", "first")?;
    }
    reg.detach()?;

    let mut reg = open(&root)?;
    let err = replay_capture(&mut reg, &CaptureRecord::for_function("broken")).unwrap_err();
    match err.downcast_ref::<EslError>() {
        Some(EslError::IncompleteCapture { slot, .. }) => assert_eq!(slot, "__ret_1__"),
        other => panic!("unexpected error {other:?}"),
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// Обёртки: Captured вызывает функцию каждый раз, Replayed: никогда.
#[test]
fn wrappers_compose_at_call_site() -> Result<()> {
    let root = unique_root("wrap");
    let mut reg = open(&root)?;
    let mut calls = 0;

    {
        let mut train = capture_on_call("train", |kw: &Kwargs| {
            calls += 1;
            kw["epochs"].clone()
        });
        let ret = train.call(&mut reg, kwargs([("epochs", 10)]))?;
        assert_eq!(ret, Returned::One(Value::from(10)));
        let ret = train.call(&mut reg, kwargs([("epochs", 20)]))?;
        assert_eq!(ret, Returned::One(Value::from(20)));
        assert_eq!(train.record().id().key(), "func@train");
    }
    assert_eq!(calls, 2);

    let replayed = replay_from_capture("train");
    let ret = replayed.call(&mut reg, Kwargs::new())?;
    assert_eq!(ret, Returned::One(Value::from(20)));
    assert_eq!(calls, 2);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
