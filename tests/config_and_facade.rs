use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use easysl::cli::{cmd_ls, cmd_show, cmd_verify, list_clusters};
use easysl::consts::{DEFAULT_ROOT_DIR, REGISTRY_FILE};
use easysl::{
    capture_call, kwargs, ClusterId, ClusterOptions, Esl, EslConfig, Kwargs, NumericArray,
    TypeTag, Value,
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
    base.join(format!("esltest-facade-{prefix}-{pid}-{t}-{id}"))
}

/// Единственный тест, трогающий ESL_* env (тесты внутри бинаря идут параллельно).
#[test]
fn config_from_env_then_builder_overrides() {
    let root = unique_root("env");
    std::env::set_var("ESL_ROOT_DIR", &root);
    std::env::set_var("ESL_AUTO_SAVE", "0");
    std::env::set_var("ESL_FSYNC", "true");
    std::env::remove_var("ESL_PRETTY");

    let cfg = EslConfig::from_env();
    assert_eq!(cfg.root_dir, root);
    assert!(!cfg.auto_save);
    assert!(cfg.fsync);
    assert!(cfg.pretty);
    assert_eq!(cfg.cluster_options(), ClusterOptions::default().auto_save(false));

    let cfg = cfg.with_auto_save(true).with_fsync(false).with_root_dir("elsewhere");
    assert!(cfg.auto_save);
    assert!(!cfg.fsync);
    assert_eq!(cfg.root_dir, PathBuf::from("elsewhere"));

    for k in ["ESL_ROOT_DIR", "ESL_AUTO_SAVE", "ESL_FSYNC"] {
        std::env::remove_var(k);
    }
    assert_eq!(EslConfig::from_env().root_dir, PathBuf::from(DEFAULT_ROOT_DIR));
}

#[test]
fn facade_works_on_the_default_cluster() -> Result<()> {
    let root = unique_root("esl");
    {
        let mut esl = Esl::open(EslConfig::at(&root))?;
        esl.register("lr", 0.1)?;
        esl.register_many([("x", Value::from(1)), ("x", Value::from(NumericArray::from(vec![1i64])))])?;
        let flat = esl.flattened_view()?;
        assert_eq!(flat["lr"], Value::from(0.1));
        assert!(flat.collisions().contains_key("x"));
        assert_eq!(esl.array()?.len(), 1);
        esl.close()?;
    }

    let snapshot = fs::read_to_string(root.join(REGISTRY_FILE))?;
    assert!(snapshot.contains("glb@global"));

    let mut esl = Esl::open(EslConfig::at(&root))?;
    assert_eq!(esl.get(TypeTag::Primitive, "lr")?, Some(Value::from(0.1)));
    assert_eq!(esl.primitive()?.len(), 2);

    // именованный кластер и кластер записи функции через тот же фасад
    let h = esl.cluster("other")?;
    easysl::lock(&h)?.register("k", "v")?;
    capture_call(esl.registry_mut(), "fn1", |_: &Kwargs| Value::from(5), kwargs([("a", 1)]))?;
    let fh = esl.from_function("fn1")?;
    assert_eq!(easysl::lock(&fh)?.id(), &ClusterId::function("fn1"));
    assert_eq!(esl.view()?.len(), 3);

    esl.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn cli_commands_inspect_a_store() -> Result<()> {
    let root = unique_root("cli");
    let cfg = EslConfig::at(&root).with_pretty(false);
    {
        let mut esl = Esl::open(cfg.clone())?;
        esl.register("a", 1)?;
        esl.register("m", NumericArray::from(vec![1.0, 2.0]))?;
        esl.close()?;
    }
    let id = ClusterId::general("global");

    let ids = list_clusters(&root)?;
    assert!(ids.contains(&id));
    cmd_ls(&cfg, true)?;
    cmd_ls(&cfg, false)?;
    cmd_show(&cfg, &id, true)?;

    let report = cmd_verify(&cfg, &id)?;
    assert!(report.is_ok());
    assert_eq!(report.loaded, 2);

    fs::write(root.join(id.key()).join("array-m.arr"), b"garbage")?;
    let report = cmd_verify(&cfg, &id)?;
    assert_eq!(report.failed, vec!["array-m".to_string()]);

    assert!(cmd_show(&cfg, &ClusterId::general("nope"), false).is_err());
    assert!(cmd_ls(&EslConfig::at(unique_root("absent")), false).is_err());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// verify только читает: каталог, которого нет в registry.json, туда не попадает.
#[test]
fn verify_leaves_registry_snapshot_untouched() -> Result<()> {
    let root = unique_root("verify");
    let cfg = EslConfig::at(&root).with_pretty(false);
    Esl::open(cfg.clone())?.close()?;
    let before = fs::read_to_string(root.join(REGISTRY_FILE))?;

    let stray = ClusterId::general("stray");
    fs::create_dir_all(root.join(stray.key()))?;
    let report = cmd_verify(&cfg, &stray)?;
    assert!(report.is_ok());
    assert_eq!(report.loaded, 0);

    assert_eq!(fs::read_to_string(root.join(REGISTRY_FILE))?, before);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
