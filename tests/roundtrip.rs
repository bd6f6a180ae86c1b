use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use easysl::{
    lock, ArrayData, Cell, ClusterId, ClusterOptions, Device, EslConfig, GeneralGraph,
    LabeledGraph, NumericArray, Primitive, Registry, Table, Tensor, TypeTag, Value,
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
    base.join(format!("esltest-rt-{prefix}-{pid}-{t}-{id}"))
}

fn open(root: &PathBuf) -> Result<Registry> {
    Registry::open(EslConfig::at(root).with_pretty(false))
}

fn sample_lgraph() -> Result<LabeledGraph> {
    let mut g = LabeledGraph::new(4);
    g.add_edges(&[(0, 1), (1, 2), (2, 3), (3, 0), (0, 1)])?;
    g.set_node_feature(
        "h",
        NumericArray::new(vec![4, 2], ArrayData::F32(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]))?,
    )?;
    g.set_edge_feature("w", NumericArray::from(vec![1i64, 2, 3, 4, 5]))?;
    Ok(g)
}

fn sample_ggraph() -> GeneralGraph {
    let mut g = GeneralGraph::new();
    g.add_edge("a", "b");
    g.add_edge("b", 3);
    g.set_node_attr("a", "color", "red");
    g.set_edge_attr("a", "b", "weight", 0.5);
    g.set_graph_attr("name", "demo");
    g
}

/// Каждый домен переживает register → dump → новый реестр → load.
#[test]
fn every_domain_survives_a_fresh_registry() -> Result<()> {
    let root = unique_root("domains");
    let id = ClusterId::general("rt");

    let mut map = BTreeMap::new();
    map.insert("lr".to_string(), Primitive::from(0.01));
    map.insert("tags".to_string(), Primitive::from(vec!["x", "y"]));

    let prim = Value::from(map);
    let set = Value::from(BTreeSet::from([3i64, 1, 2]));
    let arr = NumericArray::new(vec![2, 3], ArrayData::F64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.5]))?;
    let table = Table::from_rows(
        ["id", "name", "score"],
        vec![
            vec![Cell::from(1), Cell::from("ann"), Cell::from(0.5)],
            vec![Cell::from(2), Cell::from("007"), Cell::Null],
        ],
    )?;
    let lg = sample_lgraph()?;
    let gg = sample_ggraph();
    let tensor = Tensor::new(vec![2, 2], ArrayData::I32(vec![1, -2, 3, -4]))?;

    {
        let mut reg = open(&root)?;
        let h = reg.get_or_create(&id, ClusterOptions::default())?;
        let mut c = lock(&h)?;
        c.register("cfg", prim.clone())?;
        c.register("seen", set.clone())?;
        c.register("m", arr.clone())?;
        c.register("df", table.clone())?;
        c.register("lg", lg.clone())?;
        c.register("gg", gg.clone())?;
        c.register("t", tensor.clone())?;
        assert_eq!(c.pending(), 0);
        drop(c);
        reg.detach()?;
    }

    let mut reg = open(&root)?;
    let h = reg.get_or_create(&id, ClusterOptions::default())?;
    let c = lock(&h)?;
    assert_eq!(c.len(), 7);

    assert_eq!(c.get(TypeTag::Primitive, "cfg"), Some(&prim));
    assert_eq!(c.get(TypeTag::Primitive, "seen"), Some(&set));
    assert_eq!(c.get(TypeTag::NumericArray, "m"), Some(&Value::from(arr)));
    let back = c
        .get(TypeTag::Table, "df")
        .and_then(Value::as_table)
        .expect("table restored");
    assert!(back.same_content(&table));
    assert_eq!(c.get(TypeTag::LabeledGraph, "lg"), Some(&Value::from(lg)));
    assert_eq!(c.get(TypeTag::GeneralGraph, "gg"), Some(&Value::from(gg)));
    assert_eq!(c.get(TypeTag::Tensor, "t"), Some(&Value::from(tensor)));

    // все восстановленные записи уже на диске
    assert!(c.entry(TypeTag::Tensor, "t").is_some_and(|e| e.is_persisted()));

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn random_arrays_keep_shape_and_bits() -> Result<()> {
    let root = unique_root("rand");
    let id = ClusterId::general("rand");
    let mut rng = oorandom::Rand64::new(0xE5_1);

    let mut expected = Vec::new();
    {
        let mut reg = open(&root)?;
        let h = reg.get_or_create(&id, ClusterOptions::default().auto_save(false))?;
        let mut c = lock(&h)?;
        for i in 0..8 {
            let rows = 1 + rng.rand_range(0..5) as usize;
            let cols = 1 + rng.rand_range(0..7) as usize;
            let data: Vec<f64> = (0..rows * cols).map(|_| rng.rand_float() * 1e6 - 5e5).collect();
            let a = NumericArray::new(vec![rows, cols], ArrayData::F64(data))?;
            c.register(&format!("a{i}"), a.clone())?;
            expected.push(a);
        }
        let report = c.dump()?;
        assert_eq!(report.encoded, 8);
    }

    let mut reg = open(&root)?;
    let h = reg.get_or_create(&id, ClusterOptions::default())?;
    let c = lock(&h)?;
    for (i, a) in expected.into_iter().enumerate() {
        let got = c.get(TypeTag::NumericArray, &format!("a{i}")).and_then(Value::as_array);
        assert_eq!(got, Some(&a));
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// Тензор, сохранённый "на GPU", возвращается на CPU с теми же значениями.
#[test]
fn tensor_comes_back_on_cpu() -> Result<()> {
    let root = unique_root("tensor");
    let id = ClusterId::general("dev");
    let t = Tensor::from_f32(vec![0.25, 0.5, 0.75]).to(Device::Cuda(1));

    {
        let mut reg = open(&root)?;
        let h = reg.get_or_create(&id, ClusterOptions::default())?;
        lock(&h)?.register("t", t.clone())?;
    }

    let mut reg = open(&root)?;
    let h = reg.get_or_create(&id, ClusterOptions::default())?;
    let c = lock(&h)?;
    let back = c
        .get(TypeTag::Tensor, "t")
        .and_then(Value::as_tensor)
        .expect("tensor restored");
    assert_eq!(back.device(), Device::Cpu);
    assert!(back.same_values(&t));

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// Индекс строк таблицы не сохраняется: схема и ячейки да.
#[test]
fn table_row_index_is_dropped() -> Result<()> {
    let root = unique_root("table");
    let id = ClusterId::general("tbl");
    let t = Table::from_rows(["k", "v"], vec![vec![Cell::from("a"), Cell::from(1)]])?
        .with_index(["row-0"])?;

    {
        let mut reg = open(&root)?;
        let h = reg.get_or_create(&id, ClusterOptions::default())?;
        lock(&h)?.register("t", t.clone())?;
    }

    let mut reg = open(&root)?;
    let h = reg.get_or_create(&id, ClusterOptions::default())?;
    let c = lock(&h)?;
    let back = c.get(TypeTag::Table, "t").and_then(Value::as_table).expect("table");
    assert!(back.index().is_none());
    assert!(back.same_content(&t));

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// Одно имя под разными тегами живёт параллельно; плоский вид ничего не теряет.
#[test]
fn same_name_coexists_across_tags() -> Result<()> {
    let root = unique_root("coexist");
    let mut reg = open(&root)?;
    let h = reg.get_or_create(&ClusterId::general("co"), ClusterOptions::default())?;
    let mut c = lock(&h)?;

    c.register("x", 42)?;
    c.register("x", NumericArray::from(vec![1.0, 2.0]))?;
    c.register("y", "only prim")?;

    let view = c.view();
    assert_eq!(view.primitive().get("x"), Some(&Value::from(42)));
    assert_eq!(
        view.array().get("x"),
        Some(&Value::from(NumericArray::from(vec![1.0, 2.0])))
    );
    assert_eq!(view[TypeTag::Primitive].len(), 2);

    let flat = c.flattened_view();
    assert_eq!(flat["y"], Value::from("only prim"));
    assert!(!flat.contains("x"));
    assert_eq!(flat["x_prim"], Value::from(42));
    assert_eq!(flat["x_array"], Value::from(NumericArray::from(vec![1.0, 2.0])));
    assert_eq!(
        flat.collisions().get("x"),
        Some(&vec![TypeTag::Primitive, TypeTag::NumericArray])
    );
    assert_eq!(flat.len(), 3);

    // перезапись того же (tag, name) меняет значение и сбрасывает persisted
    c.set_auto_save(false);
    c.register("x", 43)?;
    assert!(!c.entry(TypeTag::Primitive, "x").is_some_and(|e| e.is_persisted()));
    assert_eq!(c.get(TypeTag::Primitive, "x"), Some(&Value::from(43)));
    assert_eq!(c.find("x").map(|(t, _)| t), Some(TypeTag::Primitive));
    assert_eq!(c.tags_of("x"), vec![TypeTag::Primitive, TypeTag::NumericArray]);

    drop(c);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

/// Синтезированный ключ не затирает уже существующее уникальное имя.
#[test]
fn flattened_keys_never_overwrite() -> Result<()> {
    let root = unique_root("flatkey");
    let mut reg = open(&root)?;
    let h = reg.get_or_create(
        &ClusterId::general("fk"),
        ClusterOptions::default().auto_save(false),
    )?;
    let mut c = lock(&h)?;
    c.register("x", 1)?;
    c.register("x", NumericArray::from(vec![2i64]))?;
    c.register("x_prim", "user value")?;

    let flat = c.flattened_view();
    assert_eq!(flat["x_prim"], Value::from("user value"));
    assert_eq!(flat["x_prim_"], Value::from(1));
    assert_eq!(flat.len(), 3);

    drop(c);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}
