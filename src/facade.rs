//! facade: те же операции над кластером по умолчанию `glb@global`.

use anyhow::Result;

use crate::capture::CaptureRecord;
use crate::cluster::{ClusterId, ClusterView, FlatView, LoadReport};
use crate::config::EslConfig;
use crate::consts::DEFAULT_CLUSTER;
use crate::registry::{lock, ClusterHandle, Registry};
use crate::value::{DynValue, TypeTag, Value};

pub struct Esl {
    registry: Registry,
    default_id: ClusterId,
}

impl Esl {
    /// Открыть хранилище (init + attach) по конфигу.
    pub fn open(cfg: EslConfig) -> Result<Self> {
        Ok(Self::with_registry(Registry::open(cfg)?))
    }

    /// Хранилище из переменных окружения ESL_*.
    pub fn from_env() -> Result<Self> {
        Self::open(EslConfig::from_env())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            default_id: ClusterId::general(DEFAULT_CLUSTER),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Кластер по умолчанию; auto-save берётся из конфига.
    pub fn default_cluster(&mut self) -> Result<ClusterHandle> {
        let opts = self.registry.config().cluster_options();
        self.registry.get_or_create(&self.default_id, opts)
    }

    /// Именованный general-кластер.
    pub fn cluster(&mut self, name: &str) -> Result<ClusterHandle> {
        let opts = self.registry.config().cluster_options();
        self.registry.get_or_create(&ClusterId::general(name), opts)
    }

    /// Кластер записи функции (только чтение: без auto-save).
    pub fn from_function(&mut self, func_name: &str) -> Result<ClusterHandle> {
        let record = CaptureRecord::for_function(func_name);
        self.registry
            .get_or_create(record.id(), crate::config::ClusterOptions::replay())
    }

    pub fn register<V: Into<Value>>(&mut self, name: &str, value: V) -> Result<()> {
        let h = self.default_cluster()?;
        let mut c = lock(&h)?;
        c.register(name, value)
    }

    pub fn register_many<I, S, V>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        let h = self.default_cluster()?;
        let mut c = lock(&h)?;
        c.register_many(items)
    }

    pub fn register_dyn(&mut self, items: &[(&str, &dyn DynValue)]) -> Result<()> {
        let h = self.default_cluster()?;
        let mut c = lock(&h)?;
        c.register_dyn(items)
    }

    pub fn dump(&mut self) -> Result<()> {
        let h = self.default_cluster()?;
        let mut c = lock(&h)?;
        c.dump().map(|_| ())
    }

    pub fn load(&mut self) -> Result<LoadReport> {
        let h = self.default_cluster()?;
        let mut c = lock(&h)?;
        c.load()
    }

    pub fn get(&mut self, tag: TypeTag, name: &str) -> Result<Option<Value>> {
        let h = self.default_cluster()?;
        let c = lock(&h)?;
        Ok(c.get(tag, name).cloned())
    }

    pub fn view(&mut self) -> Result<ClusterView> {
        let h = self.default_cluster()?;
        let c = lock(&h)?;
        Ok(c.view())
    }

    pub fn flattened_view(&mut self) -> Result<FlatView> {
        let h = self.default_cluster()?;
        let c = lock(&h)?;
        Ok(c.flattened_view())
    }

    fn partition(&mut self, tag: TypeTag) -> Result<Vec<(String, Value)>> {
        let view = self.view()?;
        Ok(view
            .partition(tag)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn primitive(&mut self) -> Result<Vec<(String, Value)>> {
        self.partition(TypeTag::Primitive)
    }

    pub fn array(&mut self) -> Result<Vec<(String, Value)>> {
        self.partition(TypeTag::NumericArray)
    }

    pub fn table(&mut self) -> Result<Vec<(String, Value)>> {
        self.partition(TypeTag::Table)
    }

    pub fn lgraph(&mut self) -> Result<Vec<(String, Value)>> {
        self.partition(TypeTag::LabeledGraph)
    }

    pub fn ggraph(&mut self) -> Result<Vec<(String, Value)>> {
        self.partition(TypeTag::GeneralGraph)
    }

    pub fn tensor(&mut self) -> Result<Vec<(String, Value)>> {
        self.partition(TypeTag::Tensor)
    }

    /// Сохранить снапшот и закрыть сессию.
    pub fn close(self) -> Result<()> {
        self.registry.detach()
    }
}
