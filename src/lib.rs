//! easysl: именованный типизированный реестр сохранения значений.
//!
//! Значения регистрируются под именами в кластерах, раскладываются по TypeTag и
//! сохраняются/восстанавливаются через codec своего домена.

// Базовые модули
pub mod config;
pub mod consts;
pub mod error;
pub mod util;

// Домены значений и их codec
pub mod codec; // src/codec/{mod,binio,json,array,table,lgraph,ggraph,tensor}.rs
pub mod value; // src/value/{mod,primitive,array,table,graph,tensor}.rs

// Хранилище
pub mod cluster; // src/cluster/{mod,id,dump,load,view}.rs
pub mod manifest;
pub mod registry; // src/registry/{mod,snapshot}.rs

// Поверх реестра
pub mod capture;
pub mod facade;

// Инспекция хранилища (бинарь esl)
pub mod cli;

// Удобные реэкспорты
pub use capture::{
    capture_call, capture_on_call, kwargs, replay_capture, replay_from_capture, CaptureRecord,
    Captured, Kwargs, Replayed, Returned,
};
pub use cluster::{Cluster, ClusterId, ClusterKind, ClusterView, DumpReport, FlatView, LoadReport};
pub use codec::{Codec, CodecRegistry};
pub use config::{ClusterOptions, EslConfig};
pub use error::{ErrorKind, EslError};
pub use facade::Esl;
pub use registry::{lock, ClusterHandle, ClusterState, Registry};
pub use value::{
    classify_any, ArrayData, Cell, DType, Device, DynValue, GeneralGraph, LabeledGraph, NumericArray,
    Primitive, Table, Tensor, TypeTag, Value,
};
