//! Общие константы форматов (root layout, manifest, binary payloads).

// -------- Root layout --------
pub const DEFAULT_ROOT_DIR: &str = ".esl_store";
pub const REGISTRY_FILE: &str = "registry.json";
pub const SILENCED: &str = "silenced";

// -------- Cluster layout --------
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_CLUSTER: &str = "global";

// -------- Capture record --------
pub const RET_LEN: &str = "__ret_len__";

/// Имя слота i-го возвращаемого значения: `__ret_<i>__`.
#[inline]
pub fn ret_slot(i: usize) -> String {
    format!("__ret_{i}__")
}

// -------- Binary payloads --------
// Общий заголовок: [magic8][version u32] ... [crc32 u32] (CRC по всему, что после magic).
pub const ARRAY_MAGIC: &[u8; 8] = b"ESLARR01";
pub const LGRAPH_MAGIC: &[u8; 8] = b"ESLLG001";
pub const GGRAPH_MAGIC: &[u8; 8] = b"ESLGG001";
pub const TENSOR_MAGIC: &[u8; 8] = b"ESLTEN01";
pub const PAYLOAD_VERSION: u32 = 1;

// Коды dtype (u8) для array/tensor.
pub const DTYPE_F64: u8 = 1;
pub const DTYPE_F32: u8 = 2;
pub const DTYPE_I64: u8 = 3;
pub const DTYPE_I32: u8 = 4;
pub const DTYPE_U8: u8 = 5;
pub const DTYPE_BOOL: u8 = 6;

// Коды устройства в tensor-заголовке (информационно: при чтении всегда CPU).
pub const DEVICE_CPU: u8 = 0;
pub const DEVICE_CUDA: u8 = 1;
