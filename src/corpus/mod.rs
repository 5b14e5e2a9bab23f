//! 指纹库模块：负责原始签名库的数据模型、远程获取与本地缓存
pub mod cache;
pub mod model;
pub mod supplier;

// 导出核心接口
pub use self::cache::CorpusCacheManager;
pub use self::model::{RawCategory, RawCorpus, RawGroup, RawSignature};
pub use self::supplier::CorpusSupplier;
