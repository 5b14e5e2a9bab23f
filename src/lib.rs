//! rstechdetect - 被动式Web技术栈指纹识别引擎

// 导出全局错误类型
pub use self::error::{RtdResult, TechDetectError};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, EngineConfig};

// 导出指纹库模块核心接口
pub use self::corpus::{
    CorpusCacheManager, CorpusSupplier, RawCategory, RawCorpus, RawGroup, RawSignature,
};

// 导出编译模块核心接口
pub use self::compiler::{
    CompiledSignature, CompiledSignatures, ParsedPattern, PatternParser, SignatureCompiler,
};

// 导出提取模块核心接口
pub use self::extractor::{
    ExtractedArtifacts, HtmlExtractor, JsVarExtractor, ScriptRecord, extract_artifacts,
};

// 导出分类/分组查找表
pub use self::taxonomy::{CategoryItem, GroupItem, Taxonomy};

// 导出检测模块核心接口（含全局单例的简化封装接口）
pub use self::detector::{
    AppInfo, TechDetector, TechInfo, detect_technologies, global_detector, init_global_detector,
    init_global_detector_with_config,
};

// 导出通用工具模块核心能力
pub use self::utils::HeaderConverter;

// 声明所有子模块
pub mod compiler;
pub mod config;
pub mod corpus;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod taxonomy;
pub mod utils;
