//! 检测模块：多通道匹配、关联闭包与结果富化
pub mod detector;
pub mod global;
pub mod implication;
pub mod matchers;
pub mod result;

// 导出核心接口
pub use self::detector::TechDetector;
pub use self::global::{
    detect_technologies, global_detector, init_global_detector, init_global_detector_with_config,
};
pub use self::implication::ImplicationGraph;
pub use self::result::{AppInfo, TechInfo};
