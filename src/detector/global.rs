//! 全局检测器单例管理
//! 进程级一次性初始化：并发首次使用下也至多构建一次

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::OnceCell;

use super::detector::TechDetector;
use crate::config::{ConfigManager, EngineConfig};
use crate::error::{RtdResult, TechDetectError};

/// 全局检测器实例
static GLOBAL_DETECTOR: Lazy<Arc<OnceCell<TechDetector>>> =
    Lazy::new(|| Arc::new(OnceCell::new()));

/// 初始化全局检测器（默认配置）
pub async fn init_global_detector() -> RtdResult<()> {
    init_global_detector_with_config(ConfigManager::get_default()).await
}

/// 带自定义配置初始化全局检测器
pub async fn init_global_detector_with_config(config: EngineConfig) -> RtdResult<()> {
    if GLOBAL_DETECTOR.get().is_some() {
        return Ok(());
    }

    let detector = TechDetector::new(config).await?;
    // 并发初始化竞争失败时已有可用实例，直接复用
    let _ = GLOBAL_DETECTOR.set(detector);

    Ok(())
}

/// 获取全局检测器
pub fn global_detector() -> RtdResult<&'static TechDetector> {
    GLOBAL_DETECTOR
        .get()
        .ok_or(TechDetectError::DetectorNotInitialized)
}

/// 对外暴露的简化检测接口（基于全局检测器）
pub fn detect_technologies(
    headers: &HashMap<String, Vec<String>>,
    body: &[u8],
) -> RtdResult<HashSet<String>> {
    let detector = global_detector()?;
    Ok(detector.detect(headers, body))
}
