//! 指纹库缓存管理
//! 仅处理指纹库的本地序列化（MessagePack）、反序列化与新鲜度校验

use std::time::{Duration, SystemTime};

use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tracing::debug;

use super::model::RawCorpus;
use crate::config::EngineConfig;
use crate::error::{RtdResult, TechDetectError};

/// 指纹库缓存管理器
pub struct CorpusCacheManager;

impl CorpusCacheManager {
    /// 从本地缓存加载指纹库
    /// 缓存文件修改时间超过新鲜期视为失效
    pub async fn load_from_cache(config: &EngineConfig) -> RtdResult<RawCorpus> {
        let cache_path = &config.cache_path;

        // 新鲜度校验
        let metadata = tokio::fs::metadata(cache_path).await?;
        let age = SystemTime::now().duration_since(metadata.modified()?)?;
        if age > Duration::from_secs(config.cache_expiry) {
            return Err(TechDetectError::CorpusCacheError(format!(
                "缓存已过期（{}秒前写入，新鲜期{}秒）",
                age.as_secs(),
                config.cache_expiry
            )));
        }

        let cache_data = tokio::fs::read(cache_path).await?;

        // MessagePack反序列化
        let corpus: RawCorpus = from_slice(&cache_data)
            .map_err(|e| TechDetectError::MsgPackError(format!("反序列化失败：{}", e)))?;

        debug!(
            "缓存文件反序列化成功，技术签名数：{}，分类数：{}，分组数：{}",
            corpus.technologies.len(),
            corpus.categories.len(),
            corpus.groups.len()
        );

        Ok(corpus)
    }

    /// 将指纹库缓存到本地
    pub async fn save_to_cache(config: &EngineConfig, corpus: &RawCorpus) -> RtdResult<()> {
        let cache_path = &config.cache_path;
        let mut cache_data = Vec::new();

        // MessagePack序列化
        corpus
            .serialize(&mut Serializer::new(&mut cache_data))
            .map_err(|e| TechDetectError::MsgPackError(format!("序列化失败：{}", e)))?;

        debug!("指纹库序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        // 写入文件
        tokio::fs::write(cache_path, cache_data).await?;
        Ok(())
    }

    /// 清除本地缓存
    pub async fn clear_cache(config: &EngineConfig) -> RtdResult<()> {
        let cache_path = &config.cache_path;
        if cache_path.exists() {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }
}
