//! 指纹库供应器
//! 负责从本地缓存或远程拉取技术/分类/分组三个数据集，
//! 并把对象/数组两种签名库形态统一归一为「名称 -> 签名」映射

use std::collections::HashMap;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::cache::CorpusCacheManager;
use super::model::{RawCategory, RawCorpus, RawGroup, RawSignature};
use crate::config::EngineConfig;
use crate::error::{RtdResult, TechDetectError};

// 远程指纹库文件名（基础URL下的三个独立数据集）
const TECHNOLOGIES_FILE: &str = "technologies.json";
const CATEGORIES_FILE: &str = "categories.json";
const GROUPS_FILE: &str = "groups.json";

/// 指纹库供应器
pub struct CorpusSupplier;

impl CorpusSupplier {
    /// 加载指纹库（优先本地缓存，缓存失效则拉取远程）
    pub async fn load(config: &EngineConfig) -> RtdResult<RawCorpus> {
        // 1. 优先加载本地缓存
        if !config.disable_cache && !config.force_download {
            if let Ok(corpus) = CorpusCacheManager::load_from_cache(config).await {
                debug!("从本地缓存加载指纹库成功");
                return Ok(corpus);
            }
            warn!("本地缓存不存在或已失效，将拉取远程指纹库");
        }

        // 2. 拉取远程指纹库
        let corpus = Self::fetch_remote(config).await?;

        // 3. 缓存到本地（缓存失败仅告警，不影响本次加载）
        if !config.disable_cache {
            if let Err(e) = CorpusCacheManager::save_to_cache(config, &corpus).await {
                warn!("指纹库缓存到本地失败：{}", e);
            } else {
                debug!("远程指纹库已缓存到本地");
            }
        }

        Ok(corpus)
    }

    /// 强制拉取远程指纹库（三个数据集独立拉取）
    pub async fn fetch_remote(config: &EngineConfig) -> RtdResult<RawCorpus> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout))
            .build()?;

        let technologies_value =
            Self::fetch_json_file(&client, config, TECHNOLOGIES_FILE).await?;
        let categories_value = Self::fetch_json_file(&client, config, CATEGORIES_FILE).await?;
        let groups_value = Self::fetch_json_file(&client, config, GROUPS_FILE).await?;

        let technologies = Self::normalize_technologies(technologies_value)?;
        let categories = parse_id_keyed_map::<RawCategory>(categories_value, "分类");
        let groups = parse_id_keyed_map::<RawGroup>(groups_value, "分组");

        debug!(
            "远程指纹库拉取成功，技术签名数：{}，分类数：{}，分组数：{}",
            technologies.len(),
            categories.len(),
            groups.len()
        );

        Ok(RawCorpus {
            technologies,
            categories,
            groups,
        })
    }

    /// 拉取单个JSON文件（原始URL失败后回退GitHub代理URL）
    async fn fetch_json_file(
        client: &Client,
        config: &EngineConfig,
        file_name: &str,
    ) -> RtdResult<Value> {
        let original_url = Url::parse(&config.corpus_base_url)?.join(file_name)?;
        let proxy_path = original_url.as_str().trim_start_matches("https://");
        let fallback_url = format!("{}{}", config.gh_proxy_url, proxy_path);

        debug!("开始拉取 [{}]，URL：{}", file_name, original_url);
        match Self::fetch_json_url(client, original_url.as_str()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    "拉取 [{}] 原始URL失败：{}，尝试代理URL：{}",
                    file_name, e, fallback_url
                );
                Self::fetch_json_url(client, &fallback_url)
                    .await
                    .map_err(|proxy_e| {
                        TechDetectError::CorpusUnavailable(format!(
                            "[{}] 原始URL与代理URL均拉取失败：{}；{}",
                            file_name, e, proxy_e
                        ))
                    })
            }
        }
    }

    async fn fetch_json_url(client: &Client, url: &str) -> RtdResult<Value> {
        let response = client
            .get(url)
            .header("User-Agent", "rstechdetect/0.1.0")
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TechDetectError::CorpusUnavailable(format!(
                "URL {} 返回状态码 {}",
                url,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// 技术签名库形态归一化
    /// 支持三种形态：对象映射、自带name字段的对象数组、{"apps": {...}} 历史包装
    /// 映射键是全局连接键，数组形态一律按自带name字段重建键
    pub fn normalize_technologies(value: Value) -> RtdResult<HashMap<String, RawSignature>> {
        let mut technologies = HashMap::new();

        match value {
            Value::Object(mut map) => {
                // 历史包装形态：{"apps": {...}}（仅含单个apps键时视为包装）
                if map.len() == 1 {
                    if let Some(apps) = map.remove("apps") {
                        if apps.is_object() {
                            return Self::normalize_technologies(apps);
                        }
                        return Err(TechDetectError::CorpusError(
                            "apps包装形态的值不是对象".to_string(),
                        ));
                    }
                }

                for (name, raw_value) in map {
                    match serde_json::from_value::<RawSignature>(raw_value) {
                        Ok(signature) => {
                            technologies.insert(name, signature);
                        }
                        Err(e) => {
                            debug!("签名 [{}] 反序列化失败已跳过：{}", name, e);
                        }
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    match serde_json::from_value::<RawSignature>(item) {
                        Ok(signature) => match signature.name.clone() {
                            Some(name) if !name.is_empty() => {
                                technologies.insert(name, signature);
                            }
                            _ => debug!("数组形态签名缺少name字段已跳过"),
                        },
                        Err(e) => {
                            debug!("数组形态签名反序列化失败已跳过：{}", e);
                        }
                    }
                }
            }
            _ => {
                return Err(TechDetectError::CorpusError(
                    "技术签名库既不是对象也不是数组".to_string(),
                ));
            }
        }

        Ok(technologies)
    }
}

/// 解析按ID字符串键控的数据集（分类/分组）
/// 单条解析失败仅跳过该条目
fn parse_id_keyed_map<T: serde::de::DeserializeOwned>(
    value: Value,
    data_name: &str,
) -> HashMap<String, T> {
    let mut result = HashMap::new();
    let Value::Object(map) = value else {
        warn!("{}数据集不是对象形态，已忽略", data_name);
        return result;
    };

    for (id, raw_value) in map {
        match serde_json::from_value::<T>(raw_value) {
            Ok(item) => {
                result.insert(id, item);
            }
            Err(e) => {
                debug!("{} [{}] 反序列化失败已跳过：{}", data_name, id, e);
            }
        }
    }

    result
}
