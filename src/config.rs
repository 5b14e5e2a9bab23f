//! 全局配置管理，存储所有可配置项

use std::path::PathBuf;

/// 引擎配置
/// 检测通道开关 + 指纹库来源/缓存配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // ===== 检测通道开关 =====
    // Header/Cookie通道恒定执行，两项开关仅为接口兼容保留
    pub disable_header_detection: bool,
    pub disable_cookie_detection: bool,
    pub disable_html_detection: bool,
    // Script开关同时覆盖内联脚本与script-src两个通道
    pub disable_script_detection: bool,
    pub disable_meta_detection: bool,
    pub disable_js_detection: bool,

    // ===== 响应体处理 =====
    // 提取前截断响应体的最大字节数，0表示不限制
    pub max_body_size: usize,

    // ===== 指纹库来源 =====
    // 自定义技术指纹JSON（对象/数组两种形态均可），设置后完全绕过远程供应器
    pub custom_corpus_bytes: Option<Vec<u8>>,
    // 远程指纹库基础URL（目录形式，下挂technologies/categories/groups三个JSON文件）
    pub corpus_base_url: String,
    // GitHub代理URL（原始URL拉取失败后回退）
    pub gh_proxy_url: String,
    // HTTP超时配置（单位：秒）
    pub http_timeout: u64,

    // ===== 本地缓存 =====
    // 指纹库缓存路径
    pub cache_path: PathBuf,
    // 缓存新鲜期（单位：秒），超期视为失效
    pub cache_expiry: u64,
    // 禁用本地缓存
    pub disable_cache: bool,
    // 忽略缓存强制拉取远程
    pub force_download: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            disable_header_detection: false,
            disable_cookie_detection: false,
            disable_html_detection: false,
            disable_script_detection: false,
            disable_meta_detection: false,
            disable_js_detection: false,
            max_body_size: 0,
            custom_corpus_bytes: None,
            corpus_base_url:
                "https://raw.githubusercontent.com/ZeroCostAutomation/wappalyzer-fingerprints/main/"
                    .to_string(),
            gh_proxy_url: "https://ghfast.top/".to_string(),
            http_timeout: 30,
            cache_path: PathBuf::from("techdetect_corpus.mp"),
            cache_expiry: 24 * 60 * 60,
            disable_cache: false,
            force_download: false,
        }
    }
}

/// 配置管理器（单例）
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> EngineConfig {
        EngineConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    config: EngineConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn disable_header_detection(mut self, disable: bool) -> Self {
        self.config.disable_header_detection = disable;
        self
    }

    pub fn disable_cookie_detection(mut self, disable: bool) -> Self {
        self.config.disable_cookie_detection = disable;
        self
    }

    pub fn disable_html_detection(mut self, disable: bool) -> Self {
        self.config.disable_html_detection = disable;
        self
    }

    pub fn disable_script_detection(mut self, disable: bool) -> Self {
        self.config.disable_script_detection = disable;
        self
    }

    pub fn disable_meta_detection(mut self, disable: bool) -> Self {
        self.config.disable_meta_detection = disable;
        self
    }

    pub fn disable_js_detection(mut self, disable: bool) -> Self {
        self.config.disable_js_detection = disable;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn custom_corpus_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.config.custom_corpus_bytes = Some(bytes);
        self
    }

    pub fn corpus_base_url(mut self, url: String) -> Self {
        self.config.corpus_base_url = url;
        self
    }

    pub fn gh_proxy_url(mut self, url: String) -> Self {
        self.config.gh_proxy_url = url;
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn cache_path(mut self, path: PathBuf) -> Self {
        self.config.cache_path = path;
        self
    }

    pub fn cache_expiry(mut self, secs: u64) -> Self {
        self.config.cache_expiry = secs;
        self
    }

    pub fn disable_cache(mut self, disable: bool) -> Self {
        self.config.disable_cache = disable;
        self
    }

    pub fn force_download(mut self, force: bool) -> Self {
        self.config.force_download = force;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
