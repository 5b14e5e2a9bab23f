//! 检测器核心：整合通道匹配器与关联闭包，输出各类结果视图
//!
//! 编译后签名库与分类/分组查找表在构建时一次性生成，此后只读，
//! 可被任意数量的并发检测调用共享；单次调用的累加器与证据均为调用独占

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::implication::ImplicationGraph;
use super::matchers::{
    CookieMatcher, HeaderMatcher, HtmlMatcher, JsMatcher, MetaMatcher, ScriptMatcher,
    ScriptSrcMatcher, normalize_headers,
};
use super::result::{AppInfo, TechInfo};
use crate::compiler::{CompiledSignatures, SignatureCompiler};
use crate::config::EngineConfig;
use crate::corpus::{CorpusSupplier, RawCorpus};
use crate::error::RtdResult;
use crate::extractor::{JsVarExtractor, ScriptRecord, extract_artifacts};
use crate::taxonomy::Taxonomy;

/// 单次检测调用的页面证据（调用独占）
#[derive(Debug, Default)]
struct Evidence {
    body: String,
    scripts: Vec<ScriptRecord>,
    meta_tags: HashMap<String, String>,
    js_vars: HashMap<String, String>,
    title: String,
}

/// 技术检测器
#[derive(Debug, Clone)]
pub struct TechDetector {
    compiled: Arc<CompiledSignatures>,
    taxonomy: Arc<Taxonomy>,
    implication: Arc<ImplicationGraph>,
    config: EngineConfig,
}

impl TechDetector {
    /// 创建检测器
    /// 指纹库来源：自定义字节（完全绕过供应器）或供应器（缓存优先）
    pub async fn new(config: EngineConfig) -> RtdResult<Self> {
        let corpus = match &config.custom_corpus_bytes {
            Some(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(bytes)?;
                RawCorpus {
                    technologies: CorpusSupplier::normalize_technologies(value)?,
                    categories: HashMap::new(),
                    groups: HashMap::new(),
                }
            }
            None => CorpusSupplier::load(&config).await?,
        };

        Self::with_corpus(corpus, config)
    }

    /// 使用内存中的指纹库创建检测器
    /// 适用场景：预加载指纹库后手动创建检测器
    pub fn with_corpus(corpus: RawCorpus, config: EngineConfig) -> RtdResult<Self> {
        let start = Instant::now();

        // 1. 编译签名库
        let compiled = SignatureCompiler::compile(&corpus.technologies)?;

        // 2. 构建分类/分组查找表（含双向索引，构建后只读）
        let taxonomy = Taxonomy::from_corpus(&corpus.categories, &corpus.groups);

        // 3. 构建关联关系邻接表
        let implication = ImplicationGraph::from_signatures(&compiled);

        debug!(
            "检测器构建完成，技术数{}，分类数{}，耗时{:?}",
            compiled.techs.len(),
            taxonomy.categories().len(),
            start.elapsed()
        );

        Ok(Self {
            compiled: Arc::new(compiled),
            taxonomy: Arc::new(taxonomy),
            implication: Arc::new(implication),
            config,
        })
    }

    /// 核心检测接口：返回命中技术名集合（含关联闭包）
    pub fn detect(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> HashSet<String> {
        self.detect_internal(headers, body, false).0
    }

    /// 检测并返回页面标题
    pub fn detect_with_title(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> (HashSet<String>, String) {
        self.detect_internal(headers, body, true)
    }

    /// 检测并返回技术基础信息视图
    pub fn detect_with_info(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> HashMap<String, AppInfo> {
        let matched = self.detect(headers, body);
        let mut result = HashMap::with_capacity(matched.len());

        for tech_name in matched {
            let info = match self.compiled.techs.get(&tech_name) {
                Some(signature) => AppInfo {
                    description: signature.description.clone(),
                    website: signature.website.clone(),
                },
                // 悬空关联技术：返回空信息而非失败
                None => AppInfo::default(),
            };
            result.insert(tech_name, info);
        }

        result
    }

    /// 检测并返回技术分类ID视图
    pub fn detect_with_cats(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> HashMap<String, Vec<u32>> {
        let matched = self.detect(headers, body);
        let mut result = HashMap::with_capacity(matched.len());

        for tech_name in matched {
            let cats = self
                .compiled
                .techs
                .get(&tech_name)
                .map(|s| s.cats.clone())
                .unwrap_or_default();
            result.insert(tech_name, cats);
        }

        result
    }

    /// 检测并返回技术分类名称视图
    pub fn detect_with_categories(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> HashMap<String, Vec<String>> {
        let matched = self.detect(headers, body);
        let mut result = HashMap::with_capacity(matched.len());

        for tech_name in matched {
            let names = self
                .compiled
                .techs
                .get(&tech_name)
                .map(|s| self.taxonomy.category_names(&s.cats))
                .unwrap_or_default();
            result.insert(tech_name, names);
        }

        result
    }

    /// 检测并返回技术分组名称视图（经分类->分组索引去重合并）
    pub fn detect_with_groups(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> HashMap<String, Vec<String>> {
        let matched = self.detect(headers, body);
        let mut result = HashMap::with_capacity(matched.len());

        for tech_name in matched {
            let names = self
                .compiled
                .techs
                .get(&tech_name)
                .map(|s| self.taxonomy.group_names_for_categories(&s.cats))
                .unwrap_or_default();
            result.insert(tech_name, names);
        }

        result
    }

    /// 检测并返回技术综合信息视图
    pub fn detect_with_tech_info(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
    ) -> HashMap<String, TechInfo> {
        let matched = self.detect(headers, body);
        let mut result = HashMap::with_capacity(matched.len());

        for tech_name in matched {
            let mut info = TechInfo {
                name: tech_name.clone(),
                confidence: 100,
                ..Default::default()
            };

            if let Some(signature) = self.compiled.techs.get(&tech_name) {
                info.description = signature.description.clone();
                info.website = signature.website.clone();
                info.cpe = signature.cpe.clone();
                info.categories = self.taxonomy.category_names(&signature.cats);
                info.groups = self.taxonomy.group_names_for_categories(&signature.cats);
            }

            result.insert(tech_name, info);
        }

        result
    }

    /// 按分组查询技术：返回分类隶属于该分组的全部技术名（排序输出）
    /// 未知分组ID返回空列表而非错误
    pub fn techs_in_group(&self, group_id: u32) -> Vec<String> {
        let category_ids = self.taxonomy.categories_of_group(group_id);
        if category_ids.is_empty() {
            return Vec::new();
        }

        let mut result: Vec<String> = self
            .compiled
            .techs
            .values()
            .filter(|signature| {
                signature
                    .cats
                    .iter()
                    .any(|cat_id| category_ids.contains(cat_id))
            })
            .map(|signature| signature.name.clone())
            .collect();
        result.sort_unstable();
        result
    }

    /// 编译后签名库（只读共享）
    pub fn compiled(&self) -> &CompiledSignatures {
        &self.compiled
    }

    /// 分类/分组查找表（只读共享）
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// 执行全部通道匹配与关联闭包
    fn detect_internal(
        &self,
        headers: &HashMap<String, Vec<String>>,
        body: &[u8],
        want_title: bool,
    ) -> (HashSet<String>, String) {
        let mut matched = HashSet::new();

        // 1. Header/Cookie通道（恒定执行）
        let normalized_headers = normalize_headers(headers);
        HeaderMatcher::apply(&self.compiled, &normalized_headers, &mut matched);
        let cookies = CookieMatcher::extract_cookies(&normalized_headers);
        CookieMatcher::apply(&self.compiled, &cookies, &mut matched);

        // 2. 响应体通道（按配置执行，禁用通道连同提取一并跳过）
        let evidence = self.collect_evidence(body, want_title);
        if !self.config.disable_html_detection && !evidence.body.is_empty() {
            HtmlMatcher::apply(&self.compiled, &evidence.body, &mut matched);
        }
        if !self.config.disable_script_detection {
            ScriptMatcher::apply(&self.compiled, &evidence.scripts, &mut matched);
            ScriptSrcMatcher::apply(&self.compiled, &evidence.scripts, &mut matched);
        }
        if !self.config.disable_meta_detection {
            MetaMatcher::apply(&self.compiled, &evidence.meta_tags, &mut matched);
        }
        if !self.config.disable_js_detection {
            JsMatcher::apply(&self.compiled, &evidence.js_vars, &mut matched);
        }

        // 3. 关联闭包展开
        self.implication.expand(&mut matched);

        (matched, evidence.title)
    }

    /// 按配置收集页面证据
    /// 截断先于一切提取；提取失败仅使对应通道无产出，不影响本次检测
    fn collect_evidence(&self, body: &[u8], want_title: bool) -> Evidence {
        let mut evidence = Evidence::default();

        let body = if self.config.max_body_size > 0 && body.len() > self.config.max_body_size {
            &body[..self.config.max_body_size]
        } else {
            body
        };

        let need_extract = want_title
            || !self.config.disable_script_detection
            || !self.config.disable_meta_detection
            || !self.config.disable_js_detection;

        if !need_extract && self.config.disable_html_detection {
            return evidence;
        }

        // 有损转换容忍非法UTF-8字节
        evidence.body = String::from_utf8_lossy(body).into_owned();

        if need_extract {
            match extract_artifacts(&evidence.body) {
                Ok(artifacts) => {
                    evidence.scripts = artifacts.scripts;
                    evidence.meta_tags = artifacts.meta_tags;
                    evidence.title = artifacts.title;
                    if !self.config.disable_js_detection {
                        evidence.js_vars = JsVarExtractor::extract(&evidence.scripts);
                    }
                }
                Err(e) => {
                    debug!("页面证据提取已跳过：{}", e);
                }
            }
        }

        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::corpus::{RawCategory, RawGroup};
    use serde_json::json;

    fn build_detector(
        technologies: serde_json::Value,
        categories: serde_json::Value,
        groups: serde_json::Value,
        config: EngineConfig,
    ) -> TechDetector {
        let corpus = RawCorpus {
            technologies: CorpusSupplier::normalize_technologies(technologies).unwrap(),
            categories: serde_json::from_value::<HashMap<String, RawCategory>>(categories)
                .unwrap(),
            groups: serde_json::from_value::<HashMap<String, RawGroup>>(groups).unwrap(),
        };
        TechDetector::with_corpus(corpus, config).unwrap()
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in pairs {
            map.entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        map
    }

    fn foo_bar_detector(config: EngineConfig) -> TechDetector {
        build_detector(
            json!({
                "Foo": {
                    "cats": [10],
                    "description": "Foo framework",
                    "website": "https://foo.example",
                    "headers": {"X-Powered-By": "Foo"},
                    "implies": ["Bar"]
                },
                "Bar": {"cats": [20]}
            }),
            json!({
                "10": {"name": "Group10Cat", "priority": 1, "groups": [3]},
                "20": {"name": "Group20Cat", "priority": 2, "groups": [5]}
            }),
            json!({
                "3": {"name": "Frameworks"},
                "5": {"name": "Languages"}
            }),
            config,
        )
    }

    #[test]
    fn test_end_to_end_header_match_with_implies() {
        // 测试场景：Header命中Foo，闭包引入Bar，分类名视图各自正确
        let detector = foo_bar_detector(ConfigManager::get_default());
        let request_headers = headers(&[("X-Powered-By", "Foo/2.1")]);

        let matched = detector.detect(&request_headers, b"");
        assert_eq!(
            matched,
            ["Foo", "Bar"].iter().map(|s| s.to_string()).collect()
        );

        let categories = detector.detect_with_categories(&request_headers, b"");
        assert_eq!(categories.get("Foo").unwrap(), &vec!["Group10Cat"]);
        assert_eq!(categories.get("Bar").unwrap(), &vec!["Group20Cat"]);
    }

    #[test]
    fn test_detect_with_info_and_dangling_implied() {
        // 测试场景：悬空关联技术返回空信息视图而非失败
        let detector = build_detector(
            json!({
                "Foo": {"headers": {"Server": "foo"}, "implies": ["Ghost"]}
            }),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );

        let result = detector.detect_with_info(&headers(&[("Server", "foo/1.0")]), b"");
        assert_eq!(
            result.get("Foo").unwrap().description,
            None
        );
        assert!(result.contains_key("Ghost"));
        assert!(result.get("Ghost").unwrap().website.is_none());
    }

    #[test]
    fn test_detect_with_tech_info_enrichment() {
        // 测试场景：综合信息视图聚合描述/分类名/分组名，置信度恒为100
        let detector = foo_bar_detector(ConfigManager::get_default());
        let result = detector.detect_with_tech_info(&headers(&[("X-Powered-By", "Foo")]), b"");

        let foo = result.get("Foo").unwrap();
        assert_eq!(foo.description.as_deref(), Some("Foo framework"));
        assert_eq!(foo.categories, vec!["Group10Cat"]);
        assert_eq!(foo.groups, vec!["Frameworks"]);
        assert_eq!(foo.confidence, 100);

        let bar = result.get("Bar").unwrap();
        assert_eq!(bar.groups, vec!["Languages"]);
    }

    #[test]
    fn test_disable_js_detection_isolates_channel() {
        // 测试场景：禁用JS通道后，仅靠JS变量证据的技术不再上报，
        // 其余通道命中的技术不受影响
        let technologies = json!({
            "JsOnly": {"js": {"appSignal": "sig"}},
            "HdrTech": {"headers": {"Server": "hdrtech"}}
        });
        let body = br#"<html><head><script>var appSignal = "sig-1.0";</script></head></html>"#;
        let request_headers = headers(&[("Server", "hdrtech/2.0")]);

        let enabled = build_detector(
            technologies.clone(),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );
        let matched = enabled.detect(&request_headers, body);
        assert!(matched.contains("JsOnly"));
        assert!(matched.contains("HdrTech"));

        let disabled = build_detector(
            technologies,
            json!({}),
            json!({}),
            ConfigManager::custom().disable_js_detection(true).build(),
        );
        let matched = disabled.detect(&request_headers, body);
        assert!(!matched.contains("JsOnly"));
        assert!(matched.contains("HdrTech"));
    }

    #[test]
    fn test_meta_detection_from_body() {
        // 测试场景：generator meta标签经提取与匹配命中
        let detector = build_detector(
            json!({"WordPress": {"meta": {"generator": "WordPress"}}}),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );

        let body = br#"<html><head><meta name="generator" content="WordPress 6.1"></head></html>"#;
        let matched = detector.detect(&headers(&[]), body);
        assert!(matched.contains("WordPress"));
    }

    #[test]
    fn test_cookie_detection_end_to_end() {
        // 测试场景：Set-Cookie合成的cookie映射命中 ".+" 模式
        let detector = build_detector(
            json!({"SessionApp": {"cookies": {"session": ".+"}}}),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );

        let matched = detector.detect(&headers(&[("Set-Cookie", "session=abc123; Path=/")]), b"");
        assert!(matched.contains("SessionApp"));
    }

    #[test]
    fn test_max_body_size_truncates_before_extraction() {
        // 测试场景：超出截断上限的响应体内容不参与任何匹配
        let mut body = Vec::new();
        body.extend_from_slice(b"<html><body>");
        body.resize(256, b' ');
        body.extend_from_slice(b"needle-marker</body></html>");

        let technologies = json!({"Needle": {"html": "needle-marker"}});

        let unlimited = build_detector(
            technologies.clone(),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );
        assert!(unlimited.detect(&headers(&[]), &body).contains("Needle"));

        let truncated = build_detector(
            technologies,
            json!({}),
            json!({}),
            ConfigManager::custom().max_body_size(128).build(),
        );
        assert!(!truncated.detect(&headers(&[]), &body).contains("Needle"));
    }

    #[test]
    fn test_detect_with_title() {
        // 测试场景：标题随检测结果一并返回
        let detector = build_detector(
            json!({"Foo": {"headers": {"Server": "foo"}}}),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );

        let body = b"<html><head><title>Acme Portal</title></head><body>hello</body></html>";
        let (matched, title) = detector.detect_with_title(&headers(&[("Server", "foo")]), body);
        assert!(matched.contains("Foo"));
        assert_eq!(title, "Acme Portal");
    }

    #[test]
    fn test_techs_in_group() {
        // 测试场景：按分组聚合技术名，未知分组返回空列表
        let detector = foo_bar_detector(ConfigManager::get_default());

        assert_eq!(detector.techs_in_group(3), vec!["Foo".to_string()]);
        assert_eq!(detector.techs_in_group(5), vec!["Bar".to_string()]);
        assert!(detector.techs_in_group(99).is_empty());
    }

    #[test]
    fn test_detection_never_fails_on_garbage_body() {
        // 测试场景：非法UTF-8响应体不会使检测调用失败
        let detector = build_detector(
            json!({"Foo": {"headers": {"Server": "foo"}}}),
            json!({}),
            json!({}),
            ConfigManager::get_default(),
        );

        let garbage: Vec<u8> = vec![0xff, 0xfe, 0x00, 0x80, 0xc1];
        let matched = detector.detect(&headers(&[("Server", "foo")]), &garbage);
        assert!(matched.contains("Foo"));
    }
}
