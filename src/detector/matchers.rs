//! 通道匹配器：六类证据通道各自独立的匹配逻辑
//!
//! 各匹配器契约一致：输入编译后签名库 + 本次响应的对应证据 + 可变累加器，
//! 只向累加器写入命中的技术名，绝不修改签名库

use std::collections::{HashMap, HashSet};

use crate::compiler::CompiledSignatures;
use crate::extractor::ScriptRecord;

/// Header名统一小写（值保持原样）
pub(crate) fn normalize_headers(
    headers: &HashMap<String, Vec<String>>,
) -> HashMap<String, Vec<String>> {
    let mut normalized: HashMap<String, Vec<String>> = HashMap::new();
    for (name, values) in headers {
        normalized
            .entry(name.to_lowercase())
            .or_default()
            .extend(values.iter().cloned());
    }
    normalized
}

/// Header匹配器
pub struct HeaderMatcher;

impl HeaderMatcher {
    /// 同名Header的任一值命中即记该技术
    pub fn apply(
        compiled: &CompiledSignatures,
        headers: &HashMap<String, Vec<String>>,
        matched: &mut HashSet<String>,
    ) {
        for (tech_name, signature) in &compiled.techs {
            'tech: for (header_name, patterns) in &signature.header_patterns {
                let Some(values) = headers.get(header_name) else {
                    continue;
                };
                for value in values {
                    for pattern in patterns {
                        if pattern.matches(value) {
                            matched.insert(tech_name.clone());
                            break 'tech;
                        }
                    }
                }
            }
        }
    }
}

/// Cookie匹配器
pub struct CookieMatcher;

impl CookieMatcher {
    /// 从Header数据合成Cookie映射
    /// 同时解析请求式Cookie头（分号分隔键值对）与响应式Set-Cookie头
    /// （首个分号分段为键值对）；名称统一小写，键冲突时后写入者覆盖
    pub fn extract_cookies(headers: &HashMap<String, Vec<String>>) -> HashMap<String, String> {
        let mut cookies = HashMap::new();

        if let Some(values) = headers.get("cookie") {
            for header_value in values {
                for pair in header_value.split(';') {
                    let pair = pair.trim();
                    if pair.is_empty() {
                        continue;
                    }
                    let Some((name, value)) = pair.split_once('=') else {
                        continue;
                    };
                    cookies.insert(name.trim().to_lowercase(), value.trim().to_string());
                }
            }
        }

        if let Some(values) = headers.get("set-cookie") {
            for header_value in values {
                let first_segment = header_value.splitn(2, ';').next().unwrap_or("");
                let Some((name, value)) = first_segment.split_once('=') else {
                    continue;
                };
                cookies.insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        cookies
    }

    pub fn apply(
        compiled: &CompiledSignatures,
        cookies: &HashMap<String, String>,
        matched: &mut HashSet<String>,
    ) {
        for (tech_name, signature) in &compiled.techs {
            'tech: for (cookie_name, patterns) in &signature.cookie_patterns {
                let Some(value) = cookies.get(cookie_name) else {
                    continue;
                };
                for pattern in patterns {
                    if pattern.matches(value) {
                        matched.insert(tech_name.clone());
                        break 'tech;
                    }
                }
            }
        }
    }
}

/// HTML匹配器（对响应体整体匹配，不做行/标签切分）
pub struct HtmlMatcher;

impl HtmlMatcher {
    pub fn apply(compiled: &CompiledSignatures, body: &str, matched: &mut HashSet<String>) {
        for (tech_name, signature) in &compiled.techs {
            for pattern in &signature.html_patterns {
                if pattern.matches(body) {
                    matched.insert(tech_name.clone());
                    break;
                }
            }
        }
    }
}

/// 内联脚本匹配器（逐内容块匹配，任一块命中即记该技术）
pub struct ScriptMatcher;

impl ScriptMatcher {
    pub fn apply(
        compiled: &CompiledSignatures,
        scripts: &[ScriptRecord],
        matched: &mut HashSet<String>,
    ) {
        for (tech_name, signature) in &compiled.techs {
            'tech: for pattern in &signature.script_patterns {
                for script in scripts {
                    if !script.content.is_empty() && pattern.matches(&script.content) {
                        matched.insert(tech_name.clone());
                        break 'tech;
                    }
                }
            }
        }
    }
}

/// 脚本源URL匹配器
pub struct ScriptSrcMatcher;

impl ScriptSrcMatcher {
    pub fn apply(
        compiled: &CompiledSignatures,
        scripts: &[ScriptRecord],
        matched: &mut HashSet<String>,
    ) {
        for (tech_name, signature) in &compiled.techs {
            'tech: for pattern in &signature.script_src_patterns {
                for script in scripts {
                    if let Some(source) = &script.source {
                        if pattern.matches(source) {
                            matched.insert(tech_name.clone());
                            break 'tech;
                        }
                    }
                }
            }
        }
    }
}

/// Meta标签匹配器
pub struct MetaMatcher;

impl MetaMatcher {
    /// 同一meta名的模式列表逐条尝试，首个命中即停
    pub fn apply(
        compiled: &CompiledSignatures,
        meta_tags: &HashMap<String, String>,
        matched: &mut HashSet<String>,
    ) {
        for (tech_name, signature) in &compiled.techs {
            'tech: for (meta_name, patterns) in &signature.meta_patterns {
                let Some(content) = meta_tags.get(meta_name) else {
                    continue;
                };
                for pattern in patterns {
                    if pattern.matches(content) {
                        matched.insert(tech_name.clone());
                        break 'tech;
                    }
                }
            }
        }
    }
}

/// JS变量匹配器
pub struct JsMatcher;

impl JsMatcher {
    /// 变量名为大小写敏感标识符，键做精确相等比较，不做任何归一化
    pub fn apply(
        compiled: &CompiledSignatures,
        js_vars: &HashMap<String, String>,
        matched: &mut HashSet<String>,
    ) {
        for (tech_name, signature) in &compiled.techs {
            'tech: for (var_name, patterns) in &signature.js_patterns {
                let Some(value) = js_vars.get(var_name) else {
                    continue;
                };
                for pattern in patterns {
                    if pattern.matches(value) {
                        matched.insert(tech_name.clone());
                        break 'tech;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SignatureCompiler;
    use serde_json::json;

    fn compiled_from(corpus: serde_json::Value) -> CompiledSignatures {
        let raw = crate::corpus::CorpusSupplier::normalize_technologies(corpus).unwrap();
        SignatureCompiler::compile(&raw).unwrap()
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

    #[test]
    fn test_header_matching_case_insensitive_names() {
        // 测试场景：Header名两侧小写归一后匹配
        let compiled = compiled_from(json!({
            "Express": {"headers": {"X-Powered-By": "Express"}}
        }));

        let normalized = normalize_headers(&headers(&[("x-powered-by", "Express 4.18")]));
        let mut matched = HashSet::new();
        HeaderMatcher::apply(&compiled, &normalized, &mut matched);
        assert!(matched.contains("Express"));
    }

    #[test]
    fn test_header_any_value_matches() {
        // 测试场景：同名Header多个值中任一值命中即可
        let compiled = compiled_from(json!({
            "Varnish": {"headers": {"Via": "varnish"}}
        }));

        let mut raw = headers(&[("Via", "1.1 proxy")]);
        raw.get_mut("Via").unwrap().push("1.1 varnish".to_string());
        let normalized = normalize_headers(&raw);

        let mut matched = HashSet::new();
        HeaderMatcher::apply(&compiled, &normalized, &mut matched);
        assert!(matched.contains("Varnish"));
    }

    #[test]
    fn test_cookie_extraction_from_set_cookie() {
        // 测试场景：Set-Cookie首个分号分段解析为键值对
        let normalized =
            normalize_headers(&headers(&[("Set-Cookie", "session=abc123; Path=/")]));
        let cookies = CookieMatcher::extract_cookies(&normalized);

        assert_eq!(cookies.get("session").map(String::as_str), Some("abc123"));
        assert_eq!(cookies.len(), 1);
    }

    #[test]
    fn test_cookie_extraction_from_request_cookie_header() {
        // 测试场景：请求式Cookie头的多键值对解析，名称小写归一
        let normalized =
            normalize_headers(&headers(&[("Cookie", "PHPSESSID=x1; theme=dark")]));
        let cookies = CookieMatcher::extract_cookies(&normalized);

        assert_eq!(cookies.get("phpsessid").map(String::as_str), Some("x1"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_cookie_pattern_matching() {
        // 测试场景：cookie存在且值命中 ".+" 模式
        let compiled = compiled_from(json!({
            "SessionApp": {"cookies": {"session": ".+"}}
        }));

        let normalized =
            normalize_headers(&headers(&[("Set-Cookie", "session=abc123; Path=/")]));
        let cookies = CookieMatcher::extract_cookies(&normalized);

        let mut matched = HashSet::new();
        CookieMatcher::apply(&compiled, &cookies, &mut matched);
        assert!(matched.contains("SessionApp"));
    }

    #[test]
    fn test_inline_script_matching_per_block() {
        // 测试场景：内联脚本按内容块匹配，外部脚本URL不参与
        let compiled = compiled_from(json!({
            "GTag": {"scripts": "gtag\\("}
        }));

        let scripts = vec![
            ScriptRecord {
                source: Some("https://cdn.example/gtag.js".to_string()),
                content: String::new(),
            },
            ScriptRecord {
                source: None,
                content: "window.dataLayer = []; gtag('js');".to_string(),
            },
        ];

        let mut matched = HashSet::new();
        ScriptMatcher::apply(&compiled, &scripts, &mut matched);
        assert!(matched.contains("GTag"));
    }

    #[test]
    fn test_script_src_matching() {
        // 测试场景：外部脚本源URL匹配
        let compiled = compiled_from(json!({
            "jQuery": {"scriptSrc": "jquery[.-]"}
        }));

        let scripts = vec![ScriptRecord {
            source: Some("/static/jquery-3.6.0.min.js".to_string()),
            content: String::new(),
        }];

        let mut matched = HashSet::new();
        ScriptSrcMatcher::apply(&compiled, &scripts, &mut matched);
        assert!(matched.contains("jQuery"));
    }

    #[test]
    fn test_js_var_names_case_sensitive() {
        // 测试场景：JS变量名精确相等比较，大小写不同不命中
        let compiled = compiled_from(json!({
            "Hugo": {"js": {"generatorName": "Hugo"}}
        }));

        let mut vars = HashMap::new();
        vars.insert("GENERATORNAME".to_string(), "Hugo 0.118".to_string());
        let mut matched = HashSet::new();
        JsMatcher::apply(&compiled, &vars, &mut matched);
        assert!(matched.is_empty());

        vars.insert("generatorName".to_string(), "Hugo 0.118".to_string());
        JsMatcher::apply(&compiled, &vars, &mut matched);
        assert!(matched.contains("Hugo"));
    }

    #[test]
    fn test_meta_matching() {
        // 测试场景：meta名小写归一后按模式列表匹配
        let compiled = compiled_from(json!({
            "WordPress": {"meta": {"Generator": "WordPress"}}
        }));

        let mut meta_tags = HashMap::new();
        meta_tags.insert("generator".to_string(), "WordPress 6.1".to_string());

        let mut matched = HashSet::new();
        MetaMatcher::apply(&compiled, &meta_tags, &mut matched);
        assert!(matched.contains("WordPress"));
    }
}
