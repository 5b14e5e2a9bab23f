//! 签名编译器核心
//! 负责把松散类型的原始签名库归一化并编译为只读匹配结构
//!
//! 形态归一化（string | 列表 | 映射 -> 扁平模式列表）只发生在本模块，
//! 松散形态不会越过编译器边界向下游传播

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use super::pattern::{ParsedPattern, PatternParser};
use crate::corpus::RawSignature;
use crate::error::RtdResult;

/// 单个技术的编译后签名
/// 引擎构建时一次性生成，整个生命周期只读
#[derive(Debug, Clone, Default)]
pub struct CompiledSignature {
    pub name: String,
    pub cats: Vec<u32>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub cpe: Option<String>,
    pub icon: Option<String>,

    // 键控通道（Header/Cookie/Meta键已统一小写，JS键保持原样）
    pub header_patterns: HashMap<String, Vec<ParsedPattern>>,
    pub cookie_patterns: HashMap<String, Vec<ParsedPattern>>,
    pub meta_patterns: HashMap<String, Vec<ParsedPattern>>,
    pub js_patterns: HashMap<String, Vec<ParsedPattern>>,

    // 列表通道
    pub html_patterns: Vec<ParsedPattern>,
    pub script_patterns: Vec<ParsedPattern>,
    pub script_src_patterns: Vec<ParsedPattern>,

    // 关联技术名列表（不校验存在性，悬空名由闭包阶段容忍）
    pub implied_techs: Vec<String>,
}

/// 编译后的签名库
#[derive(Debug, Clone, Default)]
pub struct CompiledSignatures {
    pub techs: HashMap<String, CompiledSignature>,
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    header_count: usize,
    cookie_count: usize,
    html_count: usize,
    script_count: usize,
    script_src_count: usize,
    meta_count: usize,
    js_count: usize,
    dropped_count: usize,
}

/// 签名编译器
pub struct SignatureCompiler;

impl SignatureCompiler {
    /// 编译整个签名库
    /// 单条模式的解析失败仅丢弃该条模式，绝不中断其余签名的编译
    pub fn compile(raw_signatures: &HashMap<String, RawSignature>) -> RtdResult<CompiledSignatures> {
        let start = Instant::now();
        let parser = PatternParser::new();
        let mut stats = CompileStats::default();
        let mut techs = HashMap::with_capacity(raw_signatures.len());

        for (tech_name, raw) in raw_signatures {
            let compiled = Self::compile_signature(&parser, tech_name, raw, &mut stats);
            techs.insert(tech_name.clone(), compiled);
        }

        debug!(
            "签名库编译完成，技术数{}，耗时{:?}，正则缓存{}条，丢弃无效模式{}条",
            techs.len(),
            start.elapsed(),
            parser.cached_regex_count(),
            stats.dropped_count
        );
        debug!(
            "编译统计：Header{}条、Cookie{}条、HTML{}条、Script{}条、ScriptSrc{}条、Meta{}条、JS{}条",
            stats.header_count,
            stats.cookie_count,
            stats.html_count,
            stats.script_count,
            stats.script_src_count,
            stats.meta_count,
            stats.js_count
        );

        Ok(CompiledSignatures { techs })
    }

    /// 编译单个签名
    fn compile_signature(
        parser: &PatternParser,
        tech_name: &str,
        raw: &RawSignature,
        stats: &mut CompileStats,
    ) -> CompiledSignature {
        let header_patterns =
            Self::compile_keyed_patterns(parser, raw.headers.as_ref(), true, stats);
        stats.header_count += header_patterns.values().map(Vec::len).sum::<usize>();

        let cookie_patterns =
            Self::compile_keyed_patterns(parser, raw.cookies.as_ref(), true, stats);
        stats.cookie_count += cookie_patterns.values().map(Vec::len).sum::<usize>();

        let meta_patterns = Self::compile_keyed_patterns(parser, raw.meta.as_ref(), true, stats);
        stats.meta_count += meta_patterns.values().map(Vec::len).sum::<usize>();

        // JS变量名是大小写敏感的标识符，键不做小写归一
        let js_patterns = Self::compile_keyed_patterns(parser, raw.js.as_ref(), false, stats);
        stats.js_count += js_patterns.values().map(Vec::len).sum::<usize>();

        let html_patterns = Self::compile_pattern_list(parser, raw.html.as_ref(), stats);
        stats.html_count += html_patterns.len();

        let script_patterns = Self::compile_pattern_list(parser, raw.scripts.as_ref(), stats);
        stats.script_count += script_patterns.len();

        let script_src_patterns =
            Self::compile_pattern_list(parser, raw.script_src.as_ref(), stats);
        stats.script_src_count += script_src_patterns.len();

        CompiledSignature {
            name: tech_name.to_string(),
            cats: raw.cats.clone(),
            description: raw.description.clone(),
            website: raw.website.clone(),
            cpe: raw.cpe.clone(),
            icon: raw.icon.clone(),
            header_patterns,
            cookie_patterns,
            meta_patterns,
            js_patterns,
            html_patterns,
            script_patterns,
            script_src_patterns,
            implied_techs: flatten_string_values(raw.implies.as_ref()),
        }
    }

    /// 编译列表型通道（html/script/script_src）
    fn compile_pattern_list(
        parser: &PatternParser,
        value: Option<&Value>,
        stats: &mut CompileStats,
    ) -> Vec<ParsedPattern> {
        let mut patterns = Vec::new();
        for raw_pattern in flatten_pattern_values(value) {
            match parser.parse(&raw_pattern) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    stats.dropped_count += 1;
                    debug!("模式解析失败已跳过：{}", e);
                }
            }
        }
        patterns
    }

    /// 编译键控通道（header/cookie/meta/js）
    fn compile_keyed_patterns(
        parser: &PatternParser,
        map: Option<&HashMap<String, Value>>,
        lowercase_keys: bool,
        stats: &mut CompileStats,
    ) -> HashMap<String, Vec<ParsedPattern>> {
        let Some(map) = map else {
            return HashMap::new();
        };

        let mut keyed = HashMap::new();
        for (key, value) in map {
            let mut patterns = Vec::new();
            for raw_pattern in flatten_pattern_values(Some(value)) {
                match parser.parse(&raw_pattern) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(e) => {
                        stats.dropped_count += 1;
                        debug!("模式解析失败已跳过：{}", e);
                    }
                }
            }

            if !patterns.is_empty() {
                let key = if lowercase_keys {
                    key.to_lowercase()
                } else {
                    key.clone()
                };
                keyed.insert(key, patterns);
            }
        }
        keyed
    }
}

/// 松散形态归一化：string | 列表 | 映射 -> 扁平模式字符串列表
/// 标量值按字面量转写（bool/number），其余复合值归一为空模式（存在性检测）
fn flatten_pattern_values(value: Option<&Value>) -> Vec<String> {
    let mut patterns = Vec::new();
    let Some(value) = value else {
        return patterns;
    };

    match value {
        Value::String(s) => patterns.push(s.clone()),
        Value::Bool(b) => patterns.push(b.to_string()),
        Value::Number(n) => patterns.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => patterns.push(s.clone()),
                    Value::Bool(b) => patterns.push(b.to_string()),
                    Value::Number(n) => patterns.push(n.to_string()),
                    _ => {}
                }
            }
        }
        Value::Object(map) => {
            // 映射形态只收集标量值
            for item in map.values() {
                match item {
                    Value::String(s) => patterns.push(s.clone()),
                    Value::Bool(b) => patterns.push(b.to_string()),
                    Value::Number(n) => patterns.push(n.to_string()),
                    _ => {}
                }
            }
        }
        _ => patterns.push(String::new()),
    }

    patterns
}

/// implies归一化：string | 列表 -> 技术名列表（不做去重与存在性校验）
fn flatten_string_values(value: Option<&Value>) -> Vec<String> {
    let mut names = Vec::new();
    let Some(value) = value else {
        return names;
    };

    match value {
        Value::String(s) => names.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                if let Value::String(s) = item {
                    names.push(s.clone());
                }
            }
        }
        _ => {}
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_signature(value: serde_json::Value) -> RawSignature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_compile_mixed_shapes() {
        // 测试场景：各通道混合形态（string/列表/映射）统一归一化
        let mut raw = HashMap::new();
        raw.insert(
            "WordPress".to_string(),
            raw_signature(json!({
                "cats": [1, 11],
                "description": "CMS",
                "website": "https://wordpress.org",
                "headers": {"X-Powered-By": "WordPress"},
                "html": "wp-content",
                "scriptSrc": ["wp-includes/js", "wp-content/themes"],
                "meta": {"Generator": ["WordPress", "WordPress \\d+"]},
                "implies": ["PHP", "MySQL"]
            })),
        );

        let compiled = SignatureCompiler::compile(&raw).unwrap();
        let sig = compiled.techs.get("WordPress").unwrap();

        assert_eq!(sig.cats, vec![1, 11]);
        assert_eq!(sig.html_patterns.len(), 1);
        assert_eq!(sig.script_src_patterns.len(), 2);
        // Header/Meta键统一小写
        assert!(sig.header_patterns.contains_key("x-powered-by"));
        assert_eq!(sig.meta_patterns.get("generator").unwrap().len(), 2);
        assert_eq!(sig.implied_techs, vec!["PHP", "MySQL"]);
    }

    #[test]
    fn test_implies_single_string() {
        // 测试场景：implies单字符串形态
        let mut raw = HashMap::new();
        raw.insert(
            "Gatsby".to_string(),
            raw_signature(json!({"implies": "React"})),
        );

        let compiled = SignatureCompiler::compile(&raw).unwrap();
        assert_eq!(
            compiled.techs.get("Gatsby").unwrap().implied_techs,
            vec!["React"]
        );
    }

    #[test]
    fn test_js_keys_keep_case_and_scalar_values() {
        // 测试场景：JS键保持大小写，标量值转写为字面量模式
        let mut raw = HashMap::new();
        raw.insert(
            "Vue".to_string(),
            raw_signature(json!({"js": {"Vue.version": "", "__VUE_SSR__": true}})),
        );

        let compiled = SignatureCompiler::compile(&raw).unwrap();
        let sig = compiled.techs.get("Vue").unwrap();

        assert!(sig.js_patterns.contains_key("Vue.version"));
        assert!(sig.js_patterns.contains_key("__VUE_SSR__"));
        assert!(sig.js_patterns.get("__VUE_SSR__").unwrap()[0].matches("true"));
    }

    #[test]
    fn test_bad_pattern_dropped_others_kept() {
        // 测试场景：单条非法正则被丢弃，同签名其余模式不受影响
        let mut raw = HashMap::new();
        raw.insert(
            "Broken".to_string(),
            raw_signature(json!({"html": ["good-pattern\\d+", "bad(pattern"]})),
        );

        let compiled = SignatureCompiler::compile(&raw).unwrap();
        let sig = compiled.techs.get("Broken").unwrap();
        assert_eq!(sig.html_patterns.len(), 1);
        assert!(sig.html_patterns[0].matches("good-pattern42"));
    }

    #[test]
    fn test_signature_without_patterns() {
        // 测试场景：无任何模式的签名仍进入编译结果（可被implies引用）
        let mut raw = HashMap::new();
        raw.insert(
            "Bar".to_string(),
            raw_signature(json!({"cats": [20]})),
        );

        let compiled = SignatureCompiler::compile(&raw).unwrap();
        let sig = compiled.techs.get("Bar").unwrap();
        assert!(sig.header_patterns.is_empty());
        assert!(sig.html_patterns.is_empty());
        assert_eq!(sig.cats, vec![20]);
    }
}
