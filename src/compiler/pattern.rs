//! 模式解释器
//! 负责把单条原始模式字符串解析为结构化匹配描述符，并对目标字符串求值
//!
//! 原始模式语法（Wappalyzer风格）：
//! 1. `\;` 之后为内嵌指令段，支持 `version:<模板>` 与 `confidence:<整数>`
//! 2. `/.../` 包裹的模式视为正则，匹配前剥离分隔符
//! 3. `(?-i)` 显式声明大小写敏感，其余模式一律大小写不敏感

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{RtdResult, TechDetectError};

// 指令分隔符（字面两个字符：反斜杠 + 分号）
const DIRECTIVE_SEPARATOR: &str = "\\;";

// 正则元字符集，清理后的模式含任一字符即按正则处理
const REGEX_META_CHARS: &[char] = &[
    '\\', '^', '$', '.', '|', '?', '*', '+', '(', '[', '{',
];

/// 通用版本形状正则
/// 按固定优先级排列，先命中先生效
static VERSION_SHAPE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\\;version:(.+)").unwrap(),
        Regex::new(r"[^\d](\d+(?:\.\d+)+)").unwrap(),
        Regex::new(r"\bv?(\d+(?:\.\d+)+)").unwrap(),
        Regex::new(r"version[:/\s]*([\d.]+)").unwrap(),
    ]
});

/// 单条编译后模式
/// 由原始模式字符串唯一确定，编译完成后只读
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    /// 清理后的模式文本（已剥离指令段与正则分隔符）
    pub pattern: String,
    /// 是否为字面量模式（子串包含匹配）
    pub is_literal: bool,
    /// 是否大小写敏感
    pub is_case_sensitive: bool,
    /// 静态版本（来自version指令或对模式文本的启发式提取，可为空）
    pub version: String,
    /// 置信度（0-100）
    pub confidence: u8,
    /// 编译后的正则（仅正则模式持有，求值时无需再加锁）
    regex: Option<Arc<Regex>>,
}

impl ParsedPattern {
    /// 仅做命中判断，不提取版本
    pub fn matches(&self, target: &str) -> bool {
        if self.is_literal {
            return self.literal_contains(target);
        }
        match &self.regex {
            Some(regex) => regex.is_match(target),
            None => false,
        }
    }

    /// 对目标字符串求值，返回（是否命中，版本）
    /// 1. 字面量模式：命中时直接返回静态版本，不从目标重新推导
    /// 2. 正则模式：无静态版本时，按启发式列表从目标提取（先命中先生效）
    pub fn evaluate(&self, target: &str) -> (bool, String) {
        if self.is_literal {
            return if self.literal_contains(target) {
                (true, self.version.clone())
            } else {
                (false, String::new())
            };
        }

        let Some(regex) = &self.regex else {
            return (false, String::new());
        };

        if regex.is_match(target) {
            let mut version = self.version.clone();
            if version.is_empty() {
                if let Some(v) = heuristic_version(target) {
                    version = v;
                }
            }
            (true, version)
        } else {
            (false, String::new())
        }
    }

    fn literal_contains(&self, target: &str) -> bool {
        if self.is_case_sensitive {
            target.contains(&self.pattern)
        } else {
            target.to_lowercase().contains(&self.pattern.to_lowercase())
        }
    }
}

/// 正则编译缓存
/// 以「清理前的原始模式字符串」为键，避免跨技术共享的同一模式被重复编译
#[derive(Debug, Default)]
pub struct RegexCache {
    cache: Mutex<HashMap<String, Arc<Regex>>>,
}

impl RegexCache {
    fn get_or_compile(&self, source: &str, cleaned: &str) -> RtdResult<Arc<Regex>> {
        if let Some(compiled) = self.cache.lock().unwrap().get(source) {
            return Ok(compiled.clone());
        }

        let normalized = normalize_regex(cleaned);
        let compiled = Arc::new(Regex::new(&normalized)?);
        self.cache
            .lock()
            .unwrap()
            .insert(source.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// 当前缓存条目数
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 模式解析器
/// 持有实例级正则缓存，引擎可多实例化且互不共享可变状态
#[derive(Debug, Default)]
pub struct PatternParser {
    regex_cache: RegexCache,
}

impl PatternParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析单条原始模式
    /// 正则模式在此处即时编译，编译失败视为该条模式无效
    pub fn parse(&self, raw: &str) -> RtdResult<ParsedPattern> {
        // 1. 解析内嵌指令（version/confidence），无指令时对模式文本做启发式版本提取
        let (version, confidence) = match parse_directives(raw) {
            Some((v, c)) => (v, c),
            None => match heuristic_version(raw) {
                Some(v) => (v, 70),
                None => (String::new(), 100),
            },
        };

        // 2. 清理模式文本：剥离指令段与正则分隔符
        let (cleaned, slash_delimited) = clean_pattern(raw);

        // 3. 基于清理后的文本分类；斜杠分隔的模式一律按正则处理
        let is_regex =
            slash_delimited || cleaned.chars().any(|c| REGEX_META_CHARS.contains(&c));

        // 4. 大小写敏感为显式声明制
        let is_case_sensitive = raw.contains("(?-i)") && !raw.contains("(?i)");

        // 5. 正则模式即时编译并缓存（键为原始模式字符串）
        let regex = if is_regex {
            let compiled = self
                .regex_cache
                .get_or_compile(raw, &cleaned)
                .map_err(|e| {
                    TechDetectError::InvalidPattern(format!("{}：{}", cleaned, e))
                })?;
            Some(compiled)
        } else {
            None
        };

        Ok(ParsedPattern {
            pattern: cleaned,
            is_literal: !is_regex,
            is_case_sensitive,
            version,
            confidence,
            regex,
        })
    }

    /// 已缓存的正则条目数（供编译统计输出）
    pub fn cached_regex_count(&self) -> usize {
        self.regex_cache.len()
    }
}

/// 解析内嵌指令段
/// 首个可识别指令生效：version -> (模板, 80)；confidence -> ("", 指定值)
fn parse_directives(raw: &str) -> Option<(String, u8)> {
    let parts: Vec<&str> = raw.split(DIRECTIVE_SEPARATOR).collect();
    if parts.len() < 2 {
        return None;
    }

    for part in &parts[1..] {
        if let Some(template) = part.strip_prefix("version:") {
            return Some((template.to_string(), 80));
        }
        if let Some(value) = part.strip_prefix("confidence:") {
            let confidence = value.trim().parse::<u8>().unwrap_or(100).min(100);
            return Some((String::new(), confidence));
        }
    }

    debug!("指令段无可识别指令，按无指令处理：{}", raw);
    None
}

/// 按启发式列表提取版本，先命中先生效
fn heuristic_version(text: &str) -> Option<String> {
    for shape in VERSION_SHAPE_REGEXES.iter() {
        if let Some(captures) = shape.captures(text) {
            if let Some(matched) = captures.get(1) {
                return Some(matched.as_str().to_string());
            }
        }
    }
    None
}

/// 清理模式文本，返回（清理结果，是否为斜杠分隔正则）
fn clean_pattern(raw: &str) -> (String, bool) {
    // 剥离指令段（分隔符出现在首位时不剥离）
    let mut pattern = match raw.find(DIRECTIVE_SEPARATOR) {
        Some(index) if index > 0 => &raw[..index],
        _ => raw,
    };

    // 剥离 /.../ 分隔符
    let mut slash_delimited = false;
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        pattern = &pattern[1..pattern.len() - 1];
        slash_delimited = true;
    }

    (pattern.to_string(), slash_delimited)
}

/// 正则规范化：除作者显式控制大小写外，一律前置不敏感标志
fn normalize_regex(pattern: &str) -> String {
    if !pattern.starts_with("(?i)") && !pattern.contains("(?-i)") {
        format!("(?i){}", pattern)
    } else {
        pattern.to_string()
    }
}
