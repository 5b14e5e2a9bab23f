//! JS变量提取器
//! 仅扫描内联脚本中的 `var NAME = "字面量"` 声明，不做任何JS求值

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::html_extractor::ScriptRecord;

/// JS变量声明正则（仅识别字符串字面量赋值）
static JS_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)var\s+([a-zA-Z0-9_$]+)\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// JS变量提取工具类
pub struct JsVarExtractor;

impl JsVarExtractor {
    /// 从脚本记录中提取「变量名 -> 字面量值」映射
    /// 变量名保持原始大小写，重复声明后者覆盖前者
    pub fn extract(scripts: &[ScriptRecord]) -> HashMap<String, String> {
        let mut vars = HashMap::new();

        for script in scripts {
            if script.content.is_empty() {
                continue;
            }

            for captures in JS_VAR_REGEX.captures_iter(&script.content) {
                if let (Some(name), Some(value)) = (captures.get(1), captures.get(2)) {
                    vars.insert(name.as_str().to_string(), value.as_str().to_string());
                }
            }
        }

        vars
    }
}
