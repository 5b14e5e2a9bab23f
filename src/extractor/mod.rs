//! 提取模块：从响应体中提取检测所需的页面证据
pub mod html_extractor;
pub mod input_guard;
pub mod js_vars;

pub use self::html_extractor::{HtmlExtractor, ScriptRecord};
pub use self::input_guard::HtmlInputGuard;
pub use self::js_vars::JsVarExtractor;

use std::collections::HashMap;

use crate::error::RtdResult;

/// 一次响应的提取产物
#[derive(Debug, Clone, Default)]
pub struct ExtractedArtifacts {
    /// 脚本记录（外部源URL与内联内容）
    pub scripts: Vec<ScriptRecord>,
    /// meta标签映射（名称已小写，重复名后者覆盖前者）
    pub meta_tags: HashMap<String, String>,
    /// 页面标题（取首个title标签）
    pub title: String,
}

/// 对HTML文本做整体提取
/// 输入守卫拒绝的内容返回EvidenceExtractError，由检测调用方吸收
pub fn extract_artifacts(html: &str) -> RtdResult<ExtractedArtifacts> {
    let html = HtmlInputGuard::guard(html)?;

    let extractor = HtmlExtractor::new();
    let result = extractor.extract(html);

    let mut meta_tags = HashMap::new();
    for (name, content) in result.get_meta_tags() {
        meta_tags.insert(name, content);
    }

    Ok(ExtractedArtifacts {
        scripts: result.get_scripts(),
        meta_tags,
        title: result.get_title(),
    })
}
