//! 检测结果视图模型
//! 均为对累加器 + 编译后签名库 + 分类/分组查找表的只读投影

use std::fmt;

use serde::Serialize;

/// 技术基础信息视图
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// 技术综合信息视图
#[derive(Debug, Clone, Default, Serialize)]
pub struct TechInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    pub confidence: u8,
}

// ======== 为 TechInfo 实现 Display trait（用于 CLI / Report 输出） ========
impl fmt::Display for TechInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.categories.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} [{}]", self.name, self.categories.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tech_info_display() {
        // 测试场景：含分类与不含分类两种展示形态
        let bare = TechInfo {
            name: "PHP".to_string(),
            confidence: 100,
            ..Default::default()
        };
        assert_eq!(bare.to_string(), "PHP");

        let with_cats = TechInfo {
            name: "WordPress".to_string(),
            categories: vec!["CMS".to_string(), "Blogs".to_string()],
            confidence: 100,
            ..Default::default()
        };
        assert_eq!(with_cats.to_string(), "WordPress [CMS, Blogs]");
    }
}
