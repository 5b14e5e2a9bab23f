//! 原始指纹库数据模型定义
//! 仅存储签名数据，无任何业务逻辑，支持序列化/反序列化
//!
//! 原始通道字段为松散形态（string | 列表 | 映射），以serde_json::Value承载，
//! 由签名编译器统一归一化

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 单个技术的原始签名（作者编写形态）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSignature {
    // 数组形态的签名库依赖自带name字段重建映射键
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "cats", default, alias = "categories")]
    pub cats: Vec<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,

    // 键控检测通道（键：Header名/Cookie名/Meta名/JS变量名）
    #[serde(default)]
    pub headers: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub cookies: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub meta: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub js: Option<HashMap<String, serde_json::Value>>,

    // 列表检测通道
    #[serde(default)]
    pub html: Option<serde_json::Value>,
    #[serde(default, alias = "script")]
    pub scripts: Option<serde_json::Value>,
    #[serde(rename = "scriptSrc", default)]
    pub script_src: Option<serde_json::Value>,

    // 关联规则
    #[serde(default)]
    pub implies: Option<serde_json::Value>,
}

/// 原始分类定义
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub groups: Vec<u32>,
}

/// 原始分组定义
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGroup {
    #[serde(default)]
    pub name: String,
}

/// 完整原始指纹库
/// 三个数据集相互独立：技术按名称键控，分类/分组按十进制ID字符串键控
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCorpus {
    pub technologies: HashMap<String, RawSignature>,
    pub categories: HashMap<String, RawCategory>,
    pub groups: HashMap<String, RawGroup>,
}
