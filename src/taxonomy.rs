//! 分类/分组查找表
//! 由指纹库的分类、分组两个数据集一次性构建，此后全程只读，
//! 双向索引（分类->分组、分组->分类）随表同时建立

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::corpus::{RawCategory, RawGroup};

/// 技术分类条目
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryItem {
    pub name: String,
    pub priority: u32,
    /// 该分类所属的分组ID列表
    pub groups: Vec<u32>,
}

/// 技术分组条目
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupItem {
    pub name: String,
}

/// 分类/分组查找表（含双向索引）
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    categories: HashMap<u32, CategoryItem>,
    groups: HashMap<u32, GroupItem>,
    category_to_groups: HashMap<u32, Vec<u32>>,
    group_to_categories: HashMap<u32, Vec<u32>>,
}

impl Taxonomy {
    /// 从原始数据集构建查找表
    /// 键为十进制ID字符串，无法解析的条目直接跳过
    pub fn from_corpus(
        raw_categories: &HashMap<String, RawCategory>,
        raw_groups: &HashMap<String, RawGroup>,
    ) -> Self {
        let mut taxonomy = Taxonomy::default();

        for (id_str, raw) in raw_categories {
            let Ok(category_id) = id_str.parse::<u32>() else {
                debug!("分类ID [{}] 无法解析已跳过", id_str);
                continue;
            };

            if !raw.groups.is_empty() {
                taxonomy
                    .category_to_groups
                    .insert(category_id, raw.groups.clone());
                for group_id in &raw.groups {
                    taxonomy
                        .group_to_categories
                        .entry(*group_id)
                        .or_default()
                        .push(category_id);
                }
            }

            taxonomy.categories.insert(
                category_id,
                CategoryItem {
                    name: raw.name.clone(),
                    priority: raw.priority.unwrap_or(0),
                    groups: raw.groups.clone(),
                },
            );
        }

        for (id_str, raw) in raw_groups {
            let Ok(group_id) = id_str.parse::<u32>() else {
                debug!("分组ID [{}] 无法解析已跳过", id_str);
                continue;
            };
            taxonomy.groups.insert(
                group_id,
                GroupItem {
                    name: raw.name.clone(),
                },
            );
        }

        taxonomy
    }

    /// 分类表
    pub fn categories(&self) -> &HashMap<u32, CategoryItem> {
        &self.categories
    }

    /// 分组表
    pub fn groups(&self) -> &HashMap<u32, GroupItem> {
        &self.groups
    }

    /// 单个分类
    pub fn category(&self, category_id: u32) -> Option<&CategoryItem> {
        self.categories.get(&category_id)
    }

    /// 单个分组
    pub fn group(&self, group_id: u32) -> Option<&GroupItem> {
        self.groups.get(&group_id)
    }

    /// 分类所属的分组ID列表
    pub fn groups_of_category(&self, category_id: u32) -> &[u32] {
        self.category_to_groups
            .get(&category_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 分组下辖的分类ID列表
    pub fn categories_of_group(&self, group_id: u32) -> &[u32] {
        self.group_to_categories
            .get(&group_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 分类ID列表转分类名称列表（未知ID跳过）
    pub fn category_names(&self, category_ids: &[u32]) -> Vec<String> {
        category_ids
            .iter()
            .filter_map(|id| self.categories.get(id).map(|c| c.name.clone()))
            .collect()
    }

    /// 分类ID列表可达的分组名称（去重合并，未知ID跳过）
    pub fn group_names_for_categories(&self, category_ids: &[u32]) -> Vec<String> {
        let mut seen_group_ids = Vec::new();
        for category_id in category_ids {
            for group_id in self.groups_of_category(*category_id) {
                if !seen_group_ids.contains(group_id) {
                    seen_group_ids.push(*group_id);
                }
            }
        }

        seen_group_ids
            .iter()
            .filter_map(|id| self.groups.get(id).map(|g| g.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_taxonomy() -> Taxonomy {
        let mut raw_categories = HashMap::new();
        raw_categories.insert(
            "10".to_string(),
            RawCategory {
                name: "Analytics".to_string(),
                priority: Some(1),
                groups: vec![3],
            },
        );
        raw_categories.insert(
            "11".to_string(),
            RawCategory {
                name: "Blogs".to_string(),
                priority: Some(2),
                groups: vec![3, 5],
            },
        );
        raw_categories.insert(
            "bad-id".to_string(),
            RawCategory::default(),
        );

        let mut raw_groups = HashMap::new();
        raw_groups.insert(
            "3".to_string(),
            RawGroup {
                name: "Marketing".to_string(),
            },
        );
        raw_groups.insert(
            "5".to_string(),
            RawGroup {
                name: "Content".to_string(),
            },
        );

        Taxonomy::from_corpus(&raw_categories, &raw_groups)
    }

    #[test]
    fn test_bidirectional_index() {
        // 测试场景：分类->分组与分组->分类双向索引一致
        let taxonomy = sample_taxonomy();

        assert_eq!(taxonomy.groups_of_category(11), &[3, 5]);
        let mut categories = taxonomy.categories_of_group(3).to_vec();
        categories.sort_unstable();
        assert_eq!(categories, vec![10, 11]);
        // 无法解析的ID被跳过
        assert_eq!(taxonomy.categories().len(), 2);
    }

    #[test]
    fn test_group_names_union_deduplicated() {
        // 测试场景：多分类可达分组名去重合并
        let taxonomy = sample_taxonomy();

        let mut names = taxonomy.group_names_for_categories(&[10, 11]);
        names.sort();
        assert_eq!(names, vec!["Content", "Marketing"]);
    }

    #[test]
    fn test_unknown_ids_yield_empty() {
        // 测试场景：未知分类/分组ID返回空结果而非错误
        let taxonomy = sample_taxonomy();

        assert!(taxonomy.category_names(&[99]).is_empty());
        assert!(taxonomy.categories_of_group(99).is_empty());
        assert!(taxonomy.groups_of_category(99).is_empty());
    }
}
