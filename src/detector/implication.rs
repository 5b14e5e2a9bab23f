//! 关联推导闭包
//! 把直接命中的技术集合扩展为包含全部传递关联技术的闭包
//!
//! 关联关系视为「技术 -> 关联技术」有向图；图允许成环，
//! 关联名也允许悬空（不存在对应签名），两者均不影响终止性

use std::collections::{HashMap, HashSet, VecDeque};

use crate::compiler::CompiledSignatures;

/// 关联关系邻接表
#[derive(Debug, Clone, Default)]
pub struct ImplicationGraph {
    adjacency: HashMap<String, Vec<String>>,
}

impl ImplicationGraph {
    /// 从编译后签名库构建邻接表
    pub fn from_signatures(compiled: &CompiledSignatures) -> Self {
        let mut adjacency = HashMap::new();
        for (tech_name, signature) in &compiled.techs {
            if !signature.implied_techs.is_empty() {
                adjacency.insert(tech_name.clone(), signature.implied_techs.clone());
            }
        }
        Self { adjacency }
    }

    /// 广度优先展开到不动点
    /// 入队前先检查结果集，保证每个名称至多入队一次（对环安全）；
    /// 悬空关联名同样并入结果集
    pub fn expand(&self, matched: &mut HashSet<String>) {
        let mut queue: VecDeque<String> = matched.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            if let Some(implied_techs) = self.adjacency.get(&current) {
                for implied in implied_techs {
                    if matched.insert(implied.clone()) {
                        queue.push_back(implied.clone());
                    }
                }
            }
        }
    }
}
