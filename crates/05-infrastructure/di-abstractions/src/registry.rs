//! Bean 定义注册表抽象接口

use crate::alias::AliasRegistry;
use crate::definition::BeanDefinition;
use infrastructure_common::{BeansError, BeansResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Bean 定义注册表 trait
///
/// 按名称保存 [`BeanDefinition`]，并组合别名注册表。所有查询只针对本地注册表，
/// 不会访问父工厂。
pub trait BeanDefinitionRegistry: AliasRegistry {
    /// 注册 Bean 定义
    ///
    /// 覆盖已经实例化的单例定义时，除非显式允许，否则返回冲突错误。
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()>;

    /// 原位替换已有的 Bean 定义，保留注册顺序
    ///
    /// 供定义后处理阶段使用，不受覆盖开关限制；名称不存在时返回未找到错误，
    /// 对应单例已经实例化时返回冲突错误。
    fn replace_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()>;

    /// 移除 Bean 定义，同时清除该名称缓存的单例
    fn remove_bean_definition(&self, name: &str) -> BeansResult<()>;

    /// 获取 Bean 定义（名称或别名），不存在时返回未找到错误
    fn get_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>>;

    /// 本地是否包含 Bean 定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 名称是否已被 Bean 定义或别名占用
    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.contains_bean_definition(name) || self.is_alias(name)
    }
}

/// 依赖图节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraphNode {
    /// Bean 名称
    pub name: String,
    /// 依赖的 Bean 名称列表
    pub dependencies: Vec<String>,
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 检测循环依赖
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> BeansResult<()>;

    /// 构建依赖图
    fn build_dependency_graph(
        &self,
        definitions: &[(String, Arc<BeanDefinition>)],
    ) -> Vec<DependencyGraphNode>;
}

/// 默认循环依赖检测器
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> BeansResult<()> {
        // 使用深度优先搜索检测循环依赖
        let index: HashMap<&str, &DependencyGraphNode> =
            graph.iter().map(|node| (node.name.as_str(), node)).collect();
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        for node in graph {
            if !visited.contains(node.name.as_str()) {
                self.dfs_check(&node.name, &index, &mut visited, &mut path)?;
            }
        }

        debug!("依赖图检查通过，共 {} 个节点", graph.len());
        Ok(())
    }

    fn build_dependency_graph(
        &self,
        definitions: &[(String, Arc<BeanDefinition>)],
    ) -> Vec<DependencyGraphNode> {
        definitions
            .iter()
            .map(|(name, definition)| DependencyGraphNode {
                name: name.clone(),
                dependencies: definition.dependency_names(),
            })
            .collect()
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check<'a>(
        &self,
        current: &'a str,
        index: &HashMap<&'a str, &'a DependencyGraphNode>,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> BeansResult<()> {
        if let Some(start) = path.iter().position(|name| *name == current) {
            // 检测到循环依赖
            let mut chain: Vec<&str> = path[start..].to_vec();
            chain.push(current);
            return Err(BeansError::CircularDependency {
                bean_name: current.to_string(),
                chain: chain.join(" -> "),
            });
        }

        if visited.contains(current) {
            return Ok(());
        }

        path.push(current);

        // 不在图中的名称视为叶子节点（例如来自父工厂的 Bean）
        if let Some(node) = index.get(current).copied() {
            for dep in &node.dependencies {
                self.dfs_check(dep, index, visited, path)?;
            }
        }

        path.pop();
        visited.insert(current);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, deps: &[&str]) -> DependencyGraphNode {
        DependencyGraphNode {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn reports_cycle_chain_in_traversal_order() {
        let graph = vec![
            node("a", &["b"]),
            node("b", &["c"]),
            node("c", &["a"]),
        ];
        let err = DefaultCircularDependencyDetector
            .detect_circular_dependencies(&graph)
            .unwrap_err();
        match err {
            BeansError::CircularDependency { bean_name, chain } => {
                assert_eq!(bean_name, "a");
                assert_eq!(chain, "a -> b -> c -> a");
            }
            other => panic!("意外的错误: {other:?}"),
        }
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let graph = vec![
            node("app", &["left", "right"]),
            node("left", &["shared"]),
            node("right", &["shared"]),
            node("shared", &["external"]),
        ];
        assert!(DefaultCircularDependencyDetector
            .detect_circular_dependencies(&graph)
            .is_ok());
    }

    #[test]
    fn graph_is_built_from_definition_references() {
        let defs = vec![(
            "service".to_string(),
            Arc::new(
                BeanDefinition::new("app::Service")
                    .with_depends_on(["schema"])
                    .with_property("repo", crate::BeanValue::reference("repository")),
            ),
        )];
        let graph = DefaultCircularDependencyDetector.build_dependency_graph(&defs);
        assert_eq!(graph, vec![node("service", &["schema", "repository"])]);
    }
}
