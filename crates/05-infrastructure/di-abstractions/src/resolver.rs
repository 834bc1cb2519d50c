//! 解析上下文
//!
//! 记录当前解析路径上的 Bean 名称，用于在进入某个名称之前发现循环依赖。
//! 每个依赖分支持有自己的路径副本，兄弟分支之间互不影响。

use infrastructure_common::{BeansError, BeansResult};

/// 默认最大解析深度
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// 解析上下文
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    resolution_chain: Vec<String>,
    /// 最大递归深度
    max_depth: usize,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESOLUTION_DEPTH)
    }
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(max_depth: usize) -> Self {
        Self {
            resolution_chain: Vec::new(),
            max_depth,
        }
    }

    /// 进入一个 Bean 名称，返回子路径的上下文
    ///
    /// 名称已在路径上时返回循环依赖错误，链路形如 `a -> b -> a`。
    pub fn enter(&self, name: &str) -> BeansResult<ResolveContext> {
        if let Some(start) = self.resolution_chain.iter().position(|n| n == name) {
            let mut chain: Vec<&str> = self.resolution_chain[start..]
                .iter()
                .map(String::as_str)
                .collect();
            chain.push(name);
            return Err(BeansError::CircularDependency {
                bean_name: name.to_string(),
                chain: chain.join(" -> "),
            });
        }

        if self.resolution_chain.len() >= self.max_depth {
            return Err(BeansError::illegal_state(format!(
                "解析 '{}' 时超过最大深度 {}: {}",
                name,
                self.max_depth,
                self.resolution_chain.join(" -> ")
            )));
        }

        let mut child = self.clone();
        child.resolution_chain.push(name.to_string());
        Ok(child)
    }

    /// 名称是否在当前路径上
    pub fn contains(&self, name: &str) -> bool {
        self.resolution_chain.iter().any(|n| n == name)
    }

    /// 当前路径
    pub fn chain(&self) -> &[String] {
        &self.resolution_chain
    }

    /// 当前深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    /// 最大深度
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}
