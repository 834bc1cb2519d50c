//! 容器配置与统计信息

use serde::{Deserialize, Serialize};

use crate::resolver::DEFAULT_MAX_RESOLUTION_DEPTH;

/// 容器配置
///
/// 可以从配置的 `container` 节反序列化，缺失的字段使用默认值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否允许同名 Bean 定义覆盖
    pub allow_bean_definition_overriding: bool,
    /// 是否允许覆盖已经实例化的单例的定义
    pub allow_live_singleton_override: bool,
    /// 是否允许别名重新指向其他名称
    pub allow_alias_overriding: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 预实例化之前是否对全部定义做静态依赖检查，不影响解析时的循环检查
    pub enable_dependency_validation: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_bean_definition_overriding: true,
            allow_live_singleton_override: false,
            allow_alias_overriding: false,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            enable_dependency_validation: true,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册 Bean 定义数量
    pub registered_definitions: usize,
    /// 已注册别名数量
    pub registered_aliases: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
    /// 已创建的单例数量（含已销毁的）
    pub singletons_created: usize,
    /// 已创建的原型实例数量
    pub prototypes_created: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}
