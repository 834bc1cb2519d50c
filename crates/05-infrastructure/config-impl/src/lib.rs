//! # Configuration Implementation
//!
//! 配置管理的具体实现，以及把配置接入容器的两个扩展点。
//!
//! ## 主要组件
//!
//! - [`LayeredConfigManager`] - 按优先级组合提供者的配置管理器
//! - [`TomlConfigProvider`] / [`JsonConfigProvider`] - 文件配置提供者
//! - [`EnvironmentConfigProvider`] - 环境变量配置提供者
//! - [`MapConfigProvider`] - 内存配置提供者
//! - [`PlaceholderConfigurer`] - 解析 Bean 定义中的 `${key:default}` 占位符
//! - [`ConfigBeanDefinitionReader`] - 从 `beans` 配置节读取 Bean 定义

pub mod manager;
pub mod placeholder;
pub mod providers;
pub mod reader;

pub use manager::*;
pub use placeholder::*;
pub use providers::*;
pub use reader::*;
