//! # Configuration Abstractions
//!
//! 配置抽象层，定义配置来源与配置管理的核心接口。
//!
//! ## 核心接口
//!
//! - [`ConfigProvider`] - 配置提供者接口
//! - [`ConfigManager`] - 按优先级组合多个提供者的配置管理器接口

pub mod manager;
pub mod provider;

pub use manager::*;
pub use provider::*;
