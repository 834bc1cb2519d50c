//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn IoC 容器各层共享的基础类型。
//!
//! ## 核心组件
//!
//! - [`BeansError`] - 容器错误分类
//! - [`ContextState`] / [`ResolutionState`] - 上下文与单例解析的状态机
//! - [`TypeInfo`] - 类型元数据，用于按类型装配
//! - [`BeanCapability`] / [`CapabilityRegistry`] - 替代标记接口的能力标记
//! - [`ConfigSection`] - 配置节
//! - [`SettableListenableFuture`] - 支持回调注册的异步结果
//!
//! ## 设计原则
//!
//! - 容器状态归属于具体的工厂实例，不使用全局注册表
//! - 错误显式向调用方传播，不做静默吞掉

pub mod component;
pub mod concurrent;
pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use concurrent::*;
pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
