//! # 依赖注入具体实现
//!
//! 提供默认的 Bean 工厂、别名注册表和实例化器实现。
//!
//! - [`DefaultListableBeanFactory`] - 分层、可枚举、可按类型装配的 Bean 工厂
//! - [`SimpleAliasRegistry`] - 单跳别名注册表
//! - [`DefaultInstantiator`] - 按名称登记构造函数与工厂方法的实例化器

pub mod alias;
pub mod factory;
pub mod instantiator;

pub use alias::SimpleAliasRegistry;
pub use factory::DefaultListableBeanFactory;
pub use instantiator::{ConstructorFn, DefaultInstantiator, FactoryMethodFn, LifecycleFn};
