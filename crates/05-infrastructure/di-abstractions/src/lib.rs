//! # Dependency Injection Abstractions
//!
//! 容器抽象层，定义 Bean 定义模型、注册表与 Bean 工厂的核心接口。
//!
//! ## 核心接口
//!
//! - [`AliasRegistry`] - 别名注册表接口
//! - [`BeanDefinition`] - Bean 定义元数据
//! - [`BeanDefinitionRegistry`] - Bean 定义注册表接口
//! - [`BeanFactory`] / [`HierarchicalBeanFactory`] / [`ListableBeanFactory`] /
//!   [`AutowireCapableBeanFactory`] - Bean 工厂接口
//! - [`Instantiator`] - 实例化能力接口
//! - [`BeanPostProcessor`] / [`BeanFactoryPostProcessor`] - 后处理扩展点
//! - [`BeanDefinitionReader`] - Bean 定义来源
//! - [`ImportSelector`] - 配置导入选择器

pub mod alias;
pub mod container;
pub mod definition;
pub mod factory;
pub mod import;
pub mod processor;
pub mod reader;
pub mod registry;
pub mod resolver;

pub use alias::*;
pub use container::*;
pub use definition::*;
pub use factory::*;
pub use import::*;
pub use processor::*;
pub use reader::*;
pub use registry::*;
pub use resolver::*;
