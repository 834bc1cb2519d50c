//! # Transaction Support
//!
//! 事务管理的导入选择与基础设施：
//!
//! - [`TransactionManagementConfigurationSelector`] - 按通知模式选择要导入的事务配置
//! - [`ClassPathProbe`] / [`StaticClassPath`] - 判断 JTA 事务注解是否可用
//! - [`AutoProxyPostProcessor`] / [`AutoProxyRegistrar`] - 自动代理，跳过基础设施 Bean
//! - [`SmartTransactionObject`] / [`ResourceHolder`] - 事务对象与资源同步状态

pub mod auto_proxy;
pub mod error;
pub mod object;
pub mod selector;

pub use auto_proxy::*;
pub use error::*;
pub use object::*;
pub use selector::*;
