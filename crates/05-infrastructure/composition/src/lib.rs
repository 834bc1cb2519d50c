//! # 基础设施组合层
//!
//! 把 Bean 工厂、配置、事件、资源和消息组合成应用上下文。
//!
//! ## 主要功能
//!
//! - **应用上下文**: [`GenericApplicationContext`] 管理 `Uninitialized -> Active -> Closed` 生命周期
//! - **上下文构建器**: [`ApplicationContextBuilder`] 汇总配置源与定义来源，可选初始化日志
//! - **事件**: 刷新、关闭与自定义事件，向父上下文传播
//! - **资源与消息**: glob 资源查找，按语言环境回退的消息解析
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{ApplicationContext, ApplicationContextBuilder};
//! use di_abstractions::BeanFactory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ApplicationContextBuilder::new()
//!         .add_config_toml("application.toml")?
//!         .add_config_env_vars("APP")
//!         .refresh()
//!         .await?;
//!
//!     let _data_source = context.get_bean("dataSource").await?;
//!     println!("{} 已就绪", context.display_name());
//!
//!     context.close().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod context;
pub mod event;
pub mod message;
pub mod resource;

// 重新导出主要类型
pub use builder::{ApplicationContextBuilder, LoggingConfig, CONTAINER_SECTION};
pub use context::{ApplicationContext, GenericApplicationContext};
pub use event::{
    ApplicationEvent, ApplicationEventKind, ApplicationEventPublisher, ApplicationListener,
    SimpleApplicationEventMulticaster,
};
pub use message::{format_message, MessageSource, StaticMessageSource, DEFAULT_LOCALE};
pub use resource::{FileSystemResourceResolver, Resource, ResourcePatternResolver};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
