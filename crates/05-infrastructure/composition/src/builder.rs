//! 应用上下文构建器

use crate::context::{ApplicationContext, GenericApplicationContext};
use crate::message::MessageSource;
use crate::resource::FileSystemResourceResolver;
use config_abstractions::{ConfigManager, ConfigManagerExt, ConfigProvider};
use config_impl::{
    ConfigBeanDefinitionReader, EnvironmentConfigProvider, JsonConfigProvider,
    LayeredConfigManager, PlaceholderConfigurer, TomlConfigProvider, DEFAULT_BEANS_SECTION,
};
use di_abstractions::{BeanDefinitionReader, ContainerConfig, Instantiator};
use di_impl::DefaultListableBeanFactory;
use infrastructure_common::InfrastructureError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 容器配置所在的配置节
pub const CONTAINER_SECTION: &str = "container";

/// 应用上下文构建器
///
/// 汇总配置源和定义来源，构建一个尚未刷新的 [`GenericApplicationContext`]：
///
/// 1. 按优先级组合配置源，作为上下文的配置环境；
/// 2. 显式设置的 [`ContainerConfig`] 优先，否则读取 `container` 配置节；
/// 3. 从 `beans` 配置节和额外的读取器加载 Bean 定义；
/// 4. 注册占位符配置器，刷新时解析定义中的 `${key:default}`。
pub struct ApplicationContextBuilder {
    /// 配置源列表
    config_sources: Vec<Box<dyn ConfigProvider>>,
    /// 额外的定义读取器
    definition_readers: Vec<Box<dyn BeanDefinitionReader>>,
    /// 读取 Bean 定义的配置节，`None` 表示不从配置读取
    beans_section: Option<String>,
    container_config: Option<ContainerConfig>,
    instantiator: Option<Arc<dyn Instantiator>>,
    parent: Option<Arc<dyn ApplicationContext>>,
    application_name: Option<String>,
    display_name: Option<String>,
    message_source: Option<Arc<dyn MessageSource>>,
    resource_base_dir: Option<PathBuf>,
    /// 是否注册占位符配置器
    resolve_placeholders: bool,
    ignore_unresolvable_placeholders: bool,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl std::fmt::Debug for ApplicationContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContextBuilder")
            .field(
                "config_sources",
                &self.config_sources.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("definition_readers", &self.definition_readers.len())
            .field("beans_section", &self.beans_section)
            .field("application_name", &self.application_name)
            .field("resolve_placeholders", &self.resolve_placeholders)
            .field("logging_enabled", &self.logging_enabled)
            .finish()
    }
}

impl ApplicationContextBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config_sources: Vec::new(),
            definition_readers: Vec::new(),
            beans_section: Some(DEFAULT_BEANS_SECTION.to_string()),
            container_config: None,
            instantiator: None,
            parent: None,
            application_name: None,
            display_name: None,
            message_source: None,
            resource_base_dir: None,
            resolve_placeholders: true,
            ignore_unresolvable_placeholders: false,
            logging_enabled: false, // 默认不初始化日志，由应用自行决定
            logging_config: LoggingConfig::default(),
        }
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> Result<Self, InfrastructureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InfrastructureError::BootstrapFailed {
                message: format!("配置文件不存在: {}", path.display()),
            });
        }

        info!("添加 TOML 配置文件: {}", path.display());
        let provider = TomlConfigProvider::new(path)?;
        self.config_sources.push(Box::new(provider));
        Ok(self)
    }

    /// 添加 JSON 配置文件
    pub fn add_config_json<P: AsRef<Path>>(mut self, path: P) -> Result<Self, InfrastructureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InfrastructureError::BootstrapFailed {
                message: format!("配置文件不存在: {}", path.display()),
            });
        }

        info!("添加 JSON 配置文件: {}", path.display());
        let provider = JsonConfigProvider::new(path)?;
        self.config_sources.push(Box::new(provider));
        Ok(self)
    }

    /// 添加环境变量配置源
    pub fn add_config_env_vars<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        self.config_sources
            .push(Box::new(EnvironmentConfigProvider::new(prefix)));
        self
    }

    /// 添加自定义配置提供者
    pub fn add_config_provider<T: ConfigProvider + 'static>(mut self, provider: T) -> Self {
        info!("添加自定义配置提供者: {}", provider.name());
        self.config_sources.push(Box::new(provider));
        self
    }

    /// 按环境加载目录中的 `application.toml` 与 `application-{profile}.toml`
    ///
    /// 文件不存在时跳过；环境专用文件的优先级高于通用文件。
    pub fn with_profile<P: AsRef<Path>>(
        mut self,
        dir: P,
        profile: &str,
    ) -> Result<Self, InfrastructureError> {
        info!("加载环境配置: {}", profile);
        let dir = dir.as_ref();

        let base = dir.join("application.toml");
        if base.exists() {
            self.config_sources
                .push(Box::new(TomlConfigProvider::new(&base)?));
            debug!("添加通用配置: {}", base.display());
        }

        let profiled = dir.join(format!("application-{profile}.toml"));
        if profiled.exists() {
            self.config_sources
                .push(Box::new(TomlConfigProvider::new(&profiled)?.with_priority(110)));
            debug!("添加环境配置: {}", profiled.display());
        }
        Ok(self)
    }

    /// 添加额外的 Bean 定义读取器
    pub fn add_definition_reader<R: BeanDefinitionReader + 'static>(mut self, reader: R) -> Self {
        debug!("添加定义读取器: {}", reader.description());
        self.definition_readers.push(Box::new(reader));
        self
    }

    /// 设置读取 Bean 定义的配置节
    pub fn with_beans_section(mut self, section: impl Into<String>) -> Self {
        self.beans_section = Some(section.into());
        self
    }

    /// 不从配置读取 Bean 定义
    pub fn without_config_definitions(mut self) -> Self {
        self.beans_section = None;
        self
    }

    /// 显式设置容器配置，忽略 `container` 配置节
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = Some(config);
        self
    }

    /// 设置实例化器
    pub fn with_instantiator(mut self, instantiator: Arc<dyn Instantiator>) -> Self {
        self.instantiator = Some(instantiator);
        self
    }

    /// 设置父上下文
    pub fn with_parent(mut self, parent: Arc<dyn ApplicationContext>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 设置应用名称
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// 设置显示名称
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// 设置消息源
    pub fn with_message_source(mut self, message_source: Arc<dyn MessageSource>) -> Self {
        self.message_source = Some(message_source);
        self
    }

    /// 设置资源解析的根目录
    pub fn with_resource_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_base_dir = Some(dir.into());
        self
    }

    /// 是否在刷新时解析占位符
    pub fn resolve_placeholders(mut self, enabled: bool) -> Self {
        self.resolve_placeholders = enabled;
        self
    }

    /// 无法解析的占位符保留原样
    pub fn ignore_unresolvable_placeholders(mut self, ignore: bool) -> Self {
        self.ignore_unresolvable_placeholders = ignore;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 构建尚未刷新的上下文
    pub async fn build(self) -> Result<GenericApplicationContext, InfrastructureError> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            self.initialize_logging()?;
        }
        info!("开始构建应用上下文");

        let mut config_manager = LayeredConfigManager::new();
        for provider in self.config_sources {
            config_manager.register_provider(provider).await?;
        }
        let environment: Arc<dyn ConfigManager> = Arc::new(config_manager);

        let container_config = match self.container_config {
            Some(config) => config,
            None => match environment.bind_section::<ContainerConfig>(CONTAINER_SECTION).await {
                Ok(config) => {
                    debug!("使用配置节 [{}] 中的容器配置", CONTAINER_SECTION);
                    config
                }
                Err(err) if err.is_key_not_found() => ContainerConfig::default(),
                Err(err) => return Err(err.into()),
            },
        };
        debug!("容器配置: {:?}", container_config);

        let bean_factory = match self.instantiator {
            Some(instantiator) => {
                DefaultListableBeanFactory::with_instantiator(container_config, instantiator)
            }
            None => DefaultListableBeanFactory::new(container_config),
        };

        let mut context = GenericApplicationContext::with_bean_factory(Arc::new(bean_factory))
            .with_environment(Arc::clone(&environment));
        if let Some(name) = self.application_name {
            context = context.with_application_name(name);
        }
        if let Some(name) = self.display_name {
            context = context.with_display_name(name);
        }
        if let Some(message_source) = self.message_source {
            context = context.with_message_source(message_source);
        }
        if let Some(dir) = self.resource_base_dir {
            context = context.with_resource_resolver(Arc::new(FileSystemResourceResolver::new(dir)));
        }
        if let Some(parent) = self.parent {
            context = context.with_parent(parent)?;
        }

        let mut loaded = 0;
        if let Some(section) = self.beans_section {
            let reader = ConfigBeanDefinitionReader::new(Arc::clone(&environment)).with_section(section);
            loaded += reader
                .load_bean_definitions(context.bean_factory().as_ref())
                .await?;
        }
        for reader in &self.definition_readers {
            loaded += reader
                .load_bean_definitions(context.bean_factory().as_ref())
                .await?;
        }

        if self.resolve_placeholders {
            let configurer = PlaceholderConfigurer::new(Arc::clone(&environment))?
                .with_ignore_unresolvable(self.ignore_unresolvable_placeholders);
            context.add_bean_factory_post_processor(Arc::new(configurer))?;
        }

        info!(
            "应用上下文构建完成: {}, 加载了 {} 个 Bean 定义",
            context.display_name(),
            loaded
        );
        Ok(context)
    }

    /// 构建并刷新上下文
    pub async fn refresh(self) -> Result<GenericApplicationContext, InfrastructureError> {
        let context = self.build().await?;
        context.refresh().await?;
        Ok(context)
    }

    /// 初始化日志系统
    fn initialize_logging(&self) -> Result<(), InfrastructureError> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(self.logging_config.level)
            .with_target(self.logging_config.show_target)
            .with_thread_ids(self.logging_config.show_thread_ids)
            .with_file(self.logging_config.show_file)
            .with_line_number(self.logging_config.show_line_number);

        if self.logging_config.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }
}
