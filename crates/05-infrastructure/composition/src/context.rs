//! 应用上下文
//!
//! [`GenericApplicationContext`] 组合一个 [`DefaultListableBeanFactory`]、事件广播器、
//! 资源解析器和消息源。生命周期为 `Uninitialized -> Active -> Closed`，单向转换：
//!
//! - 刷新之前可以注册 Bean 定义、后处理器和监听器，但不能获取 Bean；
//! - [`GenericApplicationContext::refresh`] 依次执行定义后处理器、预实例化单例，
//!   成功后进入 `Active` 并发布刷新事件，失败时销毁已创建的单例并进入 `Closed`；
//! - [`GenericApplicationContext::close`] 发布关闭事件、销毁单例并进入 `Closed`，
//!   之后所有访问 Bean 的操作都返回非法状态错误。

use crate::event::{
    ApplicationEvent, ApplicationEventKind, ApplicationEventPublisher, ApplicationListener,
    SimpleApplicationEventMulticaster,
};
use crate::message::{format_message, MessageSource, StaticMessageSource};
use crate::resource::{FileSystemResourceResolver, Resource, ResourcePatternResolver};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config_abstractions::ConfigManager;
use dashmap::DashMap;
use di_abstractions::{
    AliasRegistry, AutowireCapableBeanFactory, BeanDefinition, BeanDefinitionRegistry,
    BeanFactory, BeanFactoryPostProcessor, BeanPostProcessor, ConfigurableBeanFactory,
    ContainerConfig, HierarchicalBeanFactory, ImportMetadata, ImportRegistrar, ImportSelector,
    ListableBeanFactory,
};
use di_impl::DefaultListableBeanFactory;
use infrastructure_common::{
    BeanInstance, BeansError, BeansResult, ConfigResult, ContextState,
};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 应用上下文
///
/// 在分层、可枚举、可自动装配的 Bean 工厂之上组合事件发布、资源解析和消息解析。
pub trait ApplicationContext:
    ListableBeanFactory
    + HierarchicalBeanFactory
    + AutowireCapableBeanFactory
    + MessageSource
    + ApplicationEventPublisher
    + ResourcePatternResolver
{
    /// 唯一标识
    fn id(&self) -> &str;

    /// 应用名称，未设置时为空字符串
    fn application_name(&self) -> &str;

    /// 显示名称
    fn display_name(&self) -> &str;

    /// 首次刷新完成的时间
    fn startup_date(&self) -> Option<DateTime<Utc>>;

    /// 父上下文
    fn get_parent(&self) -> Option<Arc<dyn ApplicationContext>>;

    /// 生命周期状态
    fn state(&self) -> ContextState;

    /// 底层可自动装配的工厂，上下文不处于活动状态时返回非法状态错误
    fn get_autowire_capable_bean_factory(
        &self,
    ) -> BeansResult<Arc<dyn AutowireCapableBeanFactory>>;
}

/// 把父上下文适配为子工厂的父工厂，访问时遵循父上下文自身的状态检查
struct ParentContextAdapter {
    parent: Arc<dyn ApplicationContext>,
}

#[async_trait]
impl BeanFactory for ParentContextAdapter {
    async fn get_bean(&self, name: &str) -> BeansResult<BeanInstance> {
        self.parent.get_bean(name).await
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.parent.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        self.parent.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        self.parent.is_prototype(name)
    }

    fn get_type(&self, name: &str) -> BeansResult<Option<String>> {
        self.parent.get_type(name)
    }
}

#[async_trait]
impl AutowireCapableBeanFactory for ParentContextAdapter {
    async fn resolve_dependency(&self, type_name: &str) -> BeansResult<(String, BeanInstance)> {
        self.parent.resolve_dependency(type_name).await
    }
}

/// 上下文交给调用方的工厂句柄，每次访问都检查上下文是否仍处于活动状态
struct ActiveBeanFactoryHandle {
    display_name: String,
    state: Arc<RwLock<ContextState>>,
    factory: Arc<DefaultListableBeanFactory>,
}

impl ActiveBeanFactoryHandle {
    fn assert_active(&self) -> BeansResult<()> {
        check_active(*self.state.read(), &self.display_name)
    }
}

#[async_trait]
impl BeanFactory for ActiveBeanFactoryHandle {
    async fn get_bean(&self, name: &str) -> BeansResult<BeanInstance> {
        self.assert_active()?;
        self.factory.get_bean(name).await
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.factory.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        self.assert_active()?;
        self.factory.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        self.assert_active()?;
        self.factory.is_prototype(name)
    }

    fn get_type(&self, name: &str) -> BeansResult<Option<String>> {
        self.assert_active()?;
        self.factory.get_type(name)
    }
}

#[async_trait]
impl AutowireCapableBeanFactory for ActiveBeanFactoryHandle {
    async fn resolve_dependency(&self, type_name: &str) -> BeansResult<(String, BeanInstance)> {
        self.assert_active()?;
        self.factory.resolve_dependency(type_name).await
    }
}

fn check_active(state: ContextState, display_name: &str) -> BeansResult<()> {
    match state {
        ContextState::Active => Ok(()),
        ContextState::Uninitialized => Err(BeansError::illegal_state(format!(
            "上下文 {display_name} 尚未刷新"
        ))),
        ContextState::Closed => Err(BeansError::illegal_state(format!(
            "上下文 {display_name} 已经关闭"
        ))),
    }
}

/// 通用应用上下文
pub struct GenericApplicationContext {
    id: String,
    application_name: String,
    display_name: String,
    startup_date: RwLock<Option<DateTime<Utc>>>,
    state: Arc<RwLock<ContextState>>,
    bean_factory: Arc<DefaultListableBeanFactory>,
    parent: Option<Arc<dyn ApplicationContext>>,
    environment: Option<Arc<dyn ConfigManager>>,
    factory_post_processors: RwLock<Vec<Arc<dyn BeanFactoryPostProcessor>>>,
    multicaster: SimpleApplicationEventMulticaster,
    message_source: Arc<dyn MessageSource>,
    resource_resolver: Arc<dyn ResourcePatternResolver>,
    import_registrars: DashMap<String, Arc<dyn ImportRegistrar>>,
    /// 串行化 refresh 与 close
    lifecycle_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for GenericApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericApplicationContext")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("state", &*self.state.read())
            .field("has_parent", &self.parent.is_some())
            .field("bean_factory", &self.bean_factory)
            .finish()
    }
}

impl Default for GenericApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericApplicationContext {
    /// 使用默认容器配置创建上下文
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定容器配置创建上下文
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::with_bean_factory(Arc::new(DefaultListableBeanFactory::new(config)))
    }

    /// 包装已有的 Bean 工厂
    pub fn with_bean_factory(bean_factory: Arc<DefaultListableBeanFactory>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let display_name = format!("GenericApplicationContext@{}", &id[..8]);
        Self {
            id,
            application_name: String::new(),
            display_name,
            startup_date: RwLock::new(None),
            state: Arc::new(RwLock::new(ContextState::Uninitialized)),
            bean_factory,
            parent: None,
            environment: None,
            factory_post_processors: RwLock::new(Vec::new()),
            multicaster: SimpleApplicationEventMulticaster::new(),
            message_source: Arc::new(StaticMessageSource::new()),
            resource_resolver: Arc::new(FileSystemResourceResolver::default()),
            import_registrars: DashMap::new(),
            lifecycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 设置父上下文，子工厂找不到的 Bean 交给父上下文
    pub fn with_parent(mut self, parent: Arc<dyn ApplicationContext>) -> BeansResult<Self> {
        self.bean_factory
            .set_parent_bean_factory(Arc::new(ParentContextAdapter {
                parent: Arc::clone(&parent),
            }))?;
        debug!("{} 的父上下文: {}", self.display_name, parent.display_name());
        self.parent = Some(parent);
        Ok(self)
    }

    /// 设置应用名称
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// 设置显示名称
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// 设置配置环境
    pub fn with_environment(mut self, environment: Arc<dyn ConfigManager>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 设置消息源
    pub fn with_message_source(mut self, message_source: Arc<dyn MessageSource>) -> Self {
        self.message_source = message_source;
        self
    }

    /// 设置资源解析器
    pub fn with_resource_resolver(mut self, resolver: Arc<dyn ResourcePatternResolver>) -> Self {
        self.resource_resolver = resolver;
        self
    }

    /// 底层 Bean 工厂
    pub fn bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    /// 配置环境
    pub fn environment(&self) -> Option<&Arc<dyn ConfigManager>> {
        self.environment.as_ref()
    }

    /// 添加定义后处理器，刷新时按 `order` 执行
    pub fn add_bean_factory_post_processor(
        &self,
        processor: Arc<dyn BeanFactoryPostProcessor>,
    ) -> BeansResult<()> {
        self.assert_uninitialized("添加定义后处理器")?;
        self.factory_post_processors.write().push(processor);
        Ok(())
    }

    /// 添加 Bean 后处理器
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.add_bean_post_processor(processor);
        Ok(())
    }

    /// 添加事件监听器
    pub fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.multicaster.add_listener(listener);
        Ok(())
    }

    /// 手动注册单例
    pub fn register_singleton<T: Any + Send + Sync>(&self, name: &str, instance: Arc<T>) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.register_singleton(name, instance)
    }

    /// 为配置标识登记导入注册器
    pub fn register_import_registrar(
        &self,
        identifier: impl Into<String>,
        registrar: Arc<dyn ImportRegistrar>,
    ) {
        let identifier = identifier.into();
        debug!("登记导入注册器: {}", identifier);
        self.import_registrars.insert(identifier, registrar);
    }

    /// 执行导入选择器，依次调用每个标识对应的注册器，返回导入的标识
    ///
    /// 选择结果为空时什么也不做；标识没有登记注册器时返回未找到错误。
    pub fn process_imports(
        &self,
        selector: &dyn ImportSelector,
        metadata: &ImportMetadata,
    ) -> BeansResult<Vec<String>> {
        self.assert_not_closed()?;
        let imports = selector.select_imports(metadata)?;
        if imports.is_empty() {
            info!("{} 没有选择任何导入", metadata.importing_class);
            return Ok(imports);
        }

        for identifier in &imports {
            let registrar = self
                .import_registrars
                .get(identifier)
                .map(|entry| Arc::clone(entry.value()))
                .ok_or_else(|| BeansError::not_found(identifier, "没有为该配置标识登记导入注册器"))?;
            registrar.register_bean_definitions(metadata, self.bean_factory.as_ref())?;
            debug!("已导入配置: {}", identifier);
        }
        info!("{} 导入了 {:?}", metadata.importing_class, imports);
        Ok(imports)
    }

    /// 刷新上下文，只能执行一次
    pub async fn refresh(&self) -> BeansResult<()> {
        let _guard = self.lifecycle_lock.lock().await;
        self.assert_uninitialized("刷新")?;
        info!("刷新上下文: {}", self.display_name);

        if let Err(err) = self.refresh_bean_factory().await {
            error!("上下文刷新失败: {}, 错误: {}", self.display_name, err);
            self.cancel_refresh();
            return Err(err);
        }

        *self.startup_date.write() = Some(Utc::now());
        self.transition(ContextState::Active)?;

        let event = ApplicationEvent::new(&self.display_name, ApplicationEventKind::ContextRefreshed);
        if let Err(err) = self.publish(event).await {
            error!("刷新事件处理失败: {}, 错误: {}", self.display_name, err);
            self.cancel_refresh();
            return Err(err);
        }

        info!(
            "上下文已就绪: {}, 单例 {} 个",
            self.display_name,
            self.bean_factory.stats().active_singletons
        );
        Ok(())
    }

    /// 关闭上下文，重复关闭不做任何事
    pub async fn close(&self) -> BeansResult<()> {
        let _guard = self.lifecycle_lock.lock().await;
        let state = *self.state.read();
        match state {
            ContextState::Closed => {
                debug!("上下文已经关闭: {}", self.display_name);
                return Ok(());
            }
            ContextState::Uninitialized => {
                info!("关闭未刷新的上下文: {}", self.display_name);
            }
            ContextState::Active => {
                info!("关闭上下文: {}", self.display_name);
                let event =
                    ApplicationEvent::new(&self.display_name, ApplicationEventKind::ContextClosed);
                // 监听器失败不阻止关闭
                if let Err(err) = self.publish(event).await {
                    warn!("关闭事件处理失败: {}, 错误: {}", self.display_name, err);
                }
            }
        }

        self.bean_factory.close();
        self.transition(ContextState::Closed)?;
        info!("上下文已关闭: {}", self.display_name);
        Ok(())
    }

    /// 上下文是否处于活动状态
    pub fn is_active(&self) -> bool {
        self.state.read().is_active()
    }

    async fn refresh_bean_factory(&self) -> BeansResult<()> {
        let mut processors = self.factory_post_processors.read().clone();
        processors.sort_by_key(|p| p.order());
        for processor in processors {
            processor
                .post_process_bean_factory(self.bean_factory.as_ref())
                .await?;
        }
        debug!("定义后处理完成: {}", self.display_name);

        self.bean_factory.pre_instantiate_singletons().await
    }

    fn cancel_refresh(&self) {
        self.bean_factory.close();
        *self.state.write() = ContextState::Closed;
    }

    fn transition(&self, target: ContextState) -> BeansResult<()> {
        let mut state = self.state.write();
        if !state.can_transition_to(target) {
            return Err(BeansError::illegal_state(format!(
                "上下文 {} 不能从 {:?} 转换到 {:?}",
                self.display_name, *state, target
            )));
        }
        debug!("上下文状态: {:?} -> {:?}", *state, target);
        *state = target;
        Ok(())
    }

    fn assert_active(&self) -> BeansResult<()> {
        check_active(*self.state.read(), &self.display_name)
    }

    fn assert_not_closed(&self) -> BeansResult<()> {
        if self.state.read().is_closed() {
            return Err(BeansError::illegal_state(format!(
                "上下文 {} 已经关闭",
                self.display_name
            )));
        }
        Ok(())
    }

    fn assert_uninitialized(&self, operation: &str) -> BeansResult<()> {
        let state = *self.state.read();
        if state == ContextState::Uninitialized {
            Ok(())
        } else {
            Err(BeansError::illegal_state(format!(
                "上下文 {} 处于 {:?} 状态，不能{}",
                self.display_name, state, operation
            )))
        }
    }

    async fn publish(&self, event: ApplicationEvent) -> BeansResult<()> {
        self.multicaster.multicast_event(&event).await?;
        if let Some(parent) = &self.parent {
            parent.publish_event(event).await?;
        }
        Ok(())
    }
}

impl AliasRegistry for GenericApplicationContext {
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.bean_factory.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.bean_factory.get_aliases(name)
    }

    fn canonical_name(&self, name: &str) -> String {
        self.bean_factory.canonical_name(name)
    }
}

impl BeanDefinitionRegistry for GenericApplicationContext {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.register_bean_definition(name, definition)
    }

    fn replace_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.replace_bean_definition(name, definition)
    }

    fn remove_bean_definition(&self, name: &str) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.bean_factory.remove_bean_definition(name)
    }

    fn get_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        self.assert_not_closed()?;
        self.bean_factory.get_bean_definition(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.bean_factory.contains_bean_definition(name)
    }
}

#[async_trait]
impl BeanFactory for GenericApplicationContext {
    async fn get_bean(&self, name: &str) -> BeansResult<BeanInstance> {
        self.assert_active()?;
        self.bean_factory.get_bean(name).await
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        self.assert_active()?;
        self.bean_factory.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        self.assert_active()?;
        self.bean_factory.is_prototype(name)
    }

    fn get_type(&self, name: &str) -> BeansResult<Option<String>> {
        self.assert_active()?;
        self.bean_factory.get_type(name)
    }
}

impl HierarchicalBeanFactory for GenericApplicationContext {
    fn parent_bean_factory(&self) -> Option<Arc<dyn AutowireCapableBeanFactory>> {
        self.bean_factory.parent_bean_factory()
    }

    fn contains_local_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_local_bean(name)
    }
}

#[async_trait]
impl ListableBeanFactory for GenericApplicationContext {
    fn get_bean_definition_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_definition_names()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_factory.get_bean_definition_count()
    }

    /// 上下文不处于活动状态时返回空列表
    fn get_bean_names_for_type(&self, type_name: &str, include_non_singletons: bool) -> Vec<String> {
        if let Err(err) = self.assert_active() {
            warn!("按类型查找 Bean 名称被拒绝: {}", err);
            return Vec::new();
        }
        self.bean_factory
            .get_bean_names_for_type(type_name, include_non_singletons)
    }

    async fn get_beans_of_type(&self, type_name: &str) -> BeansResult<Vec<(String, BeanInstance)>> {
        self.assert_active()?;
        self.bean_factory.get_beans_of_type(type_name).await
    }

    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        self.assert_not_closed()?;
        self.bean_factory.get_merged_bean_definition(name)
    }
}

#[async_trait]
impl AutowireCapableBeanFactory for GenericApplicationContext {
    async fn resolve_dependency(&self, type_name: &str) -> BeansResult<(String, BeanInstance)> {
        self.assert_active()?;
        self.bean_factory.resolve_dependency(type_name).await
    }
}

impl MessageSource for GenericApplicationContext {
    /// 本上下文没有该消息时交给父上下文，最后才使用默认消息
    fn get_message(
        &self,
        code: &str,
        args: &[String],
        default_message: Option<&str>,
        locale: &str,
    ) -> BeansResult<String> {
        match self.message_source.get_message(code, args, None, locale) {
            Err(err) if err.is_not_found() => {}
            other => return other,
        }
        if let Some(parent) = &self.parent {
            return parent.get_message(code, args, default_message, locale);
        }
        match default_message {
            Some(template) => Ok(format_message(template, args)),
            None => Err(BeansError::not_found(
                code,
                format!("上下文 {} 及其祖先中没有该消息", self.display_name),
            )),
        }
    }
}

#[async_trait]
impl ApplicationEventPublisher for GenericApplicationContext {
    /// 已关闭的上下文不能发布事件，事件同时传播给父上下文
    async fn publish_event(&self, event: ApplicationEvent) -> BeansResult<()> {
        self.assert_not_closed()?;
        self.publish(event).await
    }
}

impl ResourcePatternResolver for GenericApplicationContext {
    fn get_resource(&self, location: &str) -> Resource {
        self.resource_resolver.get_resource(location)
    }

    fn get_resources(&self, location_pattern: &str) -> ConfigResult<Vec<Resource>> {
        self.resource_resolver.get_resources(location_pattern)
    }
}

impl ApplicationContext for GenericApplicationContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn application_name(&self) -> &str {
        &self.application_name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn startup_date(&self) -> Option<DateTime<Utc>> {
        *self.startup_date.read()
    }

    fn get_parent(&self) -> Option<Arc<dyn ApplicationContext>> {
        self.parent.clone()
    }

    fn state(&self) -> ContextState {
        *self.state.read()
    }

    fn get_autowire_capable_bean_factory(
        &self,
    ) -> BeansResult<Arc<dyn AutowireCapableBeanFactory>> {
        self.assert_active()?;
        Ok(Arc::new(ActiveBeanFactoryHandle {
            display_name: self.display_name.clone(),
            state: Arc::clone(&self.state),
            factory: Arc::clone(&self.bean_factory),
        }))
    }
}
