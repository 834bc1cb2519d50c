//! 应用上下文集成测试：生命周期、父子上下文、消息回退与事务配置导入

use anyhow::Result;
use async_trait::async_trait;
use di_abstractions::{
    AutowireCapableBeanFactory, BeanDefinition, BeanDefinitionRegistry, BeanFactory,
    BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory, ContainerConfig,
    ImportMetadata, ImportRegistrar, Instantiator, Role,
};
use di_impl::{DefaultInstantiator, DefaultListableBeanFactory};
use infrastructure_common::{BeanInstance, BeansError, BeansResult, ContextState};
use infrastructure_composition::{
    ApplicationContext, ApplicationEvent, ApplicationEventPublisher, ApplicationListener,
    GenericApplicationContext, MessageSource, StaticMessageSource,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use transaction_support::{
    AutoProxyRegistrar, ProxyWrapper, TransactionManagementConfigurationSelector,
    AUTO_PROXY_CREATOR_BEAN_NAME, AUTO_PROXY_REGISTRAR, MODE_ATTRIBUTE,
    PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION,
};

#[derive(Debug)]
struct Greeting(&'static str);

#[derive(Debug)]
struct Clock;

#[derive(Debug)]
struct Cache;

#[derive(Debug)]
struct OrderService;

#[derive(Debug)]
struct TransactionInterceptor;

struct TransactionalProxy {
    target: BeanInstance,
}

#[derive(Default)]
struct EventNames(Mutex<Vec<String>>);

#[async_trait]
impl ApplicationListener for EventNames {
    async fn on_application_event(&self, event: &ApplicationEvent) -> BeansResult<()> {
        self.0.lock().push(event.name().to_string());
        Ok(())
    }
}

fn greeting(text: &'static str) -> BeanDefinition {
    BeanDefinition::for_type::<Greeting>()
        .with_instance_supplier(move || Ok(Arc::new(Greeting(text)) as BeanInstance))
}

fn clock() -> BeanDefinition {
    BeanDefinition::for_type::<Clock>().with_instance_supplier(|| Ok(Arc::new(Clock) as BeanInstance))
}

#[tokio::test]
async fn closed_context_rejects_bean_access() -> Result<()> {
    let context = GenericApplicationContext::new();
    context.register_bean_definition("clock", clock())?;
    context.refresh().await?;
    assert!(context.get_bean_typed::<Clock>("clock").await.is_ok());

    context.close().await?;
    assert_eq!(context.state(), ContextState::Closed);
    assert!(matches!(
        context.get_bean("clock").await.unwrap_err(),
        BeansError::IllegalState { .. }
    ));
    assert!(context.get_autowire_capable_bean_factory().is_err());
    assert!(context.register_bean_definition("late", clock()).is_err());
    assert!(context
        .publish_event(ApplicationEvent::custom("test", "late", json!(null)))
        .await
        .is_err());
    Ok(())
}

#[tokio::test]
async fn factory_handle_stops_working_after_close() -> Result<()> {
    let context = GenericApplicationContext::new();
    context.register_bean_definition("clock", clock())?;
    context.refresh().await?;

    let handle = context.get_autowire_capable_bean_factory()?;
    let before = handle.get_bean("clock").await?;
    assert!(before.downcast_ref::<Clock>().is_some());

    context.close().await?;
    assert!(matches!(
        handle.get_bean("clock").await.unwrap_err(),
        BeansError::IllegalState { .. }
    ));
    assert!(handle
        .resolve_dependency(std::any::type_name::<Clock>())
        .await
        .is_err());
    assert!(handle.get_type("clock").is_err());
    assert!(context.bean_factory().is_closed());
    assert!(context.bean_factory().get_bean("clock").await.is_err());
    assert_eq!(context.bean_factory().stats().active_singletons, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bean_finishing_after_close_is_destroyed_and_not_returned() -> Result<()> {
    let started = Arc::new(Notify::new());
    let destroyed = Arc::new(AtomicUsize::new(0));
    let instantiator = Arc::new(DefaultInstantiator::new());
    let signal = Arc::clone(&started);
    instantiator.register_constructor("test::Cache", move |_| {
        signal.notify_one();
        std::thread::sleep(Duration::from_millis(300));
        Ok(Arc::new(Cache) as BeanInstance)
    });
    let counter = Arc::clone(&destroyed);
    instantiator.register_destroy_method::<Cache, _>("close", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let factory = Arc::new(DefaultListableBeanFactory::with_instantiator(
        ContainerConfig::default(),
        instantiator as Arc<dyn Instantiator>,
    ));
    let context = Arc::new(GenericApplicationContext::with_bean_factory(Arc::clone(&factory)));
    context.register_bean_definition(
        "cache",
        BeanDefinition::new("test::Cache")
            .with_lazy_init(true)
            .with_destroy_method("close"),
    )?;
    context.refresh().await?;

    let lookup = tokio::spawn({
        let context = Arc::clone(&context);
        async move { context.get_bean("cache").await }
    });
    started.notified().await;
    context.close().await?;

    let result = tokio::time::timeout(Duration::from_secs(5), lookup).await??;
    assert!(matches!(result.unwrap_err(), BeansError::IllegalState { .. }));
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(factory.stats().active_singletons, 0);
    assert!(context.get_bean("cache").await.is_err());
    Ok(())
}

#[tokio::test]
async fn child_context_shadows_and_falls_back_to_parent() -> Result<()> {
    let parent = Arc::new(GenericApplicationContext::new().with_display_name("parent"));
    parent.register_bean_definition("greeting", greeting("parent"))?;
    parent.register_bean_definition("clock", clock())?;
    parent.refresh().await?;

    let child = GenericApplicationContext::new()
        .with_display_name("child")
        .with_parent(Arc::clone(&parent) as Arc<dyn ApplicationContext>)?;
    child.register_bean_definition("greeting", greeting("child"))?;
    child.refresh().await?;

    assert_eq!(child.get_bean_typed::<Greeting>("greeting").await?.0, "child");
    assert_eq!(parent.get_bean_typed::<Greeting>("greeting").await?.0, "parent");
    assert!(child.get_bean_typed::<Clock>("clock").await.is_ok());
    assert!(!parent.contains_bean("missing"));
    assert!(child.get_bean("missing").await.unwrap_err().is_not_found());
    assert_eq!(
        child.get_parent().map(|p| p.display_name().to_string()),
        Some("parent".to_string())
    );

    // 父上下文关闭后，回退到父上下文的查找也失败
    parent.close().await?;
    assert!(matches!(
        child.get_bean("clock").await.unwrap_err(),
        BeansError::IllegalState { .. }
    ));
    Ok(())
}

#[tokio::test]
async fn child_events_reach_parent_listeners() -> Result<()> {
    let parent = Arc::new(GenericApplicationContext::new());
    let parent_events = Arc::new(EventNames::default());
    parent.add_application_listener(parent_events.clone())?;
    parent.refresh().await?;

    let child = GenericApplicationContext::new()
        .with_parent(Arc::clone(&parent) as Arc<dyn ApplicationContext>)?;
    let child_events = Arc::new(EventNames::default());
    child.add_application_listener(child_events.clone())?;
    child.refresh().await?;
    child
        .publish_event(ApplicationEvent::custom("orders", "order_placed", json!({ "id": 7 })))
        .await?;
    child.close().await?;

    assert_eq!(
        *child_events.0.lock(),
        vec!["context_refreshed", "order_placed", "context_closed"]
    );
    assert_eq!(
        *parent_events.0.lock(),
        vec![
            "context_refreshed",
            "context_refreshed",
            "order_placed",
            "context_closed"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn messages_fall_back_to_parent_then_default() -> Result<()> {
    let messages = StaticMessageSource::new();
    messages.add_message("welcome", "", "Hello {0}");
    messages.add_message("welcome", "zh", "你好 {0}");
    let parent = Arc::new(GenericApplicationContext::new().with_message_source(Arc::new(messages)));

    let child = GenericApplicationContext::new()
        .with_parent(Arc::clone(&parent) as Arc<dyn ApplicationContext>)?;
    let args = vec!["Ann".to_string()];

    assert_eq!(child.get_message("welcome", &args, None, "zh_CN")?, "你好 Ann");
    assert_eq!(child.get_message("welcome", &args, None, "en")?, "Hello Ann");
    assert_eq!(
        child.get_message("farewell", &args, Some("Bye {0}"), "en")?,
        "Bye Ann"
    );
    assert!(child.get_message("farewell", &args, None, "en").unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn failed_refresh_destroys_created_singletons() -> Result<()> {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_constructor("test::Cache", |_| Ok(Arc::new(Cache) as BeanInstance));
    instantiator.register_constructor("test::Broken", |_| {
        Err(BeansError::creation_failed("broken", "连接被拒绝"))
    });
    let counter = Arc::clone(&destroyed);
    instantiator.register_destroy_method::<Cache, _>("close", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let factory = Arc::new(DefaultListableBeanFactory::with_instantiator(
        ContainerConfig::default(),
        instantiator as Arc<dyn Instantiator>,
    ));
    let context = GenericApplicationContext::with_bean_factory(Arc::clone(&factory));
    context.register_bean_definition(
        "cache",
        BeanDefinition::new("test::Cache").with_destroy_method("close"),
    )?;
    context.register_bean_definition("broken", BeanDefinition::new("test::Broken"))?;

    assert!(context.refresh().await.is_err());
    assert_eq!(context.state(), ContextState::Closed);
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(factory.stats().active_singletons, 0);
    assert!(context.refresh().await.is_err());
    Ok(())
}

struct WrapInTransaction;

impl ProxyWrapper for WrapInTransaction {
    fn wrap(
        &self,
        bean: &BeanInstance,
        _bean_name: &str,
        _definition: &BeanDefinition,
    ) -> BeansResult<Option<BeanInstance>> {
        Ok(Some(Arc::new(TransactionalProxy {
            target: Arc::clone(bean),
        })))
    }
}

/// 代理模式事务配置：登记事务拦截器，并确认自动代理创建器已先行注册
struct ProxyTransactionConfiguration {
    creator_present: Mutex<Option<bool>>,
}

impl ImportRegistrar for ProxyTransactionConfiguration {
    fn register_bean_definitions(
        &self,
        _metadata: &ImportMetadata,
        factory: &dyn ConfigurableListableBeanFactory,
    ) -> BeansResult<()> {
        *self.creator_present.lock() = Some(factory.contains_bean(AUTO_PROXY_CREATOR_BEAN_NAME));
        factory.register_bean_definition(
            "transactionInterceptor",
            BeanDefinition::for_type::<TransactionInterceptor>()
                .with_role(Role::Infrastructure)
                .with_instance_supplier(|| Ok(Arc::new(TransactionInterceptor) as BeanInstance)),
        )
    }
}

fn transactional_context() -> (GenericApplicationContext, Arc<ProxyTransactionConfiguration>) {
    let context = GenericApplicationContext::new();
    let configuration = Arc::new(ProxyTransactionConfiguration {
        creator_present: Mutex::new(None),
    });
    context.register_import_registrar(
        AUTO_PROXY_REGISTRAR,
        Arc::new(AutoProxyRegistrar::new(Arc::new(WrapInTransaction))),
    );
    context.register_import_registrar(
        PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION,
        configuration.clone(),
    );
    (context, configuration)
}

#[tokio::test]
async fn proxy_mode_installs_auto_proxy_before_transaction_configuration() -> Result<()> {
    let (context, configuration) = transactional_context();
    context.register_bean_definition(
        "orderService",
        BeanDefinition::for_type::<OrderService>()
            .with_instance_supplier(|| Ok(Arc::new(OrderService) as BeanInstance)),
    )?;

    let metadata = ImportMetadata::new("app::TransactionConfig").with_attribute(MODE_ATTRIBUTE, "PROXY");
    let imported =
        context.process_imports(&TransactionManagementConfigurationSelector::default(), &metadata)?;
    assert_eq!(
        imported,
        vec![AUTO_PROXY_REGISTRAR, PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION]
    );
    assert_eq!(*configuration.creator_present.lock(), Some(true));
    assert_eq!(context.bean_factory().bean_post_processor_count(), 1);

    context.refresh().await?;
    let proxy = context
        .get_bean_typed::<TransactionalProxy>("orderService")
        .await?;
    assert!(proxy.target.downcast_ref::<OrderService>().is_some());
    assert!(context
        .get_bean_typed::<TransactionInterceptor>("transactionInterceptor")
        .await
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn unknown_mode_imports_nothing() -> Result<()> {
    let (context, configuration) = transactional_context();
    let metadata = ImportMetadata::new("app::TransactionConfig").with_attribute(MODE_ATTRIBUTE, "WEAVING");

    let imported =
        context.process_imports(&TransactionManagementConfigurationSelector::default(), &metadata)?;
    assert!(imported.is_empty());
    assert_eq!(*configuration.creator_present.lock(), None);
    assert!(!context.contains_bean(AUTO_PROXY_CREATOR_BEAN_NAME));
    assert_eq!(context.bean_factory().bean_post_processor_count(), 0);
    Ok(())
}
