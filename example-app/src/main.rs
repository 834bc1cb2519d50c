//! # 示例应用程序
//!
//! 演示应用上下文的完整用法：配置驱动的 Bean 定义、占位符解析、事务配置导入、
//! 自动代理、事件、消息和可监听的异步结果。

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use clap::Parser;
use di_abstractions::{
    AliasRegistry, BeanDefinition, BeanDefinitionRegistry, BeanFactoryExt, BeanValue,
    ConfigurableListableBeanFactory, ImportMetadata, ImportRegistrar, Instantiator,
    ListableBeanFactory, Role,
};
use di_impl::DefaultInstantiator;
use infrastructure_common::{
    BeanInstance, BeansResult, ListenableFuture, SettableListenableFuture,
};
use infrastructure_composition::{
    ApplicationContext, ApplicationContextBuilder, ApplicationEvent, ApplicationEventPublisher,
    ApplicationListener, LoggingConfig, MessageSource, StaticMessageSource,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use transaction_support::{
    AutoProxyRegistrar, ProxyWrapper, TransactionManagementConfigurationSelector,
    AUTO_PROXY_REGISTRAR, MODE_ATTRIBUTE, PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION,
};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn IoC 示例应用")]
struct Args {
    /// 配置文件路径，不存在时只使用环境变量和内置定义
    #[arg(short, long, default_value = "config/application.toml")]
    config: PathBuf,

    /// 事务通知模式
    #[arg(long, default_value = "PROXY")]
    mode: String,

    /// 消息语言
    #[arg(long, default_value = "zh_CN")]
    locale: String,

    /// 使用生产环境日志（JSON 格式）
    #[arg(long)]
    production: bool,
}

#[derive(Debug)]
struct DataSource {
    url: String,
}

#[derive(Debug)]
struct OrderRepository {
    data_source: Arc<DataSource>,
}

#[derive(Debug)]
struct OrderService {
    repository: Arc<OrderRepository>,
}

impl OrderService {
    fn place_order(&self, item: &str) -> SettableListenableFuture<String> {
        let result = SettableListenableFuture::new();
        let completion = result.clone();
        let url = self.repository.data_source.url.clone();
        let item = item.to_string();
        tokio::spawn(async move {
            completion.set(format!("{item} 已写入 {url}"));
        });
        result
    }
}

#[derive(Debug)]
struct TransactionInterceptor;

/// 事务代理，持有原始 Bean
struct TransactionalProxy {
    target: BeanInstance,
}

struct TransactionalWrapper;

impl ProxyWrapper for TransactionalWrapper {
    fn wrap(
        &self,
        bean: &BeanInstance,
        _bean_name: &str,
        definition: &BeanDefinition,
    ) -> BeansResult<Option<BeanInstance>> {
        // 只代理服务层
        if definition.bean_class_name.as_deref() != Some(std::any::type_name::<OrderService>()) {
            return Ok(None);
        }
        Ok(Some(Arc::new(TransactionalProxy {
            target: Arc::clone(bean),
        })))
    }
}

/// 代理模式的事务配置，登记事务拦截器
struct ProxyTransactionConfiguration;

impl ImportRegistrar for ProxyTransactionConfiguration {
    fn register_bean_definitions(
        &self,
        _metadata: &ImportMetadata,
        factory: &dyn ConfigurableListableBeanFactory,
    ) -> BeansResult<()> {
        factory.register_bean_definition(
            "transactionInterceptor",
            BeanDefinition::for_type::<TransactionInterceptor>()
                .with_role(Role::Infrastructure)
                .with_instance_supplier(|| Ok(Arc::new(TransactionInterceptor) as BeanInstance)),
        )
    }
}

struct LifecycleLogger;

#[async_trait]
impl ApplicationListener for LifecycleLogger {
    async fn on_application_event(&self, event: &ApplicationEvent) -> BeansResult<()> {
        info!("收到事件 {} (来源 {})", event.name(), event.source);
        Ok(())
    }
}

fn instantiator() -> Arc<DefaultInstantiator> {
    let instantiator = Arc::new(DefaultInstantiator::new());
    instantiator.register_type(|args| {
        Ok(DataSource {
            url: args.value(0)?,
        })
    });
    instantiator.register_type(|args| {
        Ok(OrderRepository {
            data_source: args.bean(0)?,
        })
    });
    instantiator.register_type(|args| {
        Ok(OrderService {
            repository: args.bean(0)?,
        })
    });
    instantiator
}

fn messages() -> StaticMessageSource {
    let messages = StaticMessageSource::new();
    messages.add_message("order.placed", "", "Order placed: {0}");
    messages.add_message("order.placed", "zh", "订单已提交: {0}");
    messages
}

fn register_definitions(registry: &dyn BeanDefinitionRegistry) -> BeansResult<()> {
    if !registry.contains_bean_definition("dataSource") {
        registry.register_bean_definition(
            "dataSource",
            BeanDefinition::for_type::<DataSource>().with_constructor_arg(
                0,
                BeanValue::literal("${orders.database_url:memory://orders}"),
            ),
        )?;
    }
    registry.register_bean_definition(
        "orderRepository",
        BeanDefinition::for_type::<OrderRepository>()
            .with_constructor_arg(0, BeanValue::reference("dataSource")),
    )?;
    registry.register_bean_definition(
        "orderService",
        BeanDefinition::for_type::<OrderService>()
            .with_constructor_arg(0, BeanValue::autowired::<OrderRepository>()),
    )?;
    registry.register_alias("orderService", "orders")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let logging = if args.production {
        LoggingConfig::production()
    } else {
        LoggingConfig::development()
    };

    let mut builder = ApplicationContextBuilder::new()
        .with_logging(logging)
        .with_application_name("example-app")
        .with_instantiator(instantiator() as Arc<dyn Instantiator>)
        .with_message_source(Arc::new(messages()))
        .add_config_env_vars("EXAMPLE_APP");
    let has_config = args.config.exists();
    if has_config {
        builder = builder.add_config_toml(&args.config)?;
    }

    let context = builder.build().await.context("构建应用上下文失败")?;
    if !has_config {
        warn!("配置文件 {} 不存在，使用默认值", args.config.display());
    }
    register_definitions(&context)?;
    context.add_application_listener(Arc::new(LifecycleLogger))?;

    context.register_import_registrar(
        AUTO_PROXY_REGISTRAR,
        Arc::new(AutoProxyRegistrar::new(Arc::new(TransactionalWrapper))),
    );
    context.register_import_registrar(
        PROXY_TRANSACTION_MANAGEMENT_CONFIGURATION,
        Arc::new(ProxyTransactionConfiguration),
    );
    let metadata = ImportMetadata::new("example_app::TransactionConfig")
        .with_attribute(MODE_ATTRIBUTE, args.mode.as_str());
    let imported = context
        .process_imports(&TransactionManagementConfigurationSelector::default(), &metadata)
        .context("处理事务配置导入失败")?;
    info!("通知模式 {} 导入了 {:?}", args.mode, imported);

    context.refresh().await.context("刷新应用上下文失败")?;
    info!(
        "上下文 {} 已启动，共 {} 个 Bean 定义",
        context.display_name(),
        context.get_bean_definition_count()
    );

    let service = match context.get_bean_typed::<TransactionalProxy>("orders").await {
        Ok(proxy) => {
            info!("orderService 已被事务代理包装");
            Arc::clone(&proxy.target)
                .downcast::<OrderService>()
                .map_err(|_| anyhow::anyhow!("代理目标不是 OrderService"))?
        }
        Err(_) => context.get_bean_typed::<OrderService>("orders").await?,
    };

    let receipt = service.place_order("book-42").completable().await?;
    let message = context.get_message("order.placed", &[receipt], None, &args.locale)?;
    println!("{message}");

    context
        .publish_event(ApplicationEvent::custom(
            "example-app",
            "order_placed",
            json!({ "item": "book-42" }),
        ))
        .await?;

    context.close().await?;
    Ok(())
}
