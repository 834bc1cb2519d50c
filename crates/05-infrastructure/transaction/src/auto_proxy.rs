//! 自动代理
//!
//! [`AutoProxyPostProcessor`] 在 Bean 初始化之后决定是否用代理包装它。代理本身由
//! [`ProxyWrapper`] 生成；基础设施角色的 Bean 和具备 AOP 基础设施能力的 Bean
//! 永远不会被包装。[`AutoProxyRegistrar`] 在导入 `AutoProxyRegistrar` 配置时把
//! 后处理器注册到工厂。

use crate::selector::AdviceMode;
use dashmap::DashSet;
use di_abstractions::{
    BeanDefinition, BeanPostProcessor, ConfigurableListableBeanFactory, ImportMetadata,
    ImportRegistrar, Role,
};
use infrastructure_common::{BeanCapability, BeanInstance, BeansResult, CapabilityRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// 自动代理创建器在工厂中的名称
pub const AUTO_PROXY_CREATOR_BEAN_NAME: &str = "internalAutoProxyCreator";
/// 导入元数据中是否代理具体类型的属性
pub const PROXY_TARGET_CLASS_ATTRIBUTE: &str = "proxy_target_class";

/// 代理生成
pub trait ProxyWrapper: Send + Sync {
    /// 为 Bean 生成代理，不需要代理时返回 `None`
    fn wrap(
        &self,
        bean: &BeanInstance,
        bean_name: &str,
        definition: &BeanDefinition,
    ) -> BeansResult<Option<BeanInstance>>;
}

/// 自动代理后处理器
pub struct AutoProxyPostProcessor {
    capabilities: Arc<CapabilityRegistry>,
    wrapper: Arc<dyn ProxyWrapper>,
    proxy_target_class: bool,
    proxied: DashSet<String>,
}

impl fmt::Debug for AutoProxyPostProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoProxyPostProcessor")
            .field("proxy_target_class", &self.proxy_target_class)
            .field("proxied", &self.proxied.len())
            .finish()
    }
}

impl AutoProxyPostProcessor {
    /// 创建后处理器，能力表通常取自所在工厂
    pub fn new(capabilities: Arc<CapabilityRegistry>, wrapper: Arc<dyn ProxyWrapper>) -> Self {
        Self {
            capabilities,
            wrapper,
            proxy_target_class: false,
            proxied: DashSet::new(),
        }
    }

    /// 是否代理具体类型
    pub fn with_proxy_target_class(mut self, proxy_target_class: bool) -> Self {
        self.proxy_target_class = proxy_target_class;
        self
    }

    /// 是否代理具体类型
    pub fn is_proxy_target_class(&self) -> bool {
        self.proxy_target_class
    }

    /// 基础设施 Bean 永远不会被包装
    pub fn is_infrastructure_bean(&self, bean: &BeanInstance, definition: &BeanDefinition) -> bool {
        definition.role == Role::Infrastructure
            || definition.has_capability(BeanCapability::AopInfrastructure)
            || self
                .capabilities
                .instance_has(bean, BeanCapability::AopInfrastructure)
    }

    /// 该名称的 Bean 是否已被包装
    pub fn is_proxied(&self, bean_name: &str) -> bool {
        self.proxied.contains(bean_name)
    }
}

impl BeanPostProcessor for AutoProxyPostProcessor {
    fn post_process_after_initialization(
        &self,
        bean: BeanInstance,
        bean_name: &str,
        definition: &BeanDefinition,
    ) -> BeansResult<BeanInstance> {
        if self.is_infrastructure_bean(&bean, definition) {
            debug!("跳过基础设施 Bean: {}", bean_name);
            return Ok(bean);
        }
        match self.wrapper.wrap(&bean, bean_name, definition)? {
            Some(proxy) => {
                debug!("已为 Bean 创建代理: {}", bean_name);
                self.proxied.insert(bean_name.to_string());
                Ok(proxy)
            }
            None => Ok(bean),
        }
    }

    // 晚于其他后处理器执行，包装的是最终实例
    fn order(&self) -> i32 {
        i32::MAX
    }

    fn name(&self) -> &str {
        "AutoProxyPostProcessor"
    }
}

/// 注册自动代理后处理器的导入注册器
pub struct AutoProxyRegistrar {
    wrapper: Arc<dyn ProxyWrapper>,
}

impl fmt::Debug for AutoProxyRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoProxyRegistrar").finish_non_exhaustive()
    }
}

impl AutoProxyRegistrar {
    /// 使用指定的代理生成创建注册器
    pub fn new(wrapper: Arc<dyn ProxyWrapper>) -> Self {
        Self { wrapper }
    }
}

impl ImportRegistrar for AutoProxyRegistrar {
    /// 代理模式下注册一次，重复导入或其他模式不做任何事
    fn register_bean_definitions(
        &self,
        metadata: &ImportMetadata,
        factory: &dyn ConfigurableListableBeanFactory,
    ) -> BeansResult<()> {
        let mode = AdviceMode::from_metadata(metadata);
        if mode != AdviceMode::Proxy {
            debug!("通知模式 {}，不注册自动代理创建器", mode);
            return Ok(());
        }
        if factory.contains_bean(AUTO_PROXY_CREATOR_BEAN_NAME) {
            debug!("自动代理创建器已经注册");
            return Ok(());
        }

        let proxy_target_class = metadata
            .attributes
            .get(PROXY_TARGET_CLASS_ATTRIBUTE)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let capabilities = factory.capabilities();
        capabilities.declare::<AutoProxyPostProcessor>(BeanCapability::AopInfrastructure);
        let processor = Arc::new(
            AutoProxyPostProcessor::new(capabilities, Arc::clone(&self.wrapper))
                .with_proxy_target_class(proxy_target_class),
        );

        factory.register_singleton_instance(
            AUTO_PROXY_CREATOR_BEAN_NAME,
            Arc::clone(&processor) as BeanInstance,
            Some(std::any::type_name::<AutoProxyPostProcessor>().to_string()),
        )?;
        factory.add_bean_post_processor(processor);
        info!(
            "已注册自动代理创建器 (proxy_target_class = {})",
            proxy_target_class
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{
        BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    };
    use di_impl::DefaultListableBeanFactory;

    #[derive(Debug, Default)]
    struct OrderService;

    #[derive(Debug, Default)]
    struct Advisor;

    struct Proxy {
        target: BeanInstance,
    }

    struct WrapEverything;

    impl ProxyWrapper for WrapEverything {
        fn wrap(
            &self,
            bean: &BeanInstance,
            _bean_name: &str,
            _definition: &BeanDefinition,
        ) -> BeansResult<Option<BeanInstance>> {
            Ok(Some(Arc::new(Proxy {
                target: Arc::clone(bean),
            })))
        }
    }

    fn supplied<T: Default + Send + Sync + 'static>() -> BeanDefinition {
        BeanDefinition::for_type::<T>()
            .with_instance_supplier(|| Ok(Arc::new(T::default()) as BeanInstance))
    }

    fn enable(factory: &DefaultListableBeanFactory) {
        AutoProxyRegistrar::new(Arc::new(WrapEverything))
            .register_bean_definitions(&ImportMetadata::new("app::TxConfig"), factory)
            .unwrap();
    }

    #[tokio::test]
    async fn application_beans_are_wrapped() {
        let factory = DefaultListableBeanFactory::default();
        enable(&factory);
        factory
            .register_bean_definition("orderService", supplied::<OrderService>())
            .unwrap();

        let proxy = factory.get_bean_typed::<Proxy>("orderService").await.unwrap();
        assert!(proxy.target.downcast_ref::<OrderService>().is_some());
    }

    #[tokio::test]
    async fn infrastructure_beans_are_never_wrapped() {
        let factory = DefaultListableBeanFactory::default();
        enable(&factory);
        factory.capabilities().declare::<Advisor>(BeanCapability::AopInfrastructure);
        factory
            .register_bean_definition(
                "infraRole",
                supplied::<OrderService>().with_role(Role::Infrastructure),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "flagged",
                supplied::<OrderService>().with_capability(BeanCapability::AopInfrastructure),
            )
            .unwrap();
        factory
            .register_bean_definition("advisor", supplied::<Advisor>())
            .unwrap();

        assert!(factory.get_bean_typed::<OrderService>("infraRole").await.is_ok());
        assert!(factory.get_bean_typed::<OrderService>("flagged").await.is_ok());
        assert!(factory.get_bean_typed::<Advisor>("advisor").await.is_ok());
    }

    #[tokio::test]
    async fn registrar_is_idempotent_and_skips_other_modes() {
        let factory = DefaultListableBeanFactory::default();
        enable(&factory);
        enable(&factory);
        assert_eq!(factory.bean_post_processor_count(), 1);

        let creator = factory
            .get_bean_typed::<AutoProxyPostProcessor>(AUTO_PROXY_CREATOR_BEAN_NAME)
            .await
            .unwrap();
        assert!(!creator.is_proxy_target_class());
        assert!(factory
            .capabilities()
            .type_has::<AutoProxyPostProcessor>(BeanCapability::AopInfrastructure));

        let aspectj = DefaultListableBeanFactory::default();
        AutoProxyRegistrar::new(Arc::new(WrapEverything))
            .register_bean_definitions(
                &ImportMetadata::new("app::TxConfig").with_attribute("mode", "ASPECTJ"),
                &aspectj,
            )
            .unwrap();
        assert!(!aspectj.contains_bean(AUTO_PROXY_CREATOR_BEAN_NAME));
    }
}
