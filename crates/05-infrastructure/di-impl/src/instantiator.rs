//! 基于注册表的实例化器
//!
//! Rust 没有运行时反射，构造函数、工厂方法和生命周期方法需要事先按名称登记。
//! 查找顺序：实例提供函数 -> 工厂方法（实例或静态）-> 构造函数。

use dashmap::DashMap;
use di_abstractions::{InstantiationRequest, Instantiator, ResolvedArguments};
use infrastructure_common::{BeanInstance, BeansError, BeansResult};
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

/// 构造函数或静态工厂方法
pub type ConstructorFn = Arc<dyn Fn(&ResolvedArguments) -> BeansResult<BeanInstance> + Send + Sync>;

/// 工厂 Bean 上的实例方法
pub type FactoryMethodFn =
    Arc<dyn Fn(&BeanInstance, &ResolvedArguments) -> BeansResult<BeanInstance> + Send + Sync>;

/// 初始化或销毁方法
pub type LifecycleFn = Arc<dyn Fn(&BeanInstance) -> BeansResult<()> + Send + Sync>;

/// 默认实例化器
#[derive(Default)]
pub struct DefaultInstantiator {
    /// 实现类型名称 -> 构造函数
    constructors: DashMap<String, ConstructorFn>,
    /// (实现类型名称, 方法名) -> 静态工厂方法
    static_factories: DashMap<(String, String), ConstructorFn>,
    /// (工厂 Bean 具体类型, 方法名) -> 实例工厂方法
    instance_factories: DashMap<(TypeId, String), FactoryMethodFn>,
    /// (Bean 具体类型, 方法名) -> 生命周期方法
    lifecycle_methods: DashMap<(TypeId, String), LifecycleFn>,
}

impl std::fmt::Debug for DefaultInstantiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultInstantiator")
            .field("constructors", &self.constructors.len())
            .field("static_factories", &self.static_factories.len())
            .field("instance_factories", &self.instance_factories.len())
            .field("lifecycle_methods", &self.lifecycle_methods.len())
            .finish()
    }
}

impl DefaultInstantiator {
    /// 创建空的实例化器
    pub fn new() -> Self {
        Self::default()
    }

    /// 按实现类型名称登记构造函数
    pub fn register_constructor<F>(&self, class_name: impl Into<String>, constructor: F)
    where
        F: Fn(&ResolvedArguments) -> BeansResult<BeanInstance> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        debug!("登记构造函数: {}", class_name);
        self.constructors.insert(class_name, Arc::new(constructor));
    }

    /// 为 Rust 类型登记构造函数，类型名称取 `std::any::type_name::<T>()`
    pub fn register_type<T, F>(&self, constructor: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedArguments) -> BeansResult<T> + Send + Sync + 'static,
    {
        self.register_constructor(std::any::type_name::<T>(), move |args| {
            constructor(args).map(|bean| Arc::new(bean) as BeanInstance)
        });
    }

    /// 登记实现类型上的静态工厂方法
    pub fn register_static_factory<T, F>(
        &self,
        class_name: impl Into<String>,
        method: impl Into<String>,
        factory: F,
    ) where
        T: Any + Send + Sync,
        F: Fn(&ResolvedArguments) -> BeansResult<T> + Send + Sync + 'static,
    {
        let key = (class_name.into(), method.into());
        debug!("登记静态工厂方法: {}::{}", key.0, key.1);
        self.static_factories.insert(
            key,
            Arc::new(move |args: &ResolvedArguments| {
                factory(args).map(|bean| Arc::new(bean) as BeanInstance)
            }),
        );
    }

    /// 登记工厂 Bean 类型 `B` 上的实例工厂方法
    pub fn register_factory_method<B, T, F>(&self, method: impl Into<String>, factory: F)
    where
        B: Any + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(&B, &ResolvedArguments) -> BeansResult<T> + Send + Sync + 'static,
    {
        let method = method.into();
        debug!(
            "登记实例工厂方法: {}::{}",
            std::any::type_name::<B>(),
            method
        );
        self.instance_factories.insert(
            (TypeId::of::<B>(), method.clone()),
            Arc::new(move |factory_bean: &BeanInstance, args: &ResolvedArguments| {
                let factory_bean = factory_bean.downcast_ref::<B>().ok_or_else(|| {
                    BeansError::configuration(format!(
                        "工厂 Bean 不是 {} 类型",
                        std::any::type_name::<B>()
                    ))
                })?;
                factory(factory_bean, args).map(|bean| Arc::new(bean) as BeanInstance)
            }),
        );
    }

    /// 登记类型 `T` 的初始化方法
    pub fn register_init_method<T, F>(&self, method: impl Into<String>, init: F)
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> BeansResult<()> + Send + Sync + 'static,
    {
        self.register_lifecycle_method(method.into(), init);
    }

    /// 登记类型 `T` 的销毁方法
    pub fn register_destroy_method<T, F>(&self, method: impl Into<String>, destroy: F)
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> BeansResult<()> + Send + Sync + 'static,
    {
        self.register_lifecycle_method(method.into(), destroy);
    }

    fn register_lifecycle_method<T, F>(&self, method: String, callback: F)
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> BeansResult<()> + Send + Sync + 'static,
    {
        self.lifecycle_methods.insert(
            (TypeId::of::<T>(), method),
            Arc::new(move |instance: &BeanInstance| match instance.downcast_ref::<T>() {
                Some(bean) => callback(bean),
                None => Err(BeansError::configuration(format!(
                    "实例不是 {} 类型",
                    std::any::type_name::<T>()
                ))),
            }),
        );
    }

    /// 是否登记了实现类型
    pub fn has_constructor(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    fn invoke_lifecycle(
        &self,
        bean_name: &str,
        instance: &BeanInstance,
        method: &str,
        kind: &str,
    ) -> BeansResult<()> {
        let key = ((**instance).type_id(), method.to_string());
        let callback = self
            .lifecycle_methods
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                BeansError::configuration(format!(
                    "Bean '{bean_name}' 的{kind}方法 '{method}' 未登记"
                ))
            })?;
        callback(instance)
    }
}

impl Instantiator for DefaultInstantiator {
    fn instantiate(&self, request: &InstantiationRequest<'_>) -> BeansResult<BeanInstance> {
        let definition = request.definition;
        let bean_name = request.bean_name;

        if let Some(supplier) = &definition.instance_supplier {
            debug!("通过实例提供函数创建 Bean: {}", bean_name);
            return supplier.get();
        }

        if let Some(method) = definition.factory_method_name.as_deref() {
            if definition.factory_bean_name.is_some() {
                let factory_bean = request.factory_bean.as_ref().ok_or_else(|| {
                    BeansError::illegal_state(format!("Bean '{bean_name}' 的工厂 Bean 尚未解析"))
                })?;
                let key = ((**factory_bean).type_id(), method.to_string());
                let factory = self
                    .instance_factories
                    .get(&key)
                    .map(|entry| Arc::clone(entry.value()))
                    .ok_or_else(|| {
                        BeansError::configuration(format!(
                            "Bean '{bean_name}' 的工厂方法 '{method}' 未在工厂类型 {} 上登记",
                            request.factory_bean_type.as_deref().unwrap_or("<unknown>")
                        ))
                    })?;
                debug!("通过实例工厂方法创建 Bean: {} ({})", bean_name, method);
                return factory(factory_bean, &request.arguments);
            }

            let class_name = definition.bean_class_name.clone().unwrap_or_default();
            let key = (class_name, method.to_string());
            let factory = self
                .static_factories
                .get(&key)
                .map(|entry| Arc::clone(entry.value()))
                .ok_or_else(|| {
                    BeansError::configuration(format!(
                        "Bean '{bean_name}' 的静态工厂方法 {}::{} 未登记",
                        key.0, key.1
                    ))
                })?;
            debug!("通过静态工厂方法创建 Bean: {} ({})", bean_name, method);
            return factory(&request.arguments);
        }

        let class_name = definition.bean_class_name.as_deref().ok_or_else(|| {
            BeansError::configuration(format!("Bean '{bean_name}' 没有实现类型"))
        })?;
        let constructor = self
            .constructors
            .get(class_name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                BeansError::configuration(format!(
                    "Bean '{bean_name}' 的实现类型 {class_name} 没有登记构造函数"
                ))
            })?;
        debug!("通过构造函数创建 Bean: {} ({})", bean_name, class_name);
        constructor(&request.arguments)
    }

    fn invoke_init_method(
        &self,
        bean_name: &str,
        instance: &BeanInstance,
        method: &str,
    ) -> BeansResult<()> {
        self.invoke_lifecycle(bean_name, instance, method, "初始化")
    }

    fn invoke_destroy_method(
        &self,
        bean_name: &str,
        instance: &BeanInstance,
        method: &str,
    ) -> BeansResult<()> {
        self.invoke_lifecycle(bean_name, instance, method, "销毁")
    }
}
