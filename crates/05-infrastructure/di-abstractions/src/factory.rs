//! Bean 工厂抽象接口
//!
//! 工厂按名称或类型把 Bean 定义解析为实例。实例化本身委托给 [`Instantiator`]，
//! 工厂只负责作用域、依赖顺序、循环检测与父工厂委托。

use crate::definition::BeanDefinition;
use crate::processor::BeanPostProcessor;
use crate::registry::BeanDefinitionRegistry;
use async_trait::async_trait;
use futures::future::BoxFuture;
use infrastructure_common::{
    downcast_bean, BeanInstance, BeansError, BeansResult, CapabilityRegistry, TypeInfo,
};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Bean 工厂 trait
#[async_trait]
pub trait BeanFactory: Send + Sync {
    /// 按名称或别名获取 Bean 实例
    async fn get_bean(&self, name: &str) -> BeansResult<BeanInstance>;

    /// 本工厂或祖先工厂是否能提供该名称
    fn contains_bean(&self, name: &str) -> bool;

    /// 是否为单例
    fn is_singleton(&self, name: &str) -> BeansResult<bool>;

    /// 是否为原型
    fn is_prototype(&self, name: &str) -> BeansResult<bool>;

    /// 获取 Bean 的产出类型名称，无法确定时返回 `None`
    fn get_type(&self, name: &str) -> BeansResult<Option<String>>;

    /// Bean 的产出类型是否与给定类型名称匹配
    fn is_type_match(&self, name: &str, type_name: &str) -> BeansResult<bool> {
        Ok(self
            .get_type(name)?
            .is_some_and(|actual| TypeInfo::from_name(&actual).matches(type_name)))
    }
}

/// 支持父工厂委托的 Bean 工厂
pub trait HierarchicalBeanFactory: BeanFactory {
    /// 父工厂
    fn parent_bean_factory(&self) -> Option<Arc<dyn AutowireCapableBeanFactory>>;

    /// 不访问父工厂时是否能提供该名称
    fn contains_local_bean(&self, name: &str) -> bool;
}

/// 可枚举全部 Bean 定义的工厂，只针对本地定义
#[async_trait]
pub trait ListableBeanFactory: BeanFactory {
    /// 全部 Bean 定义名称，按注册顺序
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// Bean 定义数量
    fn get_bean_definition_count(&self) -> usize;

    /// 产出类型匹配的 Bean 名称
    fn get_bean_names_for_type(&self, type_name: &str, include_non_singletons: bool)
        -> Vec<String>;

    /// 产出类型匹配的全部 Bean 实例，原型作用域的 Bean 每次都会新建
    async fn get_beans_of_type(&self, type_name: &str) -> BeansResult<Vec<(String, BeanInstance)>>;

    /// 与父定义合并后的 Bean 定义
    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>>;
}

/// 支持按类型自动装配的工厂
#[async_trait]
pub trait AutowireCapableBeanFactory: BeanFactory {
    /// 按类型解析唯一候选，返回 (名称, 实例)
    ///
    /// 多个候选时取唯一的 `primary`；没有或多于一个 `primary` 时返回依赖不唯一错误。
    /// 本地没有候选时委托父工厂。
    async fn resolve_dependency(&self, type_name: &str) -> BeansResult<(String, BeanInstance)>;
}

/// 可在刷新阶段调整的工厂：后处理器、手动单例与能力表
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 添加 Bean 后处理器，按 `order` 排序，同序保持添加顺序
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// Bean 后处理器数量
    fn bean_post_processor_count(&self) -> usize;

    /// 手动注册已经构造好的单例实例，名称已有单例时返回冲突错误
    fn register_singleton_instance(
        &self,
        name: &str,
        instance: BeanInstance,
        type_name: Option<String>,
    ) -> BeansResult<()>;

    /// 按具体类型登记的能力表
    fn capabilities(&self) -> Arc<CapabilityRegistry>;

    /// 手动注册单例，类型名称取自 `T`
    fn register_singleton<T: Any + Send + Sync>(&self, name: &str, instance: Arc<T>) -> BeansResult<()>
    where
        Self: Sized,
    {
        self.register_singleton_instance(name, instance, Some(std::any::type_name::<T>().to_string()))
    }
}

/// 既可枚举又可修改定义的工厂，供 [`crate::BeanFactoryPostProcessor`] 与
/// [`crate::ImportRegistrar`] 使用
pub trait ConfigurableListableBeanFactory:
    ListableBeanFactory + BeanDefinitionRegistry + ConfigurableBeanFactory
{
}

impl<T> ConfigurableListableBeanFactory for T where
    T: ListableBeanFactory + BeanDefinitionRegistry + ConfigurableBeanFactory + ?Sized
{
}

/// 解析后的参数值
#[derive(Debug, Clone)]
pub enum ResolvedValue {
    /// 字面量
    Value(serde_json::Value),
    /// Bean 实例
    Bean {
        /// 被引用 Bean 的名称
        name: String,
        /// 实例
        instance: BeanInstance,
    },
}

impl ResolvedValue {
    /// 作为 Bean 实例取出并转型
    pub fn as_bean<T: Any + Send + Sync>(&self) -> BeansResult<Arc<T>> {
        match self {
            Self::Bean { name, instance } => downcast_bean(name, Arc::clone(instance)),
            Self::Value(value) => Err(BeansError::configuration(format!(
                "期望 Bean 引用，实际为字面量 {value}"
            ))),
        }
    }

    /// 作为字面量取出并反序列化
    pub fn as_value<T: DeserializeOwned>(&self) -> BeansResult<T> {
        match self {
            Self::Value(value) => serde_json::from_value(value.clone()).map_err(|e| {
                BeansError::configuration(format!(
                    "字面量 {value} 无法转换为 {}: {e}",
                    std::any::type_name::<T>()
                ))
            }),
            Self::Bean { name, .. } => Err(BeansError::configuration(format!(
                "期望字面量，实际为 Bean 引用 '{name}'"
            ))),
        }
    }

    /// Bean 实例
    pub fn instance(&self) -> Option<&BeanInstance> {
        match self {
            Self::Bean { instance, .. } => Some(instance),
            Self::Value(_) => None,
        }
    }
}

/// 解析完成的构造参数与属性
#[derive(Debug, Clone, Default)]
pub struct ResolvedArguments {
    /// 所属 Bean 名称
    pub bean_name: String,
    /// 按位置的参数
    pub indexed: BTreeMap<usize, ResolvedValue>,
    /// 按名称的参数
    pub named: BTreeMap<String, ResolvedValue>,
    /// 属性值，按声明顺序
    pub properties: Vec<(String, ResolvedValue)>,
}

impl ResolvedArguments {
    /// 创建空参数
    pub fn new(bean_name: impl Into<String>) -> Self {
        Self {
            bean_name: bean_name.into(),
            ..Self::default()
        }
    }

    /// 位置参数
    pub fn get(&self, index: usize) -> BeansResult<&ResolvedValue> {
        self.indexed.get(&index).ok_or_else(|| {
            BeansError::configuration(format!("Bean '{}' 缺少第 {index} 个构造参数", self.bean_name))
        })
    }

    /// 命名参数
    pub fn named(&self, name: &str) -> BeansResult<&ResolvedValue> {
        self.named.get(name).ok_or_else(|| {
            BeansError::configuration(format!("Bean '{}' 缺少构造参数 '{name}'", self.bean_name))
        })
    }

    /// 属性值
    pub fn property(&self, name: &str) -> Option<&ResolvedValue> {
        self.properties
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, value)| value)
    }

    /// 位置参数中的 Bean
    pub fn bean<T: Any + Send + Sync>(&self, index: usize) -> BeansResult<Arc<T>> {
        self.get(index)?.as_bean()
    }

    /// 位置参数中的字面量
    pub fn value<T: DeserializeOwned>(&self, index: usize) -> BeansResult<T> {
        self.get(index)?.as_value()
    }

    /// 命名参数中的 Bean
    pub fn named_bean<T: Any + Send + Sync>(&self, name: &str) -> BeansResult<Arc<T>> {
        self.named(name)?.as_bean()
    }

    /// 命名参数中的字面量
    pub fn named_value<T: DeserializeOwned>(&self, name: &str) -> BeansResult<T> {
        self.named(name)?.as_value()
    }

    /// 属性中的字面量，未设置时返回 `None`
    pub fn property_value<T: DeserializeOwned>(&self, name: &str) -> BeansResult<Option<T>> {
        self.property(name).map(ResolvedValue::as_value).transpose()
    }

    /// 属性中的 Bean，未设置时返回 `None`
    pub fn property_bean<T: Any + Send + Sync>(&self, name: &str) -> BeansResult<Option<Arc<T>>> {
        self.property(name).map(ResolvedValue::as_bean).transpose()
    }

    /// 参数与属性总数
    pub fn len(&self) -> usize {
        self.indexed.len() + self.named.len() + self.properties.len()
    }

    /// 是否没有任何参数
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 实例化请求
#[derive(Debug)]
pub struct InstantiationRequest<'a> {
    /// Bean 名称
    pub bean_name: &'a str,
    /// 合并后的 Bean 定义
    pub definition: &'a BeanDefinition,
    /// 解析完成的参数
    pub arguments: ResolvedArguments,
    /// 工厂 Bean 实例（使用实例工厂方法时）
    pub factory_bean: Option<BeanInstance>,
    /// 工厂 Bean 的产出类型名称
    pub factory_bean_type: Option<String>,
}

/// 实例化能力
///
/// 把定义与解析好的参数变成实例，并调用生命周期方法。无法实例化时返回定义无效错误。
pub trait Instantiator: Send + Sync {
    /// 创建实例
    fn instantiate(&self, request: &InstantiationRequest<'_>) -> BeansResult<BeanInstance>;

    /// 调用初始化方法
    fn invoke_init_method(
        &self,
        bean_name: &str,
        instance: &BeanInstance,
        method: &str,
    ) -> BeansResult<()>;

    /// 调用销毁方法
    fn invoke_destroy_method(
        &self,
        bean_name: &str,
        instance: &BeanInstance,
        method: &str,
    ) -> BeansResult<()>;
}

/// 延迟创建实例的回调，由自定义作用域在需要时等待
pub type ObjectFactory<'a> = BoxFuture<'a, BeansResult<BeanInstance>>;

/// 自定义作用域
pub trait BeanScope: Send + Sync {
    /// 从作用域获取实例，不存在时通过 `object_factory` 创建
    fn get<'a>(
        &'a self,
        name: &'a str,
        object_factory: ObjectFactory<'a>,
    ) -> BoxFuture<'a, BeansResult<BeanInstance>>;

    /// 从作用域移除实例
    fn remove(&self, name: &str) -> Option<BeanInstance>;

    /// 会话标识
    fn conversation_id(&self) -> Option<String> {
        None
    }
}

/// 强类型获取 Bean 的扩展方法
pub trait BeanFactoryExt: BeanFactory {
    /// 按名称获取并转型
    fn get_bean_typed<'a, T>(&'a self, name: &'a str) -> BoxFuture<'a, BeansResult<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        Box::pin(async move {
            let instance = self.get_bean(name).await?;
            downcast_bean::<T>(name, instance).map_err(|err| match err {
                BeansError::BeanNotOfRequiredType {
                    bean_name,
                    required_type,
                    ..
                } => BeansError::BeanNotOfRequiredType {
                    bean_name,
                    required_type,
                    actual_type: self
                        .get_type(name)
                        .ok()
                        .flatten()
                        .unwrap_or_else(|| "<unknown>".to_string()),
                },
                other => other,
            })
        })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// 按类型获取 Bean 的扩展方法
pub trait AutowireCapableBeanFactoryExt: AutowireCapableBeanFactory {
    /// 按 Rust 类型解析唯一候选
    fn get_bean_of_type<'a, T>(&'a self) -> BoxFuture<'a, BeansResult<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        Box::pin(async move {
            let (name, instance) = self.resolve_dependency(std::any::type_name::<T>()).await?;
            downcast_bean(&name, instance)
        })
    }
}

impl<F: AutowireCapableBeanFactory + ?Sized> AutowireCapableBeanFactoryExt for F {}

/// 按类型枚举 Bean 的扩展方法
pub trait ListableBeanFactoryExt: ListableBeanFactory {
    /// 获取指定 Rust 类型的全部实例
    fn get_beans_of<'a, T>(&'a self) -> BoxFuture<'a, BeansResult<Vec<(String, Arc<T>)>>>
    where
        T: Any + Send + Sync,
    {
        Box::pin(async move {
            let beans = self.get_beans_of_type(std::any::type_name::<T>()).await?;
            beans
                .into_iter()
                .map(|(name, instance)| downcast_bean(&name, instance).map(|bean| (name, bean)))
                .collect()
        })
    }
}

impl<F: ListableBeanFactory + ?Sized> ListableBeanFactoryExt for F {}
