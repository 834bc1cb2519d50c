//! Bean 实例与能力标记
//!
//! 用显式的能力标记替代空的标记接口。能力既可以声明在 Bean 定义上，
//! 也可以按实例的具体类型登记，运行时通过 [`CapabilityRegistry`] 查询。

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// 容器中的 Bean 实例
pub type BeanInstance = Arc<dyn Any + Send + Sync>;

/// Bean 能力标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeanCapability {
    /// AOP 基础设施 Bean，自动代理创建器永远不会包装它
    AopInfrastructure,
    /// 可以报告回滚状态并刷新底层会话的事务对象
    SmartTransactionObject,
}

/// 按具体类型登记的能力表
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    by_type: DashMap<TypeId, Vec<BeanCapability>>,
}

impl CapabilityRegistry {
    /// 创建空的能力表
    pub fn new() -> Self {
        Self::default()
    }

    /// 为类型 `T` 声明能力
    pub fn declare<T: Any>(&self, capability: BeanCapability) {
        let mut entry = self.by_type.entry(TypeId::of::<T>()).or_default();
        if !entry.contains(&capability) {
            entry.push(capability);
        }
    }

    /// 查询某个实例是否具备能力
    pub fn instance_has(&self, instance: &BeanInstance, capability: BeanCapability) -> bool {
        let type_id = (**instance).type_id();
        self.by_type
            .get(&type_id)
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// 查询类型 `T` 是否具备能力
    pub fn type_has<T: Any>(&self, capability: BeanCapability) -> bool {
        self.by_type
            .get(&TypeId::of::<T>())
            .is_some_and(|caps| caps.contains(&capability))
    }
}

/// 将实例向下转型为具体类型
pub fn downcast_bean<T: Any + Send + Sync>(
    bean_name: &str,
    instance: BeanInstance,
) -> Result<Arc<T>, crate::errors::BeansError> {
    instance
        .downcast::<T>()
        .map_err(|_| crate::errors::BeansError::BeanNotOfRequiredType {
            bean_name: bean_name.to_string(),
            required_type: std::any::type_name::<T>().to_string(),
            actual_type: "<unknown>".to_string(),
        })
}
