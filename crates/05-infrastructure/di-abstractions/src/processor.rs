//! 后处理扩展点

use crate::definition::BeanDefinition;
use crate::factory::ConfigurableListableBeanFactory;
use async_trait::async_trait;
use infrastructure_common::{BeanInstance, BeansResult};

/// Bean 实例后处理器
///
/// 在初始化方法前后各调用一次，可以返回替换后的实例（例如代理包装）。
pub trait BeanPostProcessor: Send + Sync {
    /// 初始化方法之前调用
    fn post_process_before_initialization(
        &self,
        bean: BeanInstance,
        _bean_name: &str,
        _definition: &BeanDefinition,
    ) -> BeansResult<BeanInstance> {
        Ok(bean)
    }

    /// 初始化方法之后调用
    fn post_process_after_initialization(
        &self,
        bean: BeanInstance,
        _bean_name: &str,
        _definition: &BeanDefinition,
    ) -> BeansResult<BeanInstance> {
        Ok(bean)
    }

    /// 执行顺序，数值小的先执行
    fn order(&self) -> i32 {
        0
    }

    /// 处理器名称，用于日志
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Bean 定义后处理器
///
/// 在上下文刷新阶段、任何单例实例化之前执行，可以修改或新增 Bean 定义。
#[async_trait]
pub trait BeanFactoryPostProcessor: Send + Sync {
    /// 处理工厂中的 Bean 定义
    async fn post_process_bean_factory(
        &self,
        factory: &dyn ConfigurableListableBeanFactory,
    ) -> BeansResult<()>;

    /// 执行顺序，数值小的先执行
    fn order(&self) -> i32 {
        0
    }
}
