//! Bean 定义来源抽象接口
//!
//! 解析配置、注解或其他来源，把 Bean 定义写入注册表。

use crate::registry::BeanDefinitionRegistry;
use async_trait::async_trait;
use infrastructure_common::BeansResult;

/// Bean 定义读取器 trait
#[async_trait]
pub trait BeanDefinitionReader: Send + Sync {
    /// 读取并注册 Bean 定义，返回注册数量
    async fn load_bean_definitions(&self, registry: &dyn BeanDefinitionRegistry)
        -> BeansResult<usize>;

    /// 来源描述，写入每个定义的 `resource_description`
    fn description(&self) -> String;
}
