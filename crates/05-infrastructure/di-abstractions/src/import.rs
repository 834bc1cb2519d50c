//! 配置导入选择

use crate::factory::ConfigurableListableBeanFactory;
use infrastructure_common::BeansResult;
use std::collections::HashMap;

/// 导入方的元数据
#[derive(Debug, Clone, Default)]
pub struct ImportMetadata {
    /// 导入方类型名称
    pub importing_class: String,
    /// 注解或配置上的属性
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ImportMetadata {
    /// 创建元数据
    pub fn new(importing_class: impl Into<String>) -> Self {
        Self {
            importing_class: importing_class.into(),
            attributes: HashMap::new(),
        }
    }

    /// 添加属性
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 字符串属性
    pub fn string_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(serde_json::Value::as_str)
    }
}

/// 配置导入选择器
///
/// 根据导入方的属性决定要导入哪些配置标识，返回的顺序即导入顺序。
pub trait ImportSelector: Send + Sync {
    /// 选择要导入的配置标识，空列表表示不导入
    fn select_imports(&self, metadata: &ImportMetadata) -> BeansResult<Vec<String>>;
}

/// 按配置标识注册 Bean 定义
///
/// 导入选择器返回的每个标识对应一个注册器，由上下文的导入流程依次调用。
pub trait ImportRegistrar: Send + Sync {
    /// 向工厂写入该配置提供的 Bean 定义或基础设施实例
    fn register_bean_definitions(
        &self,
        metadata: &ImportMetadata,
        factory: &dyn ConfigurableListableBeanFactory,
    ) -> BeansResult<()>;
}
