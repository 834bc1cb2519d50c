//! 配置管理器抽象接口

use crate::provider::ConfigProvider;
use async_trait::async_trait;
use infrastructure_common::{ConfigError, ConfigSection};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 配置管理器 trait
///
/// 组合多个配置提供者，按优先级从高到低查找。
#[async_trait]
pub trait ConfigManager: Send + Sync {
    /// 注册配置提供者
    async fn register_provider(&mut self, provider: Box<dyn ConfigProvider>) -> Result<(), ConfigError>;

    /// 移除配置提供者
    async fn unregister_provider(&mut self, provider_name: &str) -> Result<(), ConfigError>;

    /// 获取配置值，取第一个包含该键的提供者
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError>;

    /// 获取配置节，高优先级提供者的同名键覆盖低优先级的
    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError>;

    /// 重新加载所有配置
    async fn reload_all(&mut self) -> Result<(), ConfigError>;

    /// 已注册的提供者名称，按优先级排列
    fn provider_names(&self) -> Vec<String>;
}

/// 类型化绑定扩展
#[async_trait]
pub trait ConfigManagerExt: ConfigManager {
    /// 把配置节绑定到具体类型
    async fn bind_section<T>(&self, section_name: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.get_section(section_name).await?.bind()
    }

    /// 读取配置值并反序列化，键不存在时返回 `None`
    async fn get_optional<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.get_configuration(key).await {
            Ok(value) => Ok(Some(serde_json::from_value(value)?)),
            Err(err) if err.is_key_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl<M: ConfigManager + ?Sized> ConfigManagerExt for M {}
