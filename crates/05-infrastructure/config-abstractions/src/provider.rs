//! 配置提供者抽象接口

use async_trait::async_trait;
use infrastructure_common::{ConfigError, ConfigSection};
use serde_json::Value;
use std::path::Path;
use std::time::SystemTime;

/// 配置提供者 trait
///
/// 从单一数据源读取配置，键使用点号分隔的路径，例如 `datasource.url`。
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// 获取配置值，不存在时返回 [`ConfigError::KeyNotFound`]
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError>;

    /// 获取配置节
    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError>;

    /// 重新加载配置
    async fn reload(&mut self) -> Result<(), ConfigError>;

    /// 检查配置键是否存在
    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError>;

    /// 获取所有配置键
    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError>;

    /// 获取提供者名称
    fn name(&self) -> &str;

    /// 获取提供者优先级，数值大的优先
    fn priority(&self) -> i32 {
        0
    }
}

/// 文件配置提供者 trait
#[async_trait]
pub trait FileConfigProvider: ConfigProvider {
    /// 获取文件路径
    fn file_path(&self) -> &Path;

    /// 检查文件是否存在
    async fn file_exists(&self) -> bool;

    /// 获取文件最后修改时间
    async fn last_modified(&self) -> Result<SystemTime, ConfigError>;
}
