//! 配置节定义

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 配置节
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    /// 配置数据
    pub data: HashMap<String, serde_json::Value>,
}

impl ConfigSection {
    /// 创建新的配置节
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象创建配置节
    pub fn from_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: object.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// 插入配置项
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// 获取配置项
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 绑定到具体类型
    pub fn bind<T>(&self) -> Result<T, ConfigError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = serde_json::Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        serde_json::from_value(value).map_err(|e| ConfigError::SerializationError { source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct PoolSettings {
        size: u32,
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn bind_section_to_struct() {
        let mut section = ConfigSection::new();
        section.insert("size", json!(8));
        let settings: PoolSettings = section.bind().unwrap();
        assert_eq!(settings, PoolSettings { size: 8, name: None });
    }

    #[test]
    fn bind_reports_type_mismatch() {
        let mut section = ConfigSection::new();
        section.insert("size", json!("eight"));
        assert!(section.bind::<PoolSettings>().is_err());
    }
}
