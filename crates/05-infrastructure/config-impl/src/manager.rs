//! 配置管理器实现

use async_trait::async_trait;
use config_abstractions::{ConfigManager, ConfigProvider};
use infrastructure_common::{ConfigError, ConfigSection};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 分层配置管理器
///
/// 协调多个配置源，按优先级从高到低查找，并缓存已读取的配置值。
pub struct LayeredConfigManager {
    /// 配置提供者列表（按优先级排序）
    providers: Vec<Box<dyn ConfigProvider>>,
    /// 缓存的配置值
    config_cache: RwLock<HashMap<String, Value>>,
    /// 是否启用缓存
    cache_enabled: bool,
}

impl std::fmt::Debug for LayeredConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredConfigManager")
            .field("providers", &self.provider_names())
            .field("cache_enabled", &self.cache_enabled)
            .finish()
    }
}

impl LayeredConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config_cache: RwLock::new(HashMap::new()),
            cache_enabled: true,
        }
    }

    /// 设置是否启用缓存
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
    }

    /// 清除配置缓存
    pub async fn clear_cache(&self) {
        self.config_cache.write().await.clear();
        debug!("配置缓存已清除");
    }

    /// 获取配置提供者数量
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

impl Default for LayeredConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigManager for LayeredConfigManager {
    async fn register_provider(
        &mut self,
        provider: Box<dyn ConfigProvider>,
    ) -> Result<(), ConfigError> {
        info!(
            "注册配置提供者: {} (优先级 {})",
            provider.name(),
            provider.priority()
        );

        self.providers.push(provider);

        // 按优先级排序（优先级高的在前），同优先级保持注册顺序
        self.providers
            .sort_by_key(|p| std::cmp::Reverse(p.priority()));

        self.clear_cache().await;
        Ok(())
    }

    async fn unregister_provider(&mut self, provider_name: &str) -> Result<(), ConfigError> {
        let initial_count = self.providers.len();
        self.providers.retain(|p| p.name() != provider_name);

        if self.providers.len() < initial_count {
            info!("移除配置提供者: {}", provider_name);
            self.clear_cache().await;
            Ok(())
        } else {
            warn!("配置提供者不存在: {}", provider_name);
            Err(ConfigError::KeyNotFound {
                key: provider_name.to_string(),
            })
        }
    }

    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        if self.cache_enabled {
            if let Some(value) = self.config_cache.read().await.get(key) {
                debug!("从缓存获取配置: {}", key);
                return Ok(value.clone());
            }
        }

        for provider in &self.providers {
            match provider.get_configuration(key).await {
                Ok(value) => {
                    debug!("从提供者 {} 获取配置: {}", provider.name(), key);
                    if self.cache_enabled {
                        self.config_cache
                            .write()
                            .await
                            .insert(key.to_string(), value.clone());
                    }
                    return Ok(value);
                }
                Err(ConfigError::KeyNotFound { .. }) => continue,
                Err(e) => {
                    error!("提供者 {} 获取配置失败: {}", provider.name(), e);
                    return Err(e);
                }
            }
        }

        Err(ConfigError::KeyNotFound {
            key: key.to_string(),
        })
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        debug!("获取配置节: {}", section_name);

        let mut combined_section = ConfigSection::new();
        let mut found = false;

        for provider in &self.providers {
            match provider.get_section(section_name).await {
                Ok(section) => {
                    found = true;
                    // 后面的提供者优先级更低，不覆盖已有配置
                    for (key, value) in section.data {
                        combined_section.data.entry(key).or_insert(value);
                    }
                }
                Err(ConfigError::KeyNotFound { .. }) => continue,
                Err(e) => {
                    warn!("提供者 {} 获取配置节失败: {}", provider.name(), e);
                    return Err(e);
                }
            }
        }

        if found {
            Ok(combined_section)
        } else {
            Err(ConfigError::KeyNotFound {
                key: section_name.to_string(),
            })
        }
    }

    async fn reload_all(&mut self) -> Result<(), ConfigError> {
        info!("重新加载所有配置");

        let mut failed = Vec::new();
        for provider in &mut self.providers {
            if let Err(e) = provider.reload().await {
                error!("提供者 {} 重载失败: {}", provider.name(), e);
                failed.push(provider.name().to_string());
            }
        }

        self.clear_cache().await;

        if failed.is_empty() {
            info!("所有配置提供者重载成功");
            Ok(())
        } else {
            Err(ConfigError::ReloadError {
                message: format!("{} 个提供者重载失败: {}", failed.len(), failed.join(", ")),
            })
        }
    }

    fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}
