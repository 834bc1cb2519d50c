//! 从配置读取 Bean 定义
//!
//! 配置节中每个键是 Bean 名称，值是序列化的 [`BeanDefinition`]，另外可以带一个
//! `aliases` 数组：
//!
//! ```toml
//! [beans.dataSource]
//! bean_class_name = "app::PostgresDataSource"
//! aliases = ["ds"]
//! constructor_arguments.indexed.0 = { literal = "${datasource.url}" }
//! ```

use async_trait::async_trait;
use config_abstractions::ConfigManager;
use di_abstractions::{BeanDefinition, BeanDefinitionReader, BeanDefinitionRegistry};
use infrastructure_common::{BeansError, BeansResult, ConfigError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// 默认读取的配置节
pub const DEFAULT_BEANS_SECTION: &str = "beans";

/// 配置驱动的 Bean 定义读取器
pub struct ConfigBeanDefinitionReader {
    config: Arc<dyn ConfigManager>,
    section: String,
}

impl std::fmt::Debug for ConfigBeanDefinitionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBeanDefinitionReader")
            .field("section", &self.section)
            .finish()
    }
}

impl ConfigBeanDefinitionReader {
    /// 读取默认的 `beans` 配置节
    pub fn new(config: Arc<dyn ConfigManager>) -> Self {
        Self {
            config,
            section: DEFAULT_BEANS_SECTION.to_string(),
        }
    }

    /// 指定配置节
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    fn parse_entry(
        &self,
        name: &str,
        mut entry: Value,
    ) -> BeansResult<(BeanDefinition, Vec<String>)> {
        let aliases = match entry.as_object_mut().and_then(|object| object.remove("aliases")) {
            Some(value) => serde_json::from_value::<Vec<String>>(value).map_err(|e| {
                BeansError::configuration(format!("Bean '{name}' 的 aliases 无效: {e}"))
            })?,
            None => Vec::new(),
        };
        let definition: BeanDefinition = serde_json::from_value(entry).map_err(|e| {
            BeansError::configuration(format!("Bean '{name}' 的定义无效: {e}"))
        })?;
        Ok((
            definition.with_resource_description(self.description()),
            aliases,
        ))
    }
}

#[async_trait]
impl BeanDefinitionReader for ConfigBeanDefinitionReader {
    async fn load_bean_definitions(
        &self,
        registry: &dyn BeanDefinitionRegistry,
    ) -> BeansResult<usize> {
        let beans = match self.config.get_configuration(&self.section).await {
            Ok(Value::Object(beans)) => beans,
            Ok(other) => {
                return Err(BeansError::configuration(format!(
                    "配置节 '{}' 必须是对象，实际为 {other}",
                    self.section
                )))
            }
            Err(ConfigError::KeyNotFound { .. }) => {
                debug!("配置中没有 '{}' 节，跳过", self.section);
                return Ok(0);
            }
            Err(e) => {
                return Err(BeansError::configuration(format!(
                    "读取配置节 '{}' 失败: {e}",
                    self.section
                )))
            }
        };

        let mut count = 0;
        for (name, entry) in beans {
            let (definition, aliases) = self.parse_entry(&name, entry)?;
            registry.register_bean_definition(&name, definition)?;
            for alias in aliases {
                registry.register_alias(&name, &alias)?;
            }
            count += 1;
        }

        info!("从 {} 读取了 {} 个 Bean 定义", self.description(), count);
        Ok(count)
    }

    fn description(&self) -> String {
        format!("config section [{}]", self.section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::LayeredConfigManager;
    use crate::providers::{MapConfigProvider, TomlConfigProvider};
    use di_abstractions::{AliasRegistry, BeanValue, Scope};
    use di_impl::DefaultListableBeanFactory;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn loads_definitions_and_aliases_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[beans.dataSource]
bean_class_name = "app::PostgresDataSource"
aliases = ["ds", "primaryDs"]
primary = true
constructor_arguments.indexed.0 = {{ literal = "postgres://localhost" }}

[beans.orderRepository]
bean_class_name = "app::OrderRepository"
scope = "prototype"
depends_on = ["dataSource"]
property_values = [{{ name = "dataSource", value = {{ reference = "ds" }} }}]
"#
        )
        .unwrap();

        let mut manager = LayeredConfigManager::new();
        manager
            .register_provider(Box::new(TomlConfigProvider::new(file.path()).unwrap()))
            .await
            .unwrap();
        let reader = ConfigBeanDefinitionReader::new(Arc::new(manager));
        let factory = DefaultListableBeanFactory::default();

        assert_eq!(reader.load_bean_definitions(&factory).await.unwrap(), 2);

        let data_source = factory.get_bean_definition("ds").unwrap();
        assert!(data_source.primary);
        assert_eq!(
            data_source.constructor_arguments.indexed.get(&0),
            Some(&BeanValue::literal("postgres://localhost"))
        );
        assert_eq!(
            data_source.resource_description.as_deref(),
            Some("config section [beans]")
        );
        assert_eq!(factory.canonical_name("primaryDs"), "dataSource");

        let repository = factory.get_bean_definition("orderRepository").unwrap();
        assert_eq!(repository.scope(), Scope::Prototype);
        assert_eq!(repository.depends_on, vec!["dataSource"]);
        assert_eq!(
            repository.property_values.get("dataSource"),
            Some(&BeanValue::reference("ds"))
        );
    }

    #[tokio::test]
    async fn missing_section_loads_nothing() {
        let reader = ConfigBeanDefinitionReader::new(Arc::new(LayeredConfigManager::new()));
        let factory = DefaultListableBeanFactory::default();
        assert_eq!(reader.load_bean_definitions(&factory).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_definition_is_configuration_error() {
        let mut manager = LayeredConfigManager::new();
        manager
            .register_provider(Box::new(
                MapConfigProvider::new("test").with_value("beans.broken", json!({"primary": "yes"})),
            ))
            .await
            .unwrap();
        let reader = ConfigBeanDefinitionReader::new(Arc::new(manager));
        let err = reader
            .load_bean_definitions(&DefaultListableBeanFactory::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BeansError::Configuration { .. }));
    }
}
