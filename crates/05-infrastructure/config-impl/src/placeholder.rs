//! 占位符解析
//!
//! [`PlaceholderConfigurer`] 作为 Bean 定义后处理器运行，把定义中的
//! `${key}` / `${key:default}` 替换为配置值。

use async_trait::async_trait;
use config_abstractions::ConfigManager;
use di_abstractions::{BeanDefinition, BeanFactoryPostProcessor, BeanValue, ConfigurableListableBeanFactory};
use futures::future::BoxFuture;
use infrastructure_common::{BeansError, BeansResult, ConfigError};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 占位符嵌套解析的最大轮数
const MAX_NESTING: usize = 16;

/// 占位符配置器
pub struct PlaceholderConfigurer {
    config: Arc<dyn ConfigManager>,
    pattern: Regex,
    ignore_unresolvable: bool,
    order: i32,
}

impl std::fmt::Debug for PlaceholderConfigurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceholderConfigurer")
            .field("pattern", &self.pattern.as_str())
            .field("ignore_unresolvable", &self.ignore_unresolvable)
            .field("order", &self.order)
            .finish()
    }
}

/// 一次替换中出现的占位符
struct Placeholder {
    text: String,
    key: String,
    default: Option<String>,
}

impl PlaceholderConfigurer {
    /// 创建占位符配置器
    pub fn new(config: Arc<dyn ConfigManager>) -> BeansResult<Self> {
        let pattern = Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").map_err(|e| {
            BeansError::configuration(format!("占位符表达式无效: {e}"))
        })?;
        Ok(Self {
            config,
            pattern,
            ignore_unresolvable: false,
            order: 0,
        })
    }

    /// 无法解析的占位符保留原样，而不是报错
    pub fn with_ignore_unresolvable(mut self, ignore: bool) -> Self {
        self.ignore_unresolvable = ignore;
        self
    }

    /// 设置执行顺序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 解析文本中的占位符
    ///
    /// 整个文本恰好是一个占位符时返回配置值本身（保留数字、布尔等类型），
    /// 否则返回替换后的字符串。
    pub async fn resolve(&self, text: &str) -> BeansResult<Value> {
        let mut current = text.to_string();
        for _ in 0..MAX_NESTING {
            if !self.pattern.is_match(&current) {
                return Ok(Value::String(current));
            }
            match self.substitute_once(&current).await? {
                Value::String(next) if next == current => return Ok(Value::String(next)),
                Value::String(next) => current = next,
                other => return Ok(other),
            }
        }
        Err(BeansError::configuration(format!(
            "占位符嵌套过深或存在循环: {text}"
        )))
    }

    /// 解析并转换为字符串
    pub async fn resolve_string(&self, text: &str) -> BeansResult<String> {
        Ok(match self.resolve(text).await? {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    async fn substitute_once(&self, text: &str) -> BeansResult<Value> {
        let placeholders: Vec<Placeholder> = self
            .pattern
            .captures_iter(text)
            .map(|caps| Placeholder {
                text: caps[0].to_string(),
                key: caps[1].trim().to_string(),
                default: caps.get(2).map(|m| m.as_str().to_string()),
            })
            .collect();

        if let [single] = placeholders.as_slice() {
            if single.text == text {
                return Ok(self
                    .lookup(single)
                    .await?
                    .unwrap_or_else(|| Value::String(text.to_string())));
            }
        }

        let mut values: HashMap<String, String> = HashMap::new();
        for placeholder in &placeholders {
            if values.contains_key(&placeholder.text) {
                continue;
            }
            if let Some(value) = self.lookup(placeholder).await? {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                values.insert(placeholder.text.clone(), value);
            }
        }

        let replaced = self.pattern.replace_all(text, |caps: &regex::Captures<'_>| {
            values
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(Value::String(replaced.into_owned()))
    }

    async fn lookup(&self, placeholder: &Placeholder) -> BeansResult<Option<Value>> {
        match self.config.get_configuration(&placeholder.key).await {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::KeyNotFound { .. }) => match &placeholder.default {
                Some(default) => Ok(Some(Value::String(default.clone()))),
                None if self.ignore_unresolvable => Ok(None),
                None => Err(BeansError::configuration(format!(
                    "无法解析占位符 '{}'",
                    placeholder.text
                ))),
            },
            Err(e) => Err(BeansError::configuration(format!(
                "读取占位符 '{}' 的配置失败: {e}",
                placeholder.text
            ))),
        }
    }

    async fn resolve_field(&self, field: &mut String) -> BeansResult<bool> {
        if !self.pattern.is_match(field) {
            return Ok(false);
        }
        let resolved = self.resolve_string(field).await?;
        let changed = resolved != *field;
        *field = resolved;
        Ok(changed)
    }

    fn resolve_json<'a>(&'a self, value: &'a mut Value) -> BoxFuture<'a, BeansResult<bool>> {
        Box::pin(async move {
            match value {
                Value::String(text) if self.pattern.is_match(text) => {
                    let resolved = self.resolve(text).await?;
                    let changed = resolved != Value::String(text.clone());
                    *value = resolved;
                    Ok(changed)
                }
                Value::Array(items) => {
                    let mut changed = false;
                    for item in items {
                        changed |= self.resolve_json(item).await?;
                    }
                    Ok(changed)
                }
                Value::Object(object) => {
                    let mut changed = false;
                    for item in object.values_mut() {
                        changed |= self.resolve_json(item).await?;
                    }
                    Ok(changed)
                }
                _ => Ok(false),
            }
        })
    }

    async fn resolve_value(&self, value: &mut BeanValue) -> BeansResult<bool> {
        match value {
            BeanValue::Literal(literal) => self.resolve_json(literal).await,
            BeanValue::Reference(name) | BeanValue::Autowired(name) => {
                self.resolve_field(name).await
            }
        }
    }

    /// 解析一个定义中的全部占位符，返回是否有变化
    pub async fn process_definition(&self, definition: &mut BeanDefinition) -> BeansResult<bool> {
        let mut changed = false;

        for field in [
            &mut definition.parent_name,
            &mut definition.bean_class_name,
            &mut definition.target_type,
            &mut definition.factory_bean_name,
            &mut definition.factory_method_name,
            &mut definition.init_method_name,
            &mut definition.destroy_method_name,
            &mut definition.description,
        ]
        .into_iter()
        .flatten()
        {
            changed |= self.resolve_field(field).await?;
        }

        for dependency in &mut definition.depends_on {
            changed |= self.resolve_field(dependency).await?;
        }
        for value in definition.constructor_arguments.indexed.values_mut() {
            changed |= self.resolve_value(value).await?;
        }
        for value in definition.constructor_arguments.named.values_mut() {
            changed |= self.resolve_value(value).await?;
        }
        for property in definition.property_values.iter_mut() {
            changed |= self.resolve_value(&mut property.value).await?;
        }

        Ok(changed)
    }
}

#[async_trait]
impl BeanFactoryPostProcessor for PlaceholderConfigurer {
    async fn post_process_bean_factory(
        &self,
        factory: &dyn ConfigurableListableBeanFactory,
    ) -> BeansResult<()> {
        let mut resolved = 0;
        for name in factory.get_bean_definition_names() {
            let mut definition = factory.get_bean_definition(&name)?.as_ref().clone();
            if self.process_definition(&mut definition).await? {
                debug!("已解析 Bean 定义中的占位符: {}", name);
                factory.replace_bean_definition(&name, definition)?;
                resolved += 1;
            }
        }
        info!("占位符解析完成，更新了 {} 个 Bean 定义", resolved);
        Ok(())
    }

    fn order(&self) -> i32 {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::LayeredConfigManager;
    use crate::providers::MapConfigProvider;
    use di_abstractions::{BeanDefinitionRegistry, ListableBeanFactory};
    use di_impl::DefaultListableBeanFactory;
    use serde_json::json;

    async fn configurer() -> PlaceholderConfigurer {
        let mut manager = LayeredConfigManager::new();
        manager
            .register_provider(Box::new(
                MapConfigProvider::new("test")
                    .with_value("datasource.host", "db.internal")
                    .with_value("datasource.port", 5432)
                    .with_value("datasource.url", "postgres://${datasource.host}:${datasource.port}")
                    .with_value("impl", "app::PostgresDataSource"),
            ))
            .await
            .unwrap();
        PlaceholderConfigurer::new(Arc::new(manager)).unwrap()
    }

    #[tokio::test]
    async fn resolves_nested_placeholders_and_defaults() {
        let configurer = configurer().await;
        assert_eq!(
            configurer.resolve_string("${datasource.url}/orders").await.unwrap(),
            "postgres://db.internal:5432/orders"
        );
        assert_eq!(
            configurer.resolve("${datasource.port}").await.unwrap(),
            json!(5432)
        );
        assert_eq!(
            configurer.resolve_string("${pool.size:10}").await.unwrap(),
            "10"
        );
        assert_eq!(
            configurer.resolve_string("plain text").await.unwrap(),
            "plain text"
        );
    }

    #[tokio::test]
    async fn unresolvable_placeholder_is_configuration_error() {
        let configurer = configurer().await;
        let err = configurer.resolve("${missing.key}").await.unwrap_err();
        assert!(matches!(err, BeansError::Configuration { .. }));

        let lenient = configurer.with_ignore_unresolvable(true);
        assert_eq!(
            lenient.resolve_string("x-${missing.key}").await.unwrap(),
            "x-${missing.key}"
        );
    }

    #[tokio::test]
    async fn rewrites_definitions_in_place() {
        let configurer = configurer().await;
        let factory = DefaultListableBeanFactory::default();
        factory
            .register_bean_definition("first", BeanDefinition::new("app::Plain"))
            .unwrap();
        factory
            .register_bean_definition(
                "dataSource",
                BeanDefinition::new("${impl}")
                    .with_constructor_arg(0, BeanValue::literal("${datasource.url}"))
                    .with_named_arg("port", BeanValue::literal("${datasource.port}"))
                    .with_property("options", BeanValue::literal(json!({"ssl": "${ssl:false}"}))),
            )
            .unwrap();

        configurer.post_process_bean_factory(&factory).await.unwrap();

        let definition = factory.get_bean_definition("dataSource").unwrap();
        assert_eq!(
            definition.bean_class_name.as_deref(),
            Some("app::PostgresDataSource")
        );
        assert_eq!(
            definition.constructor_arguments.indexed.get(&0),
            Some(&BeanValue::literal("postgres://db.internal:5432"))
        );
        assert_eq!(
            definition.constructor_arguments.named.get("port"),
            Some(&BeanValue::literal(5432))
        );
        assert_eq!(
            definition.property_values.get("options"),
            Some(&BeanValue::literal(json!({"ssl": "false"})))
        );
        assert_eq!(factory.get_bean_definition_names(), vec!["first", "dataSource"]);
    }
}
