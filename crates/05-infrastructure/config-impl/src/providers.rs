//! 配置提供者实现
//!
//! 各提供者把数据源统一转换成 JSON 文档，再按点号路径查找。

use async_trait::async_trait;
use config_abstractions::{ConfigProvider, FileConfigProvider};
use infrastructure_common::{ConfigError, ConfigSection};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// 按点号路径组织的配置文档
#[derive(Debug, Clone, Default)]
struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            other => Err(ConfigError::TypeConversionError {
                message: format!("配置根节点必须是对象，实际为 {other}"),
            }),
        }
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// 按路径写入，中间节点不是对象时被替换
    fn insert(&mut self, path: &str, value: Value) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };
        let mut current = &mut self.root;
        for part in parts {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            current = next;
        }
        current.insert(last.to_string(), value);
    }

    fn get(&self, key: &str) -> Result<Value, ConfigError> {
        self.lookup(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: key.to_string(),
            })
    }

    fn section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        match self.lookup(section_name) {
            Some(Value::Object(object)) => Ok(ConfigSection::from_object(object)),
            Some(_) => Err(ConfigError::TypeConversionError {
                message: format!("配置节 {section_name} 不是对象类型"),
            }),
            None => Err(ConfigError::KeyNotFound {
                key: section_name.to_string(),
            }),
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.root, "", &mut keys);
        keys
    }
}

fn collect_keys(object: &Map<String, Value>, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in object {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Value::Object(nested) = value {
            collect_keys(nested, &full_key, keys);
        }
        keys.push(full_key);
    }
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => {
            serde_json::Number::from_f64(f).map_or_else(|| Value::String(f.to_string()), Value::Number)
        }
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

/// 环境变量值按布尔、整数、浮点数、字符串的顺序解析
fn parse_env_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

/// 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

/// 文件配置源的共享加载逻辑
#[derive(Debug)]
struct FileSource {
    file_path: PathBuf,
    format: FileFormat,
    document: ConfigDocument,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    fn open(path: &Path, format: FileFormat) -> Result<Self, ConfigError> {
        let mut source = Self {
            file_path: path.to_path_buf(),
            format,
            document: ConfigDocument::default(),
            last_modified: None,
        };
        source.load()?;
        Ok(source)
    }

    fn load(&mut self) -> Result<(), ConfigError> {
        debug!("加载配置文件: {}", self.file_path.display());
        if !self.file_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: self.file_path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(&self.file_path)?;
        let value = match self.format {
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(&content).map_err(|e| {
                    ConfigError::ParseError {
                        source: Box::new(e),
                    }
                })?;
                toml_to_json(toml::Value::Table(table))
            }
            FileFormat::Json => serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?,
        };

        self.document = ConfigDocument::from_value(value)?;
        self.last_modified = Some(std::fs::metadata(&self.file_path)?.modified()?);
        debug!("配置文件加载完成，共 {} 个键", self.document.keys().len());
        Ok(())
    }

    fn last_modified(&self) -> Result<SystemTime, ConfigError> {
        self.last_modified.ok_or_else(|| ConfigError::ValidationError {
            message: "文件尚未加载".to_string(),
        })
    }
}

macro_rules! file_provider {
    ($(#[$meta:meta])* $name:ident, $format:expr, $default_priority:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            source: FileSource,
            priority: i32,
        }

        impl $name {
            /// 打开并加载配置文件
            pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
                Ok(Self {
                    source: FileSource::open(path.as_ref(), $format)?,
                    priority: $default_priority,
                })
            }

            /// 设置优先级
            pub fn with_priority(mut self, priority: i32) -> Self {
                self.priority = priority;
                self
            }
        }

        #[async_trait]
        impl ConfigProvider for $name {
            async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
                self.source.document.get(key)
            }

            async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
                self.source.document.section(section_name)
            }

            async fn reload(&mut self) -> Result<(), ConfigError> {
                self.source.load()
            }

            async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
                Ok(self.source.document.lookup(key).is_some())
            }

            async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
                Ok(self.source.document.keys())
            }

            fn name(&self) -> &str {
                stringify!($name)
            }

            fn priority(&self) -> i32 {
                self.priority
            }
        }

        #[async_trait]
        impl FileConfigProvider for $name {
            fn file_path(&self) -> &Path {
                &self.source.file_path
            }

            async fn file_exists(&self) -> bool {
                self.source.file_path.exists()
            }

            async fn last_modified(&self) -> Result<SystemTime, ConfigError> {
                self.source.last_modified()
            }
        }
    };
}

file_provider!(
    /// TOML 配置提供者，默认优先级 100
    TomlConfigProvider,
    FileFormat::Toml,
    100
);

file_provider!(
    /// JSON 配置提供者，默认优先级 90
    JsonConfigProvider,
    FileFormat::Json,
    90
);

/// 环境变量配置提供者
///
/// `APP_DATASOURCE_URL` 在前缀 `APP`、分隔符 `_` 下对应键 `datasource.url`。
#[derive(Debug)]
pub struct EnvironmentConfigProvider {
    prefix: String,
    separator: String,
    priority: i32,
    document: ConfigDocument,
    /// 显式给定的变量，`None` 表示读取进程环境
    fixed_vars: Option<Vec<(String, String)>>,
}

impl EnvironmentConfigProvider {
    /// 读取进程环境中带前缀的变量，默认优先级 200
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut provider = Self {
            prefix: prefix.into(),
            separator: "_".to_string(),
            priority: 200,
            document: ConfigDocument::default(),
            fixed_vars: None,
        };
        provider.load_env_vars();
        provider
    }

    /// 使用给定的变量集合代替进程环境
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut provider = Self {
            prefix: prefix.into(),
            separator: "_".to_string(),
            priority: 200,
            document: ConfigDocument::default(),
            fixed_vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        };
        provider.load_env_vars();
        provider
    }

    /// 设置分隔符
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self.load_env_vars();
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 环境变量前缀
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn load_env_vars(&mut self) {
        debug!("加载环境变量，前缀: {}", self.prefix);
        let vars: Vec<(String, String)> = match &self.fixed_vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };

        let mut document = ConfigDocument::default();
        let mut count = 0;
        for (key, value) in vars {
            if let Some(config_key) = self.env_key_to_config_key(&key) {
                document.insert(&config_key, parse_env_value(&value));
                count += 1;
            }
        }
        self.document = document;
        debug!("加载了 {} 个环境变量", count);
    }

    /// 将环境变量键转换为配置键，不带前缀时返回 `None`
    fn env_key_to_config_key(&self, env_key: &str) -> Option<String> {
        let rest = env_key.strip_prefix(self.prefix.as_str())?;
        let rest = rest.strip_prefix(self.separator.as_str()).unwrap_or(rest);
        if rest.is_empty() {
            return None;
        }
        Some(rest.replace(self.separator.as_str(), ".").to_lowercase())
    }
}

#[async_trait]
impl ConfigProvider for EnvironmentConfigProvider {
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        self.document.get(key)
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        self.document.section(section_name)
    }

    async fn reload(&mut self) -> Result<(), ConfigError> {
        self.load_env_vars();
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.document.lookup(key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.document.keys())
    }

    fn name(&self) -> &str {
        "EnvironmentConfigProvider"
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置提供者，用于默认值和测试
#[derive(Debug, Clone)]
pub struct MapConfigProvider {
    name: String,
    priority: i32,
    document: ConfigDocument,
}

impl MapConfigProvider {
    /// 创建空的内存提供者，默认优先级 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            document: ConfigDocument::default(),
        }
    }

    /// 从 JSON 对象创建
    pub fn from_json(name: impl Into<String>, value: Value) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            priority: 0,
            document: ConfigDocument::from_value(value)?,
        })
    }

    /// 按点号路径写入配置值
    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.document.insert(key, value.into());
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl ConfigProvider for MapConfigProvider {
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        self.document.get(key)
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        self.document.section(section_name)
    }

    async fn reload(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.document.lookup(key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.document.keys())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
