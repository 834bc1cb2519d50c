//! 资源定位
//!
//! 位置可以带 `file:` 前缀，相对路径基于解析器的根目录。模式使用 glob 语法，
//! 例如 `config/**/*.toml`。

use infrastructure_common::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_PREFIX: &str = "file:";

/// 文件系统资源
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    path: PathBuf,
}

impl Resource {
    /// 由路径创建资源
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 资源路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 资源是否存在
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// 文件名
    pub fn filename(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// 用于日志和错误信息的描述
    pub fn description(&self) -> String {
        format!("file [{}]", self.path.display())
    }

    /// 读取全部内容
    pub async fn read_to_string(&self) -> ConfigResult<String> {
        if !self.exists() {
            return Err(ConfigError::FileNotFound {
                path: self.path.display().to_string(),
            });
        }
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

/// 按位置或模式查找资源
pub trait ResourcePatternResolver: Send + Sync {
    /// 按位置取得单个资源，不检查是否存在
    fn get_resource(&self, location: &str) -> Resource;

    /// 按模式查找所有存在的资源，结果按路径排序
    fn get_resources(&self, location_pattern: &str) -> ConfigResult<Vec<Resource>>;
}

/// 基于文件系统的资源解析器
#[derive(Debug, Clone)]
pub struct FileSystemResourceResolver {
    base_dir: PathBuf,
}

impl Default for FileSystemResourceResolver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileSystemResourceResolver {
    /// 以指定目录为根创建解析器
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 根目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn absolute(&self, location: &str) -> PathBuf {
        let location = location.strip_prefix(FILE_PREFIX).unwrap_or(location);
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ResourcePatternResolver for FileSystemResourceResolver {
    fn get_resource(&self, location: &str) -> Resource {
        Resource::new(self.absolute(location))
    }

    fn get_resources(&self, location_pattern: &str) -> ConfigResult<Vec<Resource>> {
        let pattern = self.absolute(location_pattern);
        let pattern = pattern.to_str().ok_or_else(|| ConfigError::ValidationError {
            message: format!("资源模式不是有效的 UTF-8: {}", pattern.display()),
        })?;

        let entries = glob::glob(pattern).map_err(|e| ConfigError::ValidationError {
            message: format!("资源模式无效 '{location_pattern}': {e}"),
        })?;

        let mut resources = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => resources.push(Resource::new(path)),
                Ok(_) => {}
                Err(e) => debug!("跳过无法访问的路径: {}", e),
            }
        }
        resources.sort();
        debug!("资源模式 {} 匹配到 {} 个文件", location_pattern, resources.len());
        Ok(resources)
    }
}
