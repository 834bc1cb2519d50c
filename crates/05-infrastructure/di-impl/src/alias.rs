//! 别名注册表实现

use di_abstractions::AliasRegistry;
use infrastructure_common::{BeansError, BeansResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct AliasTable {
    /// 别名 -> 规范名称
    alias_map: HashMap<String, String>,
    /// 别名注册顺序
    order: Vec<String>,
}

/// 基于哈希表的别名注册表
///
/// 只支持单跳别名：别名的目标不能是另一个别名，已作为目标的名称也不能再注册为别名。
#[derive(Debug, Default)]
pub struct SimpleAliasRegistry {
    table: RwLock<AliasTable>,
    allow_overriding: bool,
}

impl SimpleAliasRegistry {
    /// 创建别名注册表
    pub fn new(allow_overriding: bool) -> Self {
        Self {
            table: RwLock::new(AliasTable::default()),
            allow_overriding,
        }
    }

    /// 别名数量
    pub fn len(&self) -> usize {
        self.table.read().alias_map.len()
    }

    /// 是否没有别名
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AliasRegistry for SimpleAliasRegistry {
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        if name.is_empty() || alias.is_empty() {
            return Err(BeansError::configuration("名称和别名都不能为空"));
        }
        if name == alias {
            debug!("忽略指向自身的别名: {}", alias);
            return Ok(());
        }

        let mut table = self.table.write();

        if let Some(existing) = table.alias_map.get(alias) {
            if existing == name {
                return Ok(());
            }
            if !self.allow_overriding {
                return Err(BeansError::conflict(
                    alias,
                    format!("别名已指向 '{existing}'，不能重新指向 '{name}'"),
                ));
            }
            warn!("别名 '{}' 由 '{}' 改为指向 '{}'", alias, existing, name);
        }

        if table.alias_map.contains_key(name) {
            return Err(BeansError::configuration(format!(
                "不支持别名链: '{name}' 本身是别名，不能作为 '{alias}' 的目标"
            )));
        }
        if table.alias_map.values().any(|target| target == alias) {
            return Err(BeansError::configuration(format!(
                "不支持别名链: '{alias}' 已是其他别名的目标"
            )));
        }

        if table
            .alias_map
            .insert(alias.to_string(), name.to_string())
            .is_none()
        {
            table.order.push(alias.to_string());
        }
        info!("注册别名: {} -> {}", alias, name);
        Ok(())
    }

    fn remove_alias(&self, alias: &str) -> BeansResult<()> {
        let mut table = self.table.write();
        if table.alias_map.remove(alias).is_none() {
            return Err(BeansError::not_found(alias, "别名未注册"));
        }
        table.order.retain(|a| a != alias);
        debug!("移除别名: {}", alias);
        Ok(())
    }

    fn is_alias(&self, name: &str) -> bool {
        self.table.read().alias_map.contains_key(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let table = self.table.read();
        table
            .order
            .iter()
            .filter(|alias| table.alias_map.get(*alias).is_some_and(|target| target == name))
            .cloned()
            .collect()
    }

    fn canonical_name(&self, name: &str) -> String {
        self.table
            .read()
            .alias_map
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}
