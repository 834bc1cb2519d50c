//! 别名注册表抽象接口

use infrastructure_common::BeansResult;

/// 别名注册表 trait
///
/// 维护 别名 -> 规范名称 的多对一映射。只支持单跳别名，
/// 别名不能再指向另一个别名。
pub trait AliasRegistry: Send + Sync {
    /// 注册别名
    ///
    /// 别名与名称相同，或重复注册同一映射时不做任何操作；
    /// 别名已指向其他名称且不允许覆盖时返回冲突错误。
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()>;

    /// 移除别名，不存在时返回未找到错误
    fn remove_alias(&self, alias: &str) -> BeansResult<()>;

    /// 检查名称是否为别名
    fn is_alias(&self, name: &str) -> bool;

    /// 获取指向名称的全部别名，按注册顺序返回
    fn get_aliases(&self, name: &str) -> Vec<String>;

    /// 将别名解析为规范名称，非别名原样返回
    fn canonical_name(&self, name: &str) -> String;
}
