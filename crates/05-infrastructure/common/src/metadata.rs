//! 元数据定义
//!
//! 提供 Bean 类型的元数据信息，按类型装配时使用完整类型名进行匹配

use std::any::TypeId;

/// 类型信息
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 简短类型名称
    pub name: String,
    /// 类型ID（仅对编译期已知类型有意义）
    pub id: Option<TypeId>,
    /// 完整类型名称，与 `std::any::type_name` 一致
    pub full_name: String,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: 'static + ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        Self {
            name: short_type_name(full_name).to_string(),
            id: Some(TypeId::of::<T>()),
            full_name: full_name.to_string(),
        }
    }

    /// 从类型名称创建类型信息（用于配置驱动的 Bean 定义）
    pub fn from_name(name: &str) -> Self {
        Self {
            name: short_type_name(name).to_string(),
            id: None,
            full_name: name.to_string(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// 是否与给定类型名称匹配，允许使用完整名称或简短名称
    pub fn matches(&self, type_name: &str) -> bool {
        self.full_name == type_name || (!type_name.contains("::") && self.name == type_name)
    }
}

/// 去掉模块路径，保留泛型参数之前的最后一段
fn short_type_name(full_name: &str) -> &str {
    let base = full_name.split('<').next().unwrap_or(full_name);
    let start = base.rfind("::").map_or(0, |idx| idx + 2);
    &full_name[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrderRepository;

    #[test]
    fn type_info_of_records_full_and_short_names() {
        let info = TypeInfo::of::<OrderRepository>();
        assert_eq!(info.short_name(), "OrderRepository");
        assert!(info.full_name.ends_with("::OrderRepository"));
        assert!(info.matches(&info.full_name.clone()));
        assert!(info.matches("OrderRepository"));
        assert!(!info.matches("other::OrderRepository"));
    }

    #[test]
    fn short_name_keeps_generic_arguments() {
        let info = TypeInfo::from_name("alloc::vec::Vec<alloc::string::String>");
        assert_eq!(info.short_name(), "Vec<alloc::string::String>");
        assert!(info.id.is_none());
    }
}
