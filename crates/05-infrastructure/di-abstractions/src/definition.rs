//! Bean 定义元数据
//!
//! [`BeanDefinition`] 描述一个组件：类型、作用域、懒加载、显式依赖、
//! 构造参数与属性值、生命周期方法、角色以及来源信息。定义在解析阶段创建，
//! 可以被 [`crate::BeanFactoryPostProcessor`] 修改，单例首次实例化后不再变化。

use infrastructure_common::{BeanCapability, BeanInstance, BeansError, BeansResult, TypeInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 单例作用域名称
pub const SCOPE_SINGLETON: &str = "singleton";
/// 原型作用域名称
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// Bean 作用域
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Scope {
    /// 每个工厂最多一个实例
    Singleton,
    /// 每次请求创建新实例
    Prototype,
    /// 由注册的自定义作用域管理
    Custom(String),
}

impl Scope {
    /// 作用域名称
    pub fn as_str(&self) -> &str {
        match self {
            Self::Singleton => SCOPE_SINGLETON,
            Self::Prototype => SCOPE_PROTOTYPE,
            Self::Custom(name) => name,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::Singleton
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        match value {
            "" | SCOPE_SINGLETON => Self::Singleton,
            SCOPE_PROTOTYPE => Self::Prototype,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Scope> for String {
    fn from(value: Scope) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bean 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 应用主要组成部分
    Application = 0,
    /// 较大配置中的支撑部分
    Support = 1,
    /// 纯内部基础设施，与最终用户无关
    Infrastructure = 2,
}

impl Default for Role {
    fn default() -> Self {
        Self::Application
    }
}

/// 构造参数或属性的取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeanValue {
    /// 字面量
    Literal(serde_json::Value),
    /// 按名称引用其他 Bean
    Reference(String),
    /// 按类型自动装配
    Autowired(String),
}

impl BeanValue {
    /// 创建字面量
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    /// 创建名称引用
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// 创建按类型装配的引用
    pub fn autowired<T: ?Sized + 'static>() -> Self {
        Self::Autowired(std::any::type_name::<T>().to_string())
    }
}

/// 构造参数，支持按位置和按名称两种形式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructorArgumentValues {
    /// 按位置的参数
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexed: BTreeMap<usize, BeanValue>,
    /// 按名称的参数
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named: BTreeMap<String, BeanValue>,
}

impl ConstructorArgumentValues {
    /// 添加位置参数，同一位置重复添加时覆盖
    pub fn add_indexed(&mut self, index: usize, value: BeanValue) {
        self.indexed.insert(index, value);
    }

    /// 添加命名参数
    pub fn add_named(&mut self, name: impl Into<String>, value: BeanValue) {
        self.named.insert(name.into(), value);
    }

    /// 参数总数
    pub fn len(&self) -> usize {
        self.indexed.len() + self.named.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.named.is_empty()
    }

    /// 遍历全部参数值
    pub fn values(&self) -> impl Iterator<Item = &BeanValue> {
        self.indexed.values().chain(self.named.values())
    }

    /// 合并另一组参数，`other` 中的值优先
    pub fn merge(&mut self, other: &ConstructorArgumentValues) {
        for (index, value) in &other.indexed {
            self.indexed.insert(*index, value.clone());
        }
        for (name, value) in &other.named {
            self.named.insert(name.clone(), value.clone());
        }
    }
}

/// 单个属性值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    /// 属性名
    pub name: String,
    /// 属性值
    pub value: BeanValue,
}

/// 属性值集合
///
/// 保留插入顺序以便诊断输出，同名属性后写入者覆盖先写入者。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    /// 添加属性值
    pub fn add(&mut self, name: impl Into<String>, value: BeanValue) {
        let name = name.into();
        match self.values.iter_mut().find(|pv| pv.name == name) {
            Some(existing) => existing.value = value,
            None => self.values.push(PropertyValue { name, value }),
        }
    }

    /// 获取属性值
    pub fn get(&self, name: &str) -> Option<&BeanValue> {
        self.values.iter().find(|pv| pv.name == name).map(|pv| &pv.value)
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    /// 可变遍历
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PropertyValue> {
        self.values.iter_mut()
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 合并另一组属性，`other` 中的值优先
    pub fn merge(&mut self, other: &PropertyValues) {
        for pv in &other.values {
            self.add(pv.name.clone(), pv.value.clone());
        }
    }
}

/// 实例提供函数，优先于工厂方法和构造函数
#[derive(Clone)]
pub struct InstanceSupplier(Arc<dyn Fn() -> BeansResult<BeanInstance> + Send + Sync>);

impl InstanceSupplier {
    /// 包装提供函数
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> BeansResult<BeanInstance> + Send + Sync + 'static,
    {
        Self(Arc::new(supplier))
    }

    /// 调用提供函数
    pub fn get(&self) -> BeansResult<BeanInstance> {
        (self.0)()
    }
}

impl fmt::Debug for InstanceSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceSupplier(<function>)")
    }
}

/// Bean 定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeanDefinition {
    /// 父定义名称
    pub parent_name: Option<String>,
    /// 实现类型名称
    pub bean_class_name: Option<String>,
    /// 产出的实例类型，工厂方法的返回类型在此声明
    pub target_type: Option<String>,
    /// 作用域，未设置时视为单例
    pub scope: Option<Scope>,
    /// 是否懒加载，未设置时视为否
    pub lazy_init: Option<bool>,
    /// 是否只作为子定义的模板
    #[serde(rename = "abstract")]
    pub abstract_definition: bool,
    /// 显式依赖，按初始化先后排列
    pub depends_on: Vec<String>,
    /// 是否参与按类型自动装配
    pub autowire_candidate: bool,
    /// 自动装配时是否优先
    pub primary: bool,
    /// 工厂 Bean 名称
    pub factory_bean_name: Option<String>,
    /// 工厂方法名称
    pub factory_method_name: Option<String>,
    /// 构造参数
    pub constructor_arguments: ConstructorArgumentValues,
    /// 属性值
    pub property_values: PropertyValues,
    /// 初始化方法名称
    pub init_method_name: Option<String>,
    /// 销毁方法名称
    pub destroy_method_name: Option<String>,
    /// 角色
    pub role: Role,
    /// 描述
    pub description: Option<String>,
    /// 来源描述，例如配置文件路径
    pub resource_description: Option<String>,
    /// 能力标记
    pub capabilities: Vec<BeanCapability>,
    /// 被装饰或覆盖的原始定义
    #[serde(skip)]
    pub originating_bean_definition: Option<Arc<BeanDefinition>>,
    /// 实例提供函数
    #[serde(skip)]
    pub instance_supplier: Option<InstanceSupplier>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self {
            parent_name: None,
            bean_class_name: None,
            target_type: None,
            scope: None,
            lazy_init: None,
            abstract_definition: false,
            depends_on: Vec::new(),
            autowire_candidate: true,
            primary: false,
            factory_bean_name: None,
            factory_method_name: None,
            constructor_arguments: ConstructorArgumentValues::default(),
            property_values: PropertyValues::default(),
            init_method_name: None,
            destroy_method_name: None,
            role: Role::Application,
            description: None,
            resource_description: None,
            capabilities: Vec::new(),
            originating_bean_definition: None,
            instance_supplier: None,
        }
    }
}

impl BeanDefinition {
    /// 以实现类型名称创建定义
    pub fn new(bean_class_name: impl Into<String>) -> Self {
        Self {
            bean_class_name: Some(bean_class_name.into()),
            ..Self::default()
        }
    }

    /// 以 Rust 类型创建定义
    pub fn for_type<T: ?Sized + 'static>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// 创建只继承父定义的子定义
    pub fn child_of(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::default()
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// 设置为原型作用域
    pub fn prototype(self) -> Self {
        self.with_scope(Scope::Prototype)
    }

    /// 设置懒加载
    pub fn with_lazy_init(mut self, lazy_init: bool) -> Self {
        self.lazy_init = Some(lazy_init);
        self
    }

    /// 设置为抽象定义
    pub fn with_abstract(mut self, abstract_definition: bool) -> Self {
        self.abstract_definition = abstract_definition;
        self
    }

    /// 设置父定义
    pub fn with_parent(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_name = Some(parent_name.into());
        self
    }

    /// 追加显式依赖
    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(names.into_iter().map(Into::into));
        self
    }

    /// 设置是否优先
    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// 设置是否参与自动装配
    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    /// 通过工厂 Bean 的实例方法创建
    pub fn with_factory_bean(
        mut self,
        factory_bean_name: impl Into<String>,
        factory_method_name: impl Into<String>,
    ) -> Self {
        self.factory_bean_name = Some(factory_bean_name.into());
        self.factory_method_name = Some(factory_method_name.into());
        self
    }

    /// 通过实现类型上的静态工厂方法创建
    pub fn with_factory_method(mut self, factory_method_name: impl Into<String>) -> Self {
        self.factory_method_name = Some(factory_method_name.into());
        self
    }

    /// 设置产出类型
    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    /// 添加位置构造参数
    pub fn with_constructor_arg(mut self, index: usize, value: BeanValue) -> Self {
        self.constructor_arguments.add_indexed(index, value);
        self
    }

    /// 添加命名构造参数
    pub fn with_named_arg(mut self, name: impl Into<String>, value: BeanValue) -> Self {
        self.constructor_arguments.add_named(name, value);
        self
    }

    /// 添加属性值
    pub fn with_property(mut self, name: impl Into<String>, value: BeanValue) -> Self {
        self.property_values.add(name, value);
        self
    }

    /// 设置初始化方法
    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method_name = Some(method.into());
        self
    }

    /// 设置销毁方法
    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method_name = Some(method.into());
        self
    }

    /// 设置角色
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 设置来源描述
    pub fn with_resource_description(mut self, resource: impl Into<String>) -> Self {
        self.resource_description = Some(resource.into());
        self
    }

    /// 添加能力标记
    pub fn with_capability(mut self, capability: BeanCapability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// 设置实例提供函数
    pub fn with_instance_supplier<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> BeansResult<BeanInstance> + Send + Sync + 'static,
    {
        self.instance_supplier = Some(InstanceSupplier::new(supplier));
        self
    }

    /// 记录被装饰的原始定义
    pub fn with_originating(mut self, original: BeanDefinition) -> Self {
        self.originating_bean_definition = Some(Arc::new(original));
        self
    }

    /// 有效作用域
    pub fn scope(&self) -> Scope {
        self.scope.clone().unwrap_or_default()
    }

    /// 是否单例
    pub fn is_singleton(&self) -> bool {
        self.scope() == Scope::Singleton
    }

    /// 是否原型
    pub fn is_prototype(&self) -> bool {
        self.scope() == Scope::Prototype
    }

    /// 是否懒加载
    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    /// 是否抽象
    pub fn is_abstract(&self) -> bool {
        self.abstract_definition
    }

    /// 是否具备能力
    pub fn has_capability(&self, capability: BeanCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// 产出实例的类型名称
    ///
    /// 优先使用 `target_type`；使用工厂方法时实现类型并不代表产出类型，返回 `None`。
    pub fn resolved_type_name(&self) -> Option<&str> {
        if let Some(target) = self.target_type.as_deref() {
            return Some(target);
        }
        if self.factory_method_name.is_some() {
            return None;
        }
        self.bean_class_name.as_deref()
    }

    /// 产出类型是否与给定类型名称匹配
    pub fn matches_type(&self, type_name: &str) -> bool {
        self.resolved_type_name()
            .is_some_and(|name| TypeInfo::from_name(name).matches(type_name))
    }

    /// 结构校验
    pub fn validate(&self, bean_name: &str) -> BeansResult<()> {
        if self.depends_on.iter().any(|dep| dep == bean_name) {
            return Err(BeansError::configuration(format!(
                "Bean '{bean_name}' 的 depends_on 包含自身"
            )));
        }

        if self.factory_bean_name.is_some() && self.factory_method_name.is_none() {
            return Err(BeansError::configuration(format!(
                "Bean '{bean_name}' 指定了工厂 Bean 但缺少工厂方法"
            )));
        }

        if self.factory_bean_name.as_deref() == Some(bean_name) {
            return Err(BeansError::configuration(format!(
                "Bean '{bean_name}' 不能作为自身的工厂 Bean"
            )));
        }

        if self.is_abstract() || self.parent_name.is_some() {
            return Ok(());
        }

        if self.factory_method_name.is_some()
            && self.factory_bean_name.is_none()
            && self.bean_class_name.is_none()
        {
            return Err(BeansError::configuration(format!(
                "Bean '{bean_name}' 使用静态工厂方法但未指定实现类型"
            )));
        }

        if self.bean_class_name.is_none()
            && self.factory_bean_name.is_none()
            && self.instance_supplier.is_none()
        {
            return Err(BeansError::configuration(format!(
                "Bean '{bean_name}' 既没有实现类型，也没有工厂或实例提供函数"
            )));
        }

        Ok(())
    }

    /// 以父定义为基础合并出完整定义
    ///
    /// 子定义中显式设置的值覆盖父定义；`abstract`、`primary`、`autowire_candidate`、
    /// `role` 与 `depends_on` 总是取子定义的值。合并结果不再带有父定义名称。
    pub fn merge_from_parent(&self, parent: &BeanDefinition) -> BeanDefinition {
        let mut merged = parent.clone();
        merged.parent_name = None;

        if self.bean_class_name.is_some() {
            merged.bean_class_name = self.bean_class_name.clone();
        }
        if self.target_type.is_some() {
            merged.target_type = self.target_type.clone();
        }
        if self.scope.is_some() {
            merged.scope = self.scope.clone();
        }
        if self.lazy_init.is_some() {
            merged.lazy_init = self.lazy_init;
        }
        merged.abstract_definition = self.abstract_definition;
        merged.depends_on = self.depends_on.clone();
        merged.autowire_candidate = self.autowire_candidate;
        merged.primary = self.primary;
        if self.factory_bean_name.is_some() {
            merged.factory_bean_name = self.factory_bean_name.clone();
        }
        if self.factory_method_name.is_some() {
            merged.factory_method_name = self.factory_method_name.clone();
        }
        merged.constructor_arguments.merge(&self.constructor_arguments);
        merged.property_values.merge(&self.property_values);
        if self.init_method_name.is_some() {
            merged.init_method_name = self.init_method_name.clone();
        }
        if self.destroy_method_name.is_some() {
            merged.destroy_method_name = self.destroy_method_name.clone();
        }
        merged.role = self.role;
        if self.description.is_some() {
            merged.description = self.description.clone();
        }
        if self.resource_description.is_some() {
            merged.resource_description = self.resource_description.clone();
        }
        for capability in &self.capabilities {
            if !merged.capabilities.contains(capability) {
                merged.capabilities.push(*capability);
            }
        }
        merged.originating_bean_definition = self.originating_bean_definition.clone();
        if self.instance_supplier.is_some() {
            merged.instance_supplier = self.instance_supplier.clone();
        }

        merged
    }

    /// 沿原始定义链向上遍历，不包含自身
    pub fn originating_chain(&self) -> impl Iterator<Item = &BeanDefinition> {
        std::iter::successors(self.originating_bean_definition.as_deref(), |def| {
            def.originating_bean_definition.as_deref()
        })
    }

    /// 最初的原始定义，没有原始定义时返回自身
    pub fn root_originating(&self) -> &BeanDefinition {
        self.originating_chain().last().unwrap_or(self)
    }

    /// 按名称声明的全部依赖：显式依赖、引用参数、引用属性和工厂 Bean
    pub fn dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };

        for dep in &self.depends_on {
            push(dep);
        }
        if let Some(factory_bean) = &self.factory_bean_name {
            push(factory_bean);
        }
        for value in self.constructor_arguments.values() {
            if let BeanValue::Reference(name) = value {
                push(name);
            }
        }
        for pv in self.property_values.iter() {
            if let BeanValue::Reference(name) = &pv.value {
                push(name);
            }
        }

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct DataSource;

    #[test]
    fn scope_defaults_to_singleton_and_parses_custom_names() {
        let def = BeanDefinition::new("app::Service");
        assert!(def.is_singleton());
        assert!(!def.is_prototype());
        assert_eq!(Scope::from("request"), Scope::Custom("request".to_string()));
        assert_eq!(Scope::from("prototype"), Scope::Prototype);
        assert!(BeanDefinition::new("x").prototype().is_prototype());
    }

    #[test]
    fn validate_rejects_self_dependency() {
        let def = BeanDefinition::new("app::A").with_depends_on(["a"]);
        let err = def.validate("a").unwrap_err();
        assert!(matches!(err, BeansError::Configuration { .. }));
    }

    #[test]
    fn validate_requires_a_way_to_instantiate() {
        assert!(BeanDefinition::default().validate("x").is_err());
        assert!(BeanDefinition::default().with_abstract(true).validate("x").is_ok());
        assert!(BeanDefinition::default()
            .with_factory_bean("factory", "create")
            .validate("x")
            .is_ok());
        assert!(BeanDefinition::default()
            .with_factory_method("create")
            .validate("x")
            .is_err());
    }

    #[test]
    fn static_factory_method_hides_class_as_produced_type() {
        let def = BeanDefinition::new("app::ClientFactory").with_factory_method("build");
        assert_eq!(def.resolved_type_name(), None);
        let def = def.with_target_type("app::Client");
        assert!(def.matches_type("app::Client"));
        assert!(def.matches_type("Client"));
    }

    #[test]
    fn merge_takes_child_overrides_and_parent_defaults() {
        let parent = BeanDefinition::for_type::<DataSource>()
            .with_abstract(true)
            .with_lazy_init(true)
            .with_property("url", BeanValue::literal("jdbc:h2:mem"))
            .with_property("pool", BeanValue::literal(4))
            .with_init_method("open");
        let child = BeanDefinition::child_of("baseDataSource")
            .with_property("pool", BeanValue::literal(16))
            .with_primary(true);

        let merged = child.merge_from_parent(&parent);
        assert!(!merged.is_abstract());
        assert!(merged.is_lazy_init());
        assert!(merged.primary);
        assert!(merged.parent_name.is_none());
        assert_eq!(merged.init_method_name.as_deref(), Some("open"));
        assert_eq!(
            merged.property_values.get("pool"),
            Some(&BeanValue::literal(16))
        );
        assert_eq!(
            merged.property_values.get("url"),
            Some(&BeanValue::literal("jdbc:h2:mem"))
        );
        assert!(merged.matches_type("DataSource"));
    }

    #[test]
    fn dependency_names_collects_references_without_duplicates() {
        let def = BeanDefinition::new("app::Repo")
            .with_depends_on(["migrations", "dataSource"])
            .with_constructor_arg(0, BeanValue::reference("dataSource"))
            .with_named_arg("clock", BeanValue::autowired::<DataSource>())
            .with_property("cache", BeanValue::reference("cacheManager"));
        assert_eq!(
            def.dependency_names(),
            vec!["migrations", "dataSource", "cacheManager"]
        );
    }

    #[test]
    fn originating_chain_walks_back_to_root() {
        let root = BeanDefinition::new("app::Raw").with_description("root");
        let decorated = BeanDefinition::new("app::Decorated").with_originating(root);
        let proxied = BeanDefinition::new("app::Proxy").with_originating(decorated);

        let chain: Vec<_> = proxied
            .originating_chain()
            .map(|d| d.bean_class_name.clone().unwrap_or_default())
            .collect();
        assert_eq!(chain, vec!["app::Decorated", "app::Raw"]);
        assert_eq!(proxied.root_originating().description.as_deref(), Some("root"));
    }

    #[test]
    fn definition_deserializes_from_config_shape() {
        let def: BeanDefinition = serde_json::from_value(json!({
            "bean_class_name": "app::Pool",
            "scope": "prototype",
            "abstract": false,
            "depends_on": ["dataSource"],
            "constructor_arguments": { "indexed": { "0": { "literal": 8 } } },
            "property_values": [ { "name": "ds", "value": { "reference": "dataSource" } } ],
            "role": "infrastructure"
        }))
        .unwrap();

        assert!(def.is_prototype());
        assert!(def.autowire_candidate);
        assert_eq!(def.role, Role::Infrastructure);
        assert_eq!(
            def.constructor_arguments.indexed.get(&0),
            Some(&BeanValue::literal(8))
        );
        assert_eq!(def.dependency_names(), vec!["dataSource"]);
    }
}
