//! 属性继承解析。
//!
//! 查找顺序固定：自身属性 → 模板对象 → 引用的图块 → 类的默认成员。
//! 第一个定义了该名称的来源胜出，其余来源被遮蔽但保持不变。

use indexmap::IndexMap;

use crate::entity::{Entity, EntityId, EntityKind};
use crate::graph::EntityGraph;
use crate::properties::PropertySet;
use crate::value::PropertyValue;

/// 属性值的来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySource {
    Own,
    Template(EntityId),
    Tile(EntityId),
    Class(String),
}

impl PropertySource {
    /// 界面据此提示“继承值，需显式覆盖后才能编辑”。
    #[inline]
    pub fn is_inherited(&self) -> bool {
        !matches!(self, PropertySource::Own)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    pub value: PropertyValue,
    pub source: PropertySource,
}

impl ResolvedProperty {
    #[inline]
    pub fn is_inherited(&self) -> bool {
        self.source.is_inherited()
    }
}

/// 合并后的属性表，保留每个名称的来源。
pub type ResolvedProperties = IndexMap<String, ResolvedProperty>;

#[derive(Debug, Clone, Copy)]
pub struct InheritanceResolver<'a> {
    graph: &'a EntityGraph,
}

impl<'a> InheritanceResolver<'a> {
    pub fn new(graph: &'a EntityGraph) -> Self {
        Self { graph }
    }

    /// 解析单个属性。未定义时返回 `None`，这不是错误。
    pub fn resolve(&self, id: EntityId, name: &str) -> Option<PropertyValue> {
        self.resolve_with_source(id, name).map(|resolved| resolved.value)
    }

    pub fn resolve_with_source(&self, id: EntityId, name: &str) -> Option<ResolvedProperty> {
        self.chain(id).into_iter().find_map(|(source, set)| {
            set.get(name).map(|value| ResolvedProperty {
                value: value.clone(),
                source,
            })
        })
    }

    /// 按优先级合并整条继承链。名称顺序为各来源首次出现的顺序。
    pub fn resolve_all(&self, id: EntityId) -> ResolvedProperties {
        let mut resolved = ResolvedProperties::new();
        for (source, set) in self.chain(id) {
            for (name, value) in set {
                if !resolved.contains_key(name) {
                    resolved.insert(
                        name.clone(),
                        ResolvedProperty {
                            value: value.clone(),
                            source: source.clone(),
                        },
                    );
                }
            }
        }
        resolved
    }

    /// 只包含继承而来、自身未覆盖的属性。
    pub fn inherited_properties(&self, id: EntityId) -> PropertySet {
        self.resolve_all(id)
            .into_iter()
            .filter(|(_, resolved)| resolved.is_inherited())
            .map(|(name, resolved)| (name, resolved.value))
            .collect()
    }

    /// 实体实际生效的类名：对象自身未指定时依次取模板、图块的类名。
    pub fn effective_class_name(&self, id: EntityId) -> Option<&'a str> {
        let entity = self.graph.entity(id)?;
        if !entity.class_name.is_empty() {
            return Some(entity.class_name.as_str());
        }
        let item = entity.as_item()?;
        let template = item.template.and_then(|t| self.graph.entity(t));
        if let Some(template) = template.filter(|t| !t.class_name.is_empty()) {
            return Some(template.class_name.as_str());
        }
        self.tile_of(entity)
            .map(|tile| tile.class_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// 可以赋给该种类实体的类名。
    pub fn class_names_for(&self, kind: EntityKind) -> Vec<String> {
        self.graph
            .class_definitions()
            .filter(|(_, class)| class.is_class_for(kind))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// 对象引用的图块；对象自身没有图块时取其模板的图块。
    pub fn tile_of(&self, entity: &Entity) -> Option<&'a Entity> {
        let item = entity.as_item()?;
        let tile = item.tile.or_else(|| {
            item.template
                .and_then(|t| self.graph.entity(t))
                .and_then(Entity::as_item)
                .and_then(|template| template.tile)
        })?;
        self.graph.entity(tile)
    }

    fn chain(&self, id: EntityId) -> Vec<(PropertySource, &'a PropertySet)> {
        let Some(entity) = self.graph.entity(id) else {
            return Vec::new();
        };
        let mut chain = vec![(PropertySource::Own, &entity.properties)];

        if let Some(item) = entity.as_item() {
            if let Some(template) = item.template.and_then(|t| self.graph.entity(t)) {
                chain.push((PropertySource::Template(template.id()), &template.properties));
            }
            if let Some(tile) = self.tile_of(entity) {
                chain.push((PropertySource::Tile(tile.id()), &tile.properties));
            }
        }

        if let Some(class_name) = self.effective_class_name(id) {
            let class = self
                .graph
                .class_definition(class_name)
                .filter(|class| class.is_class_for(entity.kind()));
            if let Some(class) = class {
                chain.push((PropertySource::Class(class_name.to_string()), &class.members));
            }
        }
        chain
    }
}
