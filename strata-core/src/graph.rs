use indexmap::IndexMap;

use crate::entity::{
    ClassDefinition, Entity, EntityData, EntityId, EntityKind, GroupData, ItemData, KindMask,
    LayerData, PatternColorData, PatternSetData, PatternType, RootData, TileData,
};
use crate::geometry::{Color, Rect, RectF, Size};
use crate::properties::PropertySet;

/// 文档的实体图。
///
/// 实体按插入顺序保存，删除后可在原位置恢复。标识一经分配不再复用。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGraph {
    entities: IndexMap<EntityId, Entity>,
    next_id: u64,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    #[inline]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// 可变访问只供命令使用，观察者拿到的是只读引用。
    #[inline]
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.entities.get_index_of(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|entity| entity.name == name)
    }

    /// 分配一个新标识但不插入实体，供经由命令添加的实体使用。
    pub fn reserve_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId::new(self.next_id)
    }

    /// 添加实体并分配新标识。
    pub fn add(&mut self, name: impl Into<String>, data: EntityData) -> EntityId {
        let id = self.reserve_id();
        self.entities.insert(id, Entity::new(id, name, data));
        id
    }

    /// 删除实体，返回其原位置，便于撤销时原样插回。
    pub fn remove(&mut self, id: EntityId) -> Option<(usize, Entity)> {
        self.entities
            .shift_remove_full(&id)
            .map(|(index, _, entity)| (index, entity))
    }

    /// 在指定位置插回实体。已存在同一标识时替换原有实体且位置不变。
    pub fn insert_at(&mut self, index: usize, entity: Entity) {
        let id = entity.id();
        self.next_id = self.next_id.max(id.get());
        if let Some(existing) = self.entities.get_mut(&id) {
            *existing = entity;
            return;
        }
        let index = index.min(self.entities.len());
        self.entities.shift_insert(index, id, entity);
    }

    pub fn add_root(&mut self, name: impl Into<String>, size: Size, tile_size: Size) -> EntityId {
        self.add(
            name,
            EntityData::Root(RootData {
                size,
                tile_size,
                background_color: Color::rgba(0, 0, 0, 0),
                infinite: false,
            }),
        )
    }

    pub fn add_container(&mut self, name: impl Into<String>, parent: Option<EntityId>) -> EntityId {
        self.add(
            name,
            EntityData::Container(LayerData {
                parent,
                ..LayerData::default()
            }),
        )
    }

    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        parent: Option<EntityId>,
        color: Color,
    ) -> EntityId {
        self.add(
            name,
            EntityData::Group(GroupData {
                layer: LayerData {
                    parent,
                    ..LayerData::default()
                },
                color,
            }),
        )
    }

    pub fn add_item(
        &mut self,
        name: impl Into<String>,
        group: Option<EntityId>,
        bounds: RectF,
    ) -> EntityId {
        self.add(
            name,
            EntityData::Item(ItemData {
                visible: true,
                bounds,
                rotation: 0.0,
                group,
                tile: None,
                template: None,
            }),
        )
    }

    pub fn add_tile(
        &mut self,
        name: impl Into<String>,
        image: impl Into<String>,
        image_rect: Rect,
    ) -> EntityId {
        self.add(
            name,
            EntityData::Tile(TileData {
                probability: 1.0,
                image: image.into(),
                image_rect,
            }),
        )
    }

    /// 添加类定义。类名即实体名称。
    pub fn add_class(
        &mut self,
        name: impl Into<String>,
        use_as: KindMask,
        members: PropertySet,
    ) -> EntityId {
        self.add(
            name,
            EntityData::ClassCatalogEntry(ClassDefinition {
                members,
                use_as,
                color: Color::rgb(0xa0, 0xa0, 0xa4),
            }),
        )
    }

    pub fn add_pattern_set(
        &mut self,
        name: impl Into<String>,
        pattern_type: PatternType,
        color_count: i64,
    ) -> EntityId {
        self.add(
            name,
            EntityData::PatternSet(PatternSetData {
                pattern_type,
                color_count,
                image_tile: None,
            }),
        )
    }

    pub fn add_pattern_color(
        &mut self,
        name: impl Into<String>,
        pattern_set: EntityId,
        color: Color,
    ) -> EntityId {
        self.add(
            name,
            EntityData::PatternColor(PatternColorData {
                color,
                probability: 1.0,
                pattern_set: Some(pattern_set),
            }),
        )
    }

    /// 让对象引用一个图块。目标不是对象或图块时返回 `false`。
    pub fn set_item_tile(&mut self, item: EntityId, tile: Option<EntityId>) -> bool {
        if let Some(tile) = tile {
            if self.entity(tile).map(Entity::kind) != Some(EntityKind::Tile) {
                return false;
            }
        }
        match self.entity_mut(item).and_then(Entity::as_item_mut) {
            Some(data) => {
                data.tile = tile;
                true
            }
            None => false,
        }
    }

    /// 让对象从模板对象派生。模板必须是另一个对象。
    pub fn set_item_template(&mut self, item: EntityId, template: Option<EntityId>) -> bool {
        if let Some(template) = template {
            if template == item || self.entity(template).map(Entity::kind) != Some(EntityKind::Item) {
                return false;
            }
        }
        match self.entity_mut(item).and_then(Entity::as_item_mut) {
            Some(data) => {
                data.template = template;
                true
            }
            None => false,
        }
    }

    /// 按名称查找类定义。
    pub fn class_definition(&self, name: &str) -> Option<&ClassDefinition> {
        self.class_definitions()
            .find(|(class_name, _)| *class_name == name)
            .map(|(_, class)| class)
    }

    pub fn class_definitions(&self) -> impl Iterator<Item = (&str, &ClassDefinition)> {
        self.entities
            .values()
            .filter_map(|entity| entity.as_class().map(|class| (entity.name.as_str(), class)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut graph = EntityGraph::new();
        let root = graph.add_root("Map", Size::new(10, 10), Size::new(16, 16));
        let layer = graph.add_container("Ground", None);
        assert_ne!(root, layer);
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![root, layer]);
        assert_eq!(graph.entity(layer).map(Entity::kind), Some(EntityKind::Container));
    }

    #[test]
    fn removed_entity_is_restored_in_place() {
        let mut graph = EntityGraph::new();
        let a = graph.add_container("A", None);
        let b = graph.add_container("B", None);
        let c = graph.add_container("C", None);

        let (index, entity) = graph.remove(b).expect("b exists");
        assert_eq!(index, 1);
        assert!(!graph.contains(b));

        graph.insert_at(index, entity);
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![a, b, c]);

        let d = graph.add_container("D", None);
        assert!(d.get() > c.get());
    }

    #[test]
    fn item_references_are_validated() {
        let mut graph = EntityGraph::new();
        let item = graph.add_item("Chest", None, RectF::new(0.0, 0.0, 16.0, 16.0));
        let tile = graph.add_tile("chest", "chest.png", Rect::new(0, 0, 16, 16));
        let layer = graph.add_container("Objects", None);

        assert!(graph.set_item_tile(item, Some(tile)));
        assert!(!graph.set_item_tile(item, Some(layer)));
        assert!(!graph.set_item_template(item, Some(item)));
        assert!(!graph.set_item_tile(layer, Some(tile)));
        assert_eq!(
            graph.entity(item).and_then(Entity::as_item).and_then(|i| i.tile),
            Some(tile)
        );
    }

    #[test]
    fn class_definitions_are_found_by_name() {
        let mut graph = EntityGraph::new();
        graph.add_class("Door", KindMask::ITEM, PropertySet::new());
        graph.add_container("Door", None);
        assert!(graph.class_definition("Door").is_some());
        assert!(graph.class_definition("Window").is_none());
        assert_eq!(graph.class_definitions().count(), 1);
    }
}
