//! 变更事件。
//!
//! 每个已提交的修改恰好产生一次事件，事件创建后不可变，同步分发后即被丢弃。
//! 字段位标记按实体种类各自定义，避免不同种类之间的位冲突。

use bitflags::bitflags;
use strata_core::entity::{
    ClassField, EntityId, Field, ItemField, LayerField, PatternColorField, PatternSetField,
    RootField, TileField,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RootFields: u8 {
        const SIZE = 1 << 0;
        const TILE_SIZE = 1 << 1;
        const BACKGROUND_COLOR = 1 << 2;
        const INFINITE = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerFields: u8 {
        const VISIBLE = 1 << 0;
        const LOCKED = 1 << 1;
        const OPACITY = 1 << 2;
        const TINT_COLOR = 1 << 3;
        const OFFSET = 1 << 4;
        const PARALLAX_FACTOR = 1 << 5;
        const COLOR = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemFields: u8 {
        const VISIBLE = 1 << 0;
        const POSITION = 1 << 1;
        const SIZE = 1 << 2;
        const ROTATION = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TileFields: u8 {
        const PROBABILITY = 1 << 0;
        const IMAGE = 1 << 1;
        const IMAGE_RECT = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassFields: u8 {
        const COLOR = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PatternSetFields: u8 {
        const PATTERN_TYPE = 1 << 0;
        const COLOR_COUNT = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PatternColorFields: u8 {
        const COLOR = 1 << 0;
        const PROBABILITY = 1 << 1;
    }
}

/// 变更的种类。按实体种类区分的变体携带被修改字段的位标记。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    RootChanged(RootFields),
    LayersChanged(LayerFields),
    ItemsChanged(ItemFields),
    TilesChanged(TileFields),
    ClassDefinitionsChanged(ClassFields),
    PatternSetsChanged(PatternSetFields),
    PatternColorsChanged(PatternColorFields),
    NameChanged,
    EntitiesAdded,
    EntitiesRemoved,
    PropertyAdded { name: String },
    PropertyRemoved { name: String },
    PropertyValueChanged { name: String },
    /// 整个属性集被替换。
    PropertiesChanged,
    ClassAssignmentChanged,
    DocumentReloading,
    DocumentReloaded,
}

impl ChangeKind {
    /// 内建字段对应的事件种类。
    pub fn for_field(field: Field) -> ChangeKind {
        match field {
            Field::Name => ChangeKind::NameChanged,
            Field::Root(f) => ChangeKind::RootChanged(match f {
                RootField::Size => RootFields::SIZE,
                RootField::TileSize => RootFields::TILE_SIZE,
                RootField::BackgroundColor => RootFields::BACKGROUND_COLOR,
                RootField::Infinite => RootFields::INFINITE,
            }),
            Field::Layer(f) => ChangeKind::LayersChanged(match f {
                LayerField::Visible => LayerFields::VISIBLE,
                LayerField::Locked => LayerFields::LOCKED,
                LayerField::Opacity => LayerFields::OPACITY,
                LayerField::TintColor => LayerFields::TINT_COLOR,
                LayerField::Offset => LayerFields::OFFSET,
                LayerField::ParallaxFactor => LayerFields::PARALLAX_FACTOR,
                LayerField::Color => LayerFields::COLOR,
            }),
            Field::Item(f) => ChangeKind::ItemsChanged(match f {
                ItemField::Visible => ItemFields::VISIBLE,
                ItemField::Position => ItemFields::POSITION,
                ItemField::Geometry => ItemFields::POSITION | ItemFields::SIZE,
                ItemField::Rotation => ItemFields::ROTATION,
            }),
            Field::Tile(f) => ChangeKind::TilesChanged(match f {
                TileField::Probability => TileFields::PROBABILITY,
                TileField::Image => TileFields::IMAGE,
                TileField::ImageRect => TileFields::IMAGE_RECT,
            }),
            Field::Class(ClassField::Color) => ChangeKind::ClassDefinitionsChanged(ClassFields::COLOR),
            Field::PatternSet(f) => ChangeKind::PatternSetsChanged(match f {
                PatternSetField::PatternType => PatternSetFields::PATTERN_TYPE,
                PatternSetField::ColorCount => PatternSetFields::COLOR_COUNT,
            }),
            Field::PatternColor(f) => ChangeKind::PatternColorsChanged(match f {
                PatternColorField::Color => PatternColorFields::COLOR,
                PatternColorField::Probability => PatternColorFields::PROBABILITY,
            }),
        }
    }

    /// 与自定义属性相关的事件所涉及的属性名。
    pub fn property_name(&self) -> Option<&str> {
        match self {
            ChangeKind::PropertyAdded { name }
            | ChangeKind::PropertyRemoved { name }
            | ChangeKind::PropertyValueChanged { name } => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn is_reload(&self) -> bool {
        matches!(self, ChangeKind::DocumentReloading | ChangeKind::DocumentReloaded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    kind: ChangeKind,
    affected: Vec<EntityId>,
}

impl ChangeEvent {
    /// 创建事件。受影响实体按首次出现的顺序去重。
    pub fn new(kind: ChangeKind, affected: impl IntoIterator<Item = EntityId>) -> Self {
        let mut ids: Vec<EntityId> = Vec::new();
        for id in affected {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self {
            kind,
            affected: ids,
        }
    }

    pub fn single(kind: ChangeKind, id: EntityId) -> Self {
        Self {
            kind,
            affected: vec![id],
        }
    }

    /// 不针对具体实体的文档级事件。
    pub fn document(kind: ChangeKind) -> Self {
        Self {
            kind,
            affected: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ChangeKind {
        &self.kind
    }

    #[inline]
    pub fn affected(&self) -> &[EntityId] {
        &self.affected
    }

    #[inline]
    pub fn affects(&self, id: EntityId) -> bool {
        self.affected.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affected_entities_are_deduplicated_in_order() {
        let a = EntityId::new(1);
        let b = EntityId::new(2);
        let event = ChangeEvent::new(ChangeKind::EntitiesRemoved, [b, a, b]);
        assert_eq!(event.affected(), &[b, a]);
        assert!(event.affects(a));
        assert!(!event.affects(EntityId::new(3)));
    }

    #[test]
    fn field_flags_are_namespaced_per_kind() {
        assert_eq!(
            ChangeKind::for_field(Field::Layer(LayerField::Visible)),
            ChangeKind::LayersChanged(LayerFields::VISIBLE)
        );
        assert_eq!(
            ChangeKind::for_field(Field::Item(ItemField::Visible)),
            ChangeKind::ItemsChanged(ItemFields::VISIBLE)
        );
        let ChangeKind::ItemsChanged(flags) = ChangeKind::for_field(Field::Item(ItemField::Geometry))
        else {
            panic!("geometry is an item field");
        };
        assert!(flags.contains(ItemFields::POSITION | ItemFields::SIZE));
    }

    #[test]
    fn property_events_expose_their_name() {
        let kind = ChangeKind::PropertyValueChanged { name: "hp".into() };
        assert_eq!(kind.property_name(), Some("hp"));
        assert_eq!(ChangeKind::PropertiesChanged.property_name(), None);
        assert!(ChangeKind::DocumentReloaded.is_reload());
    }
}
