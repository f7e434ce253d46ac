use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Color, PointF, Rect, RectF, Size};
use crate::properties::PropertySet;
use crate::value::{PropertyValue, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 提供原始数值，便于序列化或日志输出。
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 实体种类。创建后固定，不会改变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Root,
    Container,
    Group,
    Item,
    Tile,
    ClassCatalogEntry,
    PatternSet,
    PatternColor,
}

impl EntityKind {
    pub fn mask(self) -> KindMask {
        match self {
            EntityKind::Root => KindMask::ROOT,
            EntityKind::Container => KindMask::CONTAINER,
            EntityKind::Group => KindMask::GROUP,
            EntityKind::Item => KindMask::ITEM,
            EntityKind::Tile => KindMask::TILE,
            EntityKind::ClassCatalogEntry => KindMask::CLASS_CATALOG_ENTRY,
            EntityKind::PatternSet => KindMask::PATTERN_SET,
            EntityKind::PatternColor => KindMask::PATTERN_COLOR,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Root => "root",
            EntityKind::Container => "container",
            EntityKind::Group => "group",
            EntityKind::Item => "item",
            EntityKind::Tile => "tile",
            EntityKind::ClassCatalogEntry => "class",
            EntityKind::PatternSet => "pattern-set",
            EntityKind::PatternColor => "pattern-color",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// 类定义可以作用的实体种类集合。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KindMask: u16 {
        const ROOT = 1 << 0;
        const CONTAINER = 1 << 1;
        const GROUP = 1 << 2;
        const ITEM = 1 << 3;
        const TILE = 1 << 4;
        const CLASS_CATALOG_ENTRY = 1 << 5;
        const PATTERN_SET = 1 << 6;
        const PATTERN_COLOR = 1 << 7;
        /// 类值可以作为另一个类的成员类型使用。
        const PROPERTY_VALUE = 1 << 8;
    }
}

/// 图层共有属性，容器与对象组共用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub visible: bool,
    pub locked: bool,
    pub opacity: f64,
    pub tint_color: Color,
    pub offset: PointF,
    pub parallax_factor: PointF,
    pub parent: Option<EntityId>,
}

impl Default for LayerData {
    fn default() -> Self {
        Self {
            visible: true,
            locked: false,
            opacity: 1.0,
            tint_color: Color::WHITE,
            offset: PointF::default(),
            parallax_factor: PointF::new(1.0, 1.0),
            parent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    pub layer: LayerData,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootData {
    pub size: Size,
    pub tile_size: Size,
    pub background_color: Color,
    pub infinite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub visible: bool,
    pub bounds: RectF,
    pub rotation: f64,
    pub group: Option<EntityId>,
    pub tile: Option<EntityId>,
    pub template: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileData {
    pub probability: f64,
    pub image: String,
    pub image_rect: Rect,
}

/// 类目录条目：类名即实体名称，`members` 是该类的默认属性。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub members: PropertySet,
    pub use_as: KindMask,
    pub color: Color,
}

impl ClassDefinition {
    #[inline]
    pub fn is_class_for(&self, kind: EntityKind) -> bool {
        self.use_as.contains(kind.mask())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternType {
    Corner,
    Edge,
    Mixed,
}

impl PatternType {
    pub fn name(self) -> &'static str {
        match self {
            PatternType::Corner => "corner",
            PatternType::Edge => "edge",
            PatternType::Mixed => "mixed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [PatternType::Corner, PatternType::Edge, PatternType::Mixed]
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSetData {
    pub pattern_type: PatternType,
    pub color_count: i64,
    pub image_tile: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternColorData {
    pub color: Color,
    pub probability: f64,
    pub pattern_set: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    Root(RootData),
    Container(LayerData),
    Group(GroupData),
    Item(ItemData),
    Tile(TileData),
    ClassCatalogEntry(ClassDefinition),
    PatternSet(PatternSetData),
    PatternColor(PatternColorData),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Root(_) => EntityKind::Root,
            EntityData::Container(_) => EntityKind::Container,
            EntityData::Group(_) => EntityKind::Group,
            EntityData::Item(_) => EntityKind::Item,
            EntityData::Tile(_) => EntityKind::Tile,
            EntityData::ClassCatalogEntry(_) => EntityKind::ClassCatalogEntry,
            EntityData::PatternSet(_) => EntityKind::PatternSet,
            EntityData::PatternColor(_) => EntityKind::PatternColor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootField {
    Size,
    TileSize,
    BackgroundColor,
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerField {
    Visible,
    Locked,
    Opacity,
    TintColor,
    Offset,
    ParallaxFactor,
    /// 仅对象组拥有。
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemField {
    Visible,
    Position,
    Geometry,
    Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileField {
    Probability,
    Image,
    ImageRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassField {
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternSetField {
    PatternType,
    ColorCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternColorField {
    Color,
    Probability,
}

/// 按实体种类分命名空间的内建字段标签。`Name` 为所有种类共有。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Root(RootField),
    Layer(LayerField),
    Item(ItemField),
    Tile(TileField),
    Class(ClassField),
    PatternSet(PatternSetField),
    PatternColor(PatternColorField),
}

impl Field {
    pub const ALL: [Field; 24] = [
        Field::Name,
        Field::Root(RootField::Size),
        Field::Root(RootField::TileSize),
        Field::Root(RootField::BackgroundColor),
        Field::Root(RootField::Infinite),
        Field::Layer(LayerField::Visible),
        Field::Layer(LayerField::Locked),
        Field::Layer(LayerField::Opacity),
        Field::Layer(LayerField::TintColor),
        Field::Layer(LayerField::Offset),
        Field::Layer(LayerField::ParallaxFactor),
        Field::Layer(LayerField::Color),
        Field::Item(ItemField::Visible),
        Field::Item(ItemField::Position),
        Field::Item(ItemField::Geometry),
        Field::Item(ItemField::Rotation),
        Field::Tile(TileField::Probability),
        Field::Tile(TileField::Image),
        Field::Tile(TileField::ImageRect),
        Field::Class(ClassField::Color),
        Field::PatternSet(PatternSetField::PatternType),
        Field::PatternSet(PatternSetField::ColorCount),
        Field::PatternColor(PatternColorField::Color),
        Field::PatternColor(PatternColorField::Probability),
    ];

    /// 脚本中使用的限定名，例如 `layer.opacity`。
    pub fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Root(RootField::Size) => "root.size",
            Field::Root(RootField::TileSize) => "root.tile_size",
            Field::Root(RootField::BackgroundColor) => "root.background_color",
            Field::Root(RootField::Infinite) => "root.infinite",
            Field::Layer(LayerField::Visible) => "layer.visible",
            Field::Layer(LayerField::Locked) => "layer.locked",
            Field::Layer(LayerField::Opacity) => "layer.opacity",
            Field::Layer(LayerField::TintColor) => "layer.tint_color",
            Field::Layer(LayerField::Offset) => "layer.offset",
            Field::Layer(LayerField::ParallaxFactor) => "layer.parallax_factor",
            Field::Layer(LayerField::Color) => "layer.color",
            Field::Item(ItemField::Visible) => "item.visible",
            Field::Item(ItemField::Position) => "item.position",
            Field::Item(ItemField::Geometry) => "item.geometry",
            Field::Item(ItemField::Rotation) => "item.rotation",
            Field::Tile(TileField::Probability) => "tile.probability",
            Field::Tile(TileField::Image) => "tile.image",
            Field::Tile(TileField::ImageRect) => "tile.image_rect",
            Field::Class(ClassField::Color) => "class.color",
            Field::PatternSet(PatternSetField::PatternType) => "pattern_set.type",
            Field::PatternSet(PatternSetField::ColorCount) => "pattern_set.color_count",
            Field::PatternColor(PatternColorField::Color) => "pattern_color.color",
            Field::PatternColor(PatternColorField::Probability) => "pattern_color.probability",
        }
    }

    /// 字段接受的值种类。
    pub fn value_kind(self) -> ValueKind {
        match self {
            Field::Name => ValueKind::String,
            Field::Root(RootField::Size | RootField::TileSize) => ValueKind::Size,
            Field::Root(RootField::BackgroundColor) => ValueKind::Color,
            Field::Root(RootField::Infinite) => ValueKind::Bool,
            Field::Layer(LayerField::Visible | LayerField::Locked) => ValueKind::Bool,
            Field::Layer(LayerField::Opacity) => ValueKind::Float,
            Field::Layer(LayerField::TintColor | LayerField::Color) => ValueKind::Color,
            Field::Layer(LayerField::Offset | LayerField::ParallaxFactor) => ValueKind::PointF,
            Field::Item(ItemField::Visible) => ValueKind::Bool,
            Field::Item(ItemField::Position) => ValueKind::PointF,
            Field::Item(ItemField::Geometry) => ValueKind::RectF,
            Field::Item(ItemField::Rotation) => ValueKind::Float,
            Field::Tile(TileField::Probability) => ValueKind::Float,
            Field::Tile(TileField::Image) => ValueKind::FilePath,
            Field::Tile(TileField::ImageRect) => ValueKind::Rect,
            Field::Class(ClassField::Color) => ValueKind::Color,
            Field::PatternSet(PatternSetField::PatternType) => ValueKind::String,
            Field::PatternSet(PatternSetField::ColorCount) => ValueKind::Int,
            Field::PatternColor(PatternColorField::Color) => ValueKind::Color,
            Field::PatternColor(PatternColorField::Probability) => ValueKind::Float,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field {0:?}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("field {field:?} does not apply to {kind} entities")]
    NotApplicable { field: Field, kind: EntityKind },
    #[error("field {field:?} expects {expected}, got {found}")]
    TypeMismatch {
        field: Field,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("{value:?} is not a valid value for {field:?}")]
    InvalidValue { field: Field, value: String },
}

/// 文档对象图中的一个节点。
///
/// 种类由 `data` 的变体决定，`data` 只能通过字段访问接口修改，因此实体一经创建种类不变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    pub name: String,
    pub class_name: String,
    pub properties: PropertySet,
    data: EntityData,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, data: EntityData) -> Self {
        Self {
            id,
            name: name.into(),
            class_name: String::new(),
            properties: PropertySet::new(),
            data,
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    #[inline]
    pub fn data(&self) -> &EntityData {
        &self.data
    }

    #[inline]
    pub fn as_item(&self) -> Option<&ItemData> {
        match &self.data {
            EntityData::Item(item) => Some(item),
            _ => None,
        }
    }

    #[inline]
    pub fn as_item_mut(&mut self) -> Option<&mut ItemData> {
        match &mut self.data {
            EntityData::Item(item) => Some(item),
            _ => None,
        }
    }

    #[inline]
    pub fn as_class(&self) -> Option<&ClassDefinition> {
        match &self.data {
            EntityData::ClassCatalogEntry(class) => Some(class),
            _ => None,
        }
    }

    #[inline]
    pub fn layer(&self) -> Option<&LayerData> {
        match &self.data {
            EntityData::Container(layer) => Some(layer),
            EntityData::Group(group) => Some(&group.layer),
            _ => None,
        }
    }

    /// 读取内建字段，该种类没有此字段时返回 `None`。
    pub fn field(&self, field: Field) -> Option<PropertyValue> {
        let value = match (field, &self.data) {
            (Field::Name, _) => PropertyValue::String(self.name.clone()),
            (Field::Root(f), EntityData::Root(root)) => match f {
                RootField::Size => PropertyValue::Size(root.size),
                RootField::TileSize => PropertyValue::Size(root.tile_size),
                RootField::BackgroundColor => PropertyValue::Color(root.background_color),
                RootField::Infinite => PropertyValue::Bool(root.infinite),
            },
            (Field::Layer(LayerField::Color), EntityData::Group(group)) => {
                PropertyValue::Color(group.color)
            }
            (Field::Layer(LayerField::Color), _) => return None,
            (Field::Layer(f), _) => {
                let layer = self.layer()?;
                match f {
                    LayerField::Visible => PropertyValue::Bool(layer.visible),
                    LayerField::Locked => PropertyValue::Bool(layer.locked),
                    LayerField::Opacity => PropertyValue::Float(layer.opacity),
                    LayerField::TintColor => PropertyValue::Color(layer.tint_color),
                    LayerField::Offset => PropertyValue::PointF(layer.offset),
                    LayerField::ParallaxFactor => PropertyValue::PointF(layer.parallax_factor),
                    LayerField::Color => return None,
                }
            }
            (Field::Item(f), EntityData::Item(item)) => match f {
                ItemField::Visible => PropertyValue::Bool(item.visible),
                ItemField::Position => PropertyValue::PointF(item.bounds.origin()),
                ItemField::Geometry => PropertyValue::RectF(item.bounds),
                ItemField::Rotation => PropertyValue::Float(item.rotation),
            },
            (Field::Tile(f), EntityData::Tile(tile)) => match f {
                TileField::Probability => PropertyValue::Float(tile.probability),
                TileField::Image => PropertyValue::FilePath(tile.image.clone()),
                TileField::ImageRect => PropertyValue::Rect(tile.image_rect),
            },
            (Field::Class(ClassField::Color), EntityData::ClassCatalogEntry(class)) => {
                PropertyValue::Color(class.color)
            }
            (Field::PatternSet(f), EntityData::PatternSet(set)) => match f {
                PatternSetField::PatternType => {
                    PropertyValue::String(set.pattern_type.name().to_string())
                }
                PatternSetField::ColorCount => PropertyValue::Int(set.color_count),
            },
            (Field::PatternColor(f), EntityData::PatternColor(color)) => match f {
                PatternColorField::Color => PropertyValue::Color(color.color),
                PatternColorField::Probability => PropertyValue::Float(color.probability),
            },
            _ => return None,
        };
        Some(value)
    }

    /// 写入内建字段并返回旧值。值种类必须与字段一致，不做隐式转换。
    pub fn set_field(
        &mut self,
        field: Field,
        value: PropertyValue,
    ) -> Result<PropertyValue, FieldError> {
        let old = self.field(field).ok_or(FieldError::NotApplicable {
            field,
            kind: self.kind(),
        })?;
        let expected = field.value_kind();
        if value.kind() != expected {
            return Err(FieldError::TypeMismatch {
                field,
                expected,
                found: value.kind(),
            });
        }
        let invalid = |value: &PropertyValue| FieldError::InvalidValue {
            field,
            value: value.to_string(),
        };

        match (field, value, &mut self.data) {
            (Field::Name, PropertyValue::String(name), _) => self.name = name,
            (Field::Root(f), value, EntityData::Root(root)) => match (f, value) {
                (RootField::Size, PropertyValue::Size(size)) => root.size = size,
                (RootField::TileSize, PropertyValue::Size(size)) => root.tile_size = size,
                (RootField::BackgroundColor, PropertyValue::Color(c)) => {
                    root.background_color = c
                }
                (RootField::Infinite, PropertyValue::Bool(b)) => root.infinite = b,
                (_, other) => return Err(invalid(&other)),
            },
            (Field::Layer(LayerField::Color), PropertyValue::Color(c), EntityData::Group(group)) => {
                group.color = c
            }
            (
                Field::Layer(f),
                value,
                EntityData::Container(layer) | EntityData::Group(GroupData { layer, .. }),
            ) => {
                match (f, value) {
                    (LayerField::Visible, PropertyValue::Bool(b)) => layer.visible = b,
                    (LayerField::Locked, PropertyValue::Bool(b)) => layer.locked = b,
                    (LayerField::Opacity, PropertyValue::Float(v)) => {
                        layer.opacity = v.clamp(0.0, 1.0)
                    }
                    (LayerField::TintColor, PropertyValue::Color(c)) => layer.tint_color = c,
                    (LayerField::Offset, PropertyValue::PointF(p)) => layer.offset = p,
                    (LayerField::ParallaxFactor, PropertyValue::PointF(p)) => {
                        layer.parallax_factor = p
                    }
                    (_, other) => return Err(invalid(&other)),
                }
            }
            (Field::Item(f), value, EntityData::Item(item)) => match (f, value) {
                (ItemField::Visible, PropertyValue::Bool(b)) => item.visible = b,
                (ItemField::Position, PropertyValue::PointF(p)) => {
                    item.bounds = item.bounds.with_origin(p)
                }
                (ItemField::Geometry, PropertyValue::RectF(r)) => item.bounds = r,
                (ItemField::Rotation, PropertyValue::Float(v)) => item.rotation = v,
                (_, other) => return Err(invalid(&other)),
            },
            (Field::Tile(f), value, EntityData::Tile(tile)) => match (f, value) {
                (TileField::Probability, PropertyValue::Float(v)) => tile.probability = v,
                (TileField::Image, PropertyValue::FilePath(path)) => tile.image = path,
                (TileField::ImageRect, PropertyValue::Rect(r)) => tile.image_rect = r,
                (_, other) => return Err(invalid(&other)),
            },
            (
                Field::Class(ClassField::Color),
                PropertyValue::Color(c),
                EntityData::ClassCatalogEntry(class),
            ) => class.color = c,
            (Field::PatternSet(f), value, EntityData::PatternSet(set)) => match (f, value) {
                (PatternSetField::PatternType, PropertyValue::String(name)) => {
                    set.pattern_type = PatternType::from_name(&name).ok_or(
                        FieldError::InvalidValue {
                            field,
                            value: name.clone(),
                        },
                    )?
                }
                (PatternSetField::ColorCount, PropertyValue::Int(count)) => {
                    set.color_count = count.max(0)
                }
                (_, other) => return Err(invalid(&other)),
            },
            (Field::PatternColor(f), value, EntityData::PatternColor(color)) => {
                match (f, value) {
                    (PatternColorField::Color, PropertyValue::Color(c)) => color.color = c,
                    (PatternColorField::Probability, PropertyValue::Float(v)) => {
                        color.probability = v
                    }
                    (_, other) => return Err(invalid(&other)),
                }
            }
            (_, other, _) => return Err(invalid(&other)),
        }
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_entity() -> Entity {
        Entity::new(
            EntityId::new(1),
            "Ground",
            EntityData::Container(LayerData::default()),
        )
    }

    #[test]
    fn fields_are_read_per_kind() {
        let layer = layer_entity();
        assert_eq!(layer.kind(), EntityKind::Container);
        assert_eq!(
            layer.field(Field::Layer(LayerField::Visible)),
            Some(PropertyValue::Bool(true))
        );
        assert_eq!(layer.field(Field::Layer(LayerField::Color)), None);
        assert_eq!(layer.field(Field::Item(ItemField::Rotation)), None);
        assert_eq!(
            layer.field(Field::Name),
            Some(PropertyValue::String("Ground".into()))
        );
    }

    #[test]
    fn field_names_parse_back() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>(), Ok(field));
        }
        assert!("layer.alpha".parse::<Field>().is_err());
    }

    #[test]
    fn set_field_returns_previous_value() {
        let mut layer = layer_entity();
        let old = layer
            .set_field(
                Field::Layer(LayerField::Offset),
                PropertyValue::PointF(PointF::new(4.0, 5.0)),
            )
            .expect("offset is a layer field");
        assert_eq!(old, PropertyValue::PointF(PointF::default()));
        assert_eq!(layer.layer().map(|l| l.offset), Some(PointF::new(4.0, 5.0)));
    }

    #[test]
    fn set_field_rejects_wrong_kind_and_type() {
        let mut layer = layer_entity();
        let err = layer
            .set_field(Field::Item(ItemField::Rotation), PropertyValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, FieldError::NotApplicable { .. }));

        let err = layer
            .set_field(Field::Layer(LayerField::Opacity), PropertyValue::Int(1))
            .unwrap_err();
        assert!(matches!(err, FieldError::TypeMismatch { .. }));
    }

    #[test]
    fn item_position_moves_geometry_origin() {
        let mut item = Entity::new(
            EntityId::new(2),
            "Chest",
            EntityData::Item(ItemData {
                visible: true,
                bounds: RectF::new(0.0, 0.0, 16.0, 16.0),
                rotation: 0.0,
                group: None,
                tile: None,
                template: None,
            }),
        );
        item.set_field(
            Field::Item(ItemField::Position),
            PropertyValue::PointF(PointF::new(32.0, 48.0)),
        )
        .expect("items have a position");
        assert_eq!(
            item.field(Field::Item(ItemField::Geometry)),
            Some(PropertyValue::RectF(RectF::new(32.0, 48.0, 16.0, 16.0)))
        );
    }

    #[test]
    fn pattern_type_is_validated() {
        let mut set = Entity::new(
            EntityId::new(3),
            "Terrain",
            EntityData::PatternSet(PatternSetData {
                pattern_type: PatternType::Corner,
                color_count: 2,
                image_tile: None,
            }),
        );
        let field = Field::PatternSet(PatternSetField::PatternType);
        assert!(set.set_field(field, PropertyValue::from("edge")).is_ok());
        assert!(matches!(
            set.set_field(field, PropertyValue::from("diagonal")),
            Err(FieldError::InvalidValue { .. })
        ));
    }

    #[test]
    fn class_definitions_filter_by_kind() {
        let class = ClassDefinition {
            members: PropertySet::new(),
            use_as: KindMask::ITEM | KindMask::TILE,
            color: Color::BLACK,
        };
        assert!(class.is_class_for(EntityKind::Item));
        assert!(!class.is_class_for(EntityKind::Container));
    }
}
