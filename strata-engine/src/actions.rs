//! 面向用户意图的属性操作。
//!
//! 所有操作都作用于文档的当前选择，并且只通过命令修改文档。输入无效时返回错误，
//! 不产生任何撤销条目。

use strata_core::entity::{Entity, EntityData, EntityId, Field, FieldError};
use strata_core::properties::{PropertySet, merge_properties};
use strata_core::value::{Component, PropertyValue, ValueKind, convert};
use tracing::{debug, info};

use crate::commands::{
    AddEntity, ChangeClassName, ChangeProperties, RemoveEntities, RemoveProperty, RenameProperty,
    SetField, SetFieldComponents, SetProperty,
};
use crate::document::Document;
use crate::errors::EngineError;

/// “转换为”菜单中提供的目标种类，按菜单顺序排列。
pub const CONVERSION_TARGETS: [ValueKind; 7] = [
    ValueKind::Bool,
    ValueKind::Color,
    ValueKind::Float,
    ValueKind::FilePath,
    ValueKind::ObjectRef,
    ValueKind::Int,
    ValueKind::String,
];

fn current(document: &Document) -> Result<EntityId, EngineError> {
    document.current_object().ok_or(EngineError::NoCurrentObject)
}

fn targets(document: &Document) -> Result<Vec<EntityId>, EngineError> {
    current(document)?;
    Ok(document.current_objects().to_vec())
}

fn own_property(
    document: &Document,
    id: EntityId,
    name: &str,
) -> Result<PropertyValue, EngineError> {
    document
        .graph()
        .entity(id)
        .and_then(|entity| entity.properties.get(name))
        .cloned()
        .ok_or_else(|| EngineError::PropertyNotFound(name.to_string()))
}

/// 为所有选中对象添加属性。主对象已拥有该属性时不做任何修改，返回 `false`。
pub fn add_property(
    document: &mut Document,
    name: &str,
    value: PropertyValue,
) -> Result<bool, EngineError> {
    if name.is_empty() {
        return Err(EngineError::EmptyPropertyName);
    }
    let id = current(document)?;
    if own_property(document, id, name).is_ok() {
        debug!(property = name, "主对象已有该属性");
        return Ok(false);
    }
    let targets = targets(document)?;
    document.push(SetProperty::new(targets, name, value));
    Ok(true)
}

pub fn set_property(
    document: &mut Document,
    name: &str,
    value: PropertyValue,
) -> Result<(), EngineError> {
    if name.is_empty() {
        return Err(EngineError::EmptyPropertyName);
    }
    let targets = targets(document)?;
    document.push(SetProperty::new(targets, name, value));
    Ok(())
}

/// 沿路径修改类属性的成员，例如 `["stats", "hp"]`。
///
/// 主对象未定义顶层属性时以继承值为基础，写入后成为自身的覆盖值。
pub fn set_property_member(
    document: &mut Document,
    path: &[String],
    value: PropertyValue,
) -> Result<(), EngineError> {
    let Some((name, members)) = path.split_first() else {
        return Err(EngineError::EmptyPropertyName);
    };
    if members.is_empty() {
        return set_property(document, name, value);
    }
    let id = current(document)?;
    let base = document
        .resolver()
        .resolve(id, name)
        .ok_or_else(|| EngineError::PropertyNotFound(name.clone()))?;
    if base.with_member(members, value.clone()).is_none() {
        return Err(EngineError::NotAClassValue(name.clone()));
    }
    let targets = targets(document)?;
    document.push(SetProperty::member(targets, path.to_vec(), value));
    Ok(())
}

/// 删除自身的属性值，使继承值重新可见。
pub fn reset_property(document: &mut Document, name: &str) -> Result<(), EngineError> {
    let targets = targets(document)?;
    document.push(RemoveProperty::new(targets, name));
    Ok(())
}

/// 在一个宏中从所有选中对象上删除这些属性。
pub fn remove_properties(document: &mut Document, names: &[String]) -> Result<(), EngineError> {
    let targets = targets(document)?;
    if names.is_empty() {
        return Ok(());
    }
    document.begin_macro(if names.len() == 1 {
        "Remove Property"
    } else {
        "Remove Properties"
    });
    for name in names {
        document.push(RemoveProperty::new(targets.clone(), name.as_str()));
    }
    document.end_macro()
}

/// 重命名属性。新名称与旧名称相同时不做修改，返回 `false`。
pub fn rename_property(
    document: &mut Document,
    old_name: &str,
    new_name: &str,
) -> Result<bool, EngineError> {
    if new_name.is_empty() {
        return Err(EngineError::EmptyPropertyName);
    }
    if new_name == old_name {
        return Ok(false);
    }
    let targets = targets(document)?;
    document.push(RenameProperty::new(targets, old_name, new_name));
    Ok(true)
}

/// 复制主对象自身的属性。任一名称不是自身属性（例如只是继承而来）时失败。
pub fn copy_properties(document: &Document, names: &[String]) -> Result<PropertySet, EngineError> {
    let id = current(document)?;
    names
        .iter()
        .map(|name| own_property(document, id, name).map(|value| (name.clone(), value)))
        .collect()
}

pub fn cut_properties(
    document: &mut Document,
    names: &[String],
) -> Result<PropertySet, EngineError> {
    let copied = copy_properties(document, names)?;
    remove_properties(document, names)?;
    Ok(copied)
}

/// 把属性追加粘贴到每个选中对象上。目标已有的名称保持不变。
///
/// 只为确实会改变的目标生成命令，全部放在一个宏中；返回被修改的目标数量。
pub fn paste_properties(document: &mut Document, pasted: &PropertySet) -> Result<usize, EngineError> {
    if pasted.is_empty() {
        return Ok(0);
    }
    let targets = targets(document)?;
    let changes: Vec<(EntityId, PropertySet)> = targets
        .into_iter()
        .filter_map(|id| {
            let own = &document.graph().entity(id)?.properties;
            let mut merged = own.clone();
            merge_properties(&mut merged, pasted);
            (merged != *own).then_some((id, merged))
        })
        .collect();
    if changes.is_empty() {
        return Ok(0);
    }

    let count = changes.len();
    document.begin_macro(if pasted.len() == 1 {
        "Paste Property"
    } else {
        "Paste Properties"
    });
    for (id, properties) in changes {
        document.push(ChangeProperties::new("Paste Properties", id, properties));
    }
    document.end_macro()?;
    info!(targets = count, properties = pasted.len(), "已粘贴属性");
    Ok(count)
}

/// 可以把这些属性转换成的种类：至少一个值的种类不同，且所有值都能转换。
pub fn convertible_kinds(
    document: &Document,
    names: &[String],
) -> Result<Vec<ValueKind>, EngineError> {
    let id = current(document)?;
    let values = names
        .iter()
        .map(|name| own_property(document, id, name))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Ok(Vec::new());
    }
    Ok(CONVERSION_TARGETS
        .into_iter()
        .filter(|&target| {
            values.iter().any(|value| value.kind() != target)
                && values.iter().all(|value| convert(value, target).is_ok())
        })
        .collect())
}

/// 把主对象上的这些属性转换为目标种类，并写入所有选中对象。
///
/// 任一值无法转换时返回错误，不推入任何命令。
pub fn convert_properties(
    document: &mut Document,
    names: &[String],
    target: ValueKind,
) -> Result<(), EngineError> {
    let id = current(document)?;
    let mut converted = Vec::with_capacity(names.len());
    for name in names {
        let value = own_property(document, id, name)?;
        converted.push((name.clone(), convert(&value, target)?));
    }
    if converted.is_empty() {
        return Ok(());
    }

    let targets = targets(document)?;
    document.begin_macro(if converted.len() == 1 {
        "Convert Property"
    } else {
        "Convert Properties"
    });
    for (name, value) in converted {
        document.push(SetProperty::new(targets.clone(), name, value));
    }
    document.end_macro()
}

/// 主对象尚未定义、但值得提示的属性：先取其他选中对象的属性，再取继承的属性。
pub fn suggested_properties(document: &Document) -> PropertySet {
    let Some(id) = document.current_object() else {
        return PropertySet::new();
    };
    let graph = document.graph();
    let mut suggested = PropertySet::new();
    for other in document.selection().others() {
        if let Some(entity) = graph.entity(other) {
            merge_properties(&mut suggested, &entity.properties);
        }
    }
    merge_properties(&mut suggested, &document.resolver().inherited_properties(id));

    if let Some(entity) = graph.entity(id) {
        suggested = suggested
            .iter()
            .filter(|(name, _)| !entity.properties.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
    }
    suggested
}

/// 可以赋给该实体的类名。
pub fn class_names_for(document: &Document, id: EntityId) -> Result<Vec<String>, EngineError> {
    let entity = document
        .graph()
        .entity(id)
        .ok_or(EngineError::EntityNotFound(id.get()))?;
    Ok(document.resolver().class_names_for(entity.kind()))
}

pub fn set_class_name(document: &mut Document, class_name: &str) -> Result<(), EngineError> {
    let targets = targets(document)?;
    document.push(ChangeClassName::new(targets, class_name));
    Ok(())
}

fn prepare_field(
    document: &Document,
    field: Field,
    value: &PropertyValue,
) -> Result<(Vec<EntityId>, PropertyValue), EngineError> {
    let targets = targets(document)?;
    let value = convert(value, field.value_kind())?;
    let graph = document.graph();
    let applicable = targets
        .iter()
        .any(|&id| graph.entity(id).is_some_and(|entity| entity.field(field).is_some()));
    if !applicable {
        let kind = graph
            .entity(current(document)?)
            .map(|entity| entity.kind())
            .ok_or(EngineError::NoCurrentObject)?;
        return Err(FieldError::NotApplicable { field, kind }.into());
    }
    Ok((targets, value))
}

/// 在所有选中对象上设置内建字段。值会先转换为字段要求的种类。
pub fn set_field(
    document: &mut Document,
    field: Field,
    value: PropertyValue,
) -> Result<(), EngineError> {
    let (targets, value) = prepare_field(document, field, &value)?;
    document.push(SetField::new(targets, field, value));
    Ok(())
}

/// 连续编辑中的一步，例如拖动滑块。相邻的连续编辑会合并为一个撤销条目。
pub fn set_field_continuous(
    document: &mut Document,
    field: Field,
    value: PropertyValue,
) -> Result<(), EngineError> {
    let (targets, value) = prepare_field(document, field, &value)?;
    document.push(SetField::new(targets, field, value).continuous());
    Ok(())
}

fn components_of(kind: ValueKind) -> &'static [Component] {
    match kind {
        ValueKind::Point | ValueKind::PointF => &[Component::X, Component::Y],
        ValueKind::Size => &[Component::Width, Component::Height],
        ValueKind::Rect | ValueKind::RectF => {
            &[Component::X, Component::Y, Component::Width, Component::Height]
        }
        _ => &[],
    }
}

/// 设置点或矩形字段，只写入与主对象当前值不同的分量。
///
/// 多选时其他对象未改变的分量保持各自的值。返回是否推入了命令。
pub fn set_composite_field(
    document: &mut Document,
    field: Field,
    value: PropertyValue,
) -> Result<bool, EngineError> {
    let id = current(document)?;
    let value = convert(&value, field.value_kind())?;
    let entity = document
        .graph()
        .entity(id)
        .ok_or(EngineError::EntityNotFound(id.get()))?;
    let existing = entity
        .field(field)
        .ok_or(FieldError::NotApplicable {
            field,
            kind: entity.kind(),
        })?;

    let changed: Vec<(Component, f64)> = components_of(field.value_kind())
        .iter()
        .filter_map(|&component| {
            let new = value.component(component)?;
            (existing.component(component) != Some(new)).then_some((component, new))
        })
        .collect();
    if changed.is_empty() {
        return Ok(false);
    }
    let targets = targets(document)?;
    document.push(SetFieldComponents::new(targets, field, changed));
    Ok(true)
}

/// 通过命令添加实体，返回新实体的标识。
pub fn add_entity(document: &mut Document, name: &str, data: EntityData) -> EntityId {
    let id = document.reserve_entity_id();
    document.push(AddEntity::new(Entity::new(id, name, data)));
    id
}

/// 删除所有选中对象，返回被删除的数量。
pub fn remove_selected(document: &mut Document) -> Result<usize, EngineError> {
    let targets = targets(document)?;
    let count = targets.len();
    document.push(RemoveEntities::new(targets));
    Ok(count)
}

#[cfg(test)]
mod tests {
    use strata_core::entity::{EntityKind, ItemField, LayerData, LayerField};
    use strata_core::geometry::{Color, PointF};

    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    fn own(document: &Document, id: EntityId) -> PropertySet {
        document
            .graph()
            .entity(id)
            .map(|entity| entity.properties.clone())
            .unwrap_or_default()
    }

    #[test]
    fn add_property_requires_a_name_and_skips_existing() {
        let (mut document, ids) = Document::demo();
        assert!(matches!(
            add_property(&mut document, "x", PropertyValue::Int(1)),
            Err(EngineError::NoCurrentObject)
        ));
        document.set_current_objects([ids.door, ids.chest]).expect("select");
        assert!(matches!(
            add_property(&mut document, "", PropertyValue::Int(1)),
            Err(EngineError::EmptyPropertyName)
        ));

        assert!(add_property(&mut document, "x", PropertyValue::Int(1)).expect("add"));
        assert!(own(&document, ids.chest).contains("x"));
        assert!(!add_property(&mut document, "x", PropertyValue::Int(2)).expect("no-op"));
        assert_eq!(document.history().len(), 1);
    }

    #[test]
    fn member_edit_uses_inherited_value() {
        let (mut document, ids) = Document::demo();
        document.set_current_object(Some(ids.orc)).expect("select");
        set_property_member(&mut document, &names(&["stats", "hp"]), PropertyValue::Int(30))
            .expect("edit member");

        let stats = own(&document, ids.orc).get("stats").cloned().expect("override");
        assert_eq!(stats.member(&names(&["hp"])), Some(&PropertyValue::Int(30)));
        assert_eq!(stats.member(&names(&["speed"])), Some(&PropertyValue::Float(1.0)));

        document.set_current_object(Some(ids.chest)).expect("select");
        assert!(matches!(
            set_property_member(&mut document, &names(&["loot", "x"]), PropertyValue::Int(1)),
            Err(EngineError::NotAClassValue(_))
        ));
    }

    #[test]
    fn rename_rejects_empty_and_identical_names() {
        let (mut document, ids) = Document::demo();
        document.set_current_object(Some(ids.door_template)).expect("select");
        assert!(matches!(
            rename_property(&mut document, "color", ""),
            Err(EngineError::EmptyPropertyName)
        ));
        assert!(!rename_property(&mut document, "color", "color").expect("no-op"));
        assert!(rename_property(&mut document, "color", "tint").expect("rename"));
        assert!(own(&document, ids.door_template).contains("tint"));
    }

    #[test]
    fn copy_only_accepts_own_properties() {
        let (mut document, ids) = Document::demo();
        document.set_current_object(Some(ids.chest)).expect("select");
        assert!(matches!(
            copy_properties(&document, &names(&["loot"])),
            Err(EngineError::PropertyNotFound(_))
        ));

        document.set_current_object(Some(ids.door_template)).expect("select");
        let copied = cut_properties(&mut document, &names(&["color"])).expect("cut");
        assert_eq!(copied.len(), 1);
        assert!(own(&document, ids.door_template).is_empty());
    }

    #[test]
    fn paste_only_touches_targets_that_change() {
        let (mut document, ids) = Document::demo();
        let pasted: PropertySet = [("x", PropertyValue::Int(2)), ("y", PropertyValue::Int(3))]
            .into_iter()
            .collect();
        document.set_current_object(Some(ids.door)).expect("select");
        set_property(&mut document, "x", PropertyValue::Int(1)).expect("set");

        document.set_current_objects([ids.door, ids.chest]).expect("select");
        let changed = paste_properties(&mut document, &pasted).expect("paste");
        assert_eq!(changed, 2);
        assert_eq!(own(&document, ids.door).get("x"), Some(&PropertyValue::Int(1)));
        assert_eq!(own(&document, ids.door).get("y"), Some(&PropertyValue::Int(3)));
        assert_eq!(own(&document, ids.chest).get("x"), Some(&PropertyValue::Int(2)));

        assert_eq!(paste_properties(&mut document, &pasted).expect("again"), 0);
        assert_eq!(document.history().len(), 2);
    }

    #[test]
    fn grouped_actions_nest_inside_an_open_macro() {
        let (mut document, ids) = Document::demo();
        let pasted: PropertySet = [("z", PropertyValue::Int(1))].into_iter().collect();
        document.set_current_object(Some(ids.door)).expect("select");

        document.begin_macro("outer");
        assert_eq!(paste_properties(&mut document, &pasted).expect("paste"), 1);
        remove_properties(&mut document, &names(&["z"])).expect("remove");
        set_property(&mut document, "w", PropertyValue::Int(2)).expect("set");
        assert!(document.history().is_empty());
        document.end_macro().expect("end");

        assert_eq!(document.history().len(), 1);
        assert_eq!(document.history().undo_text(), Some("outer"));
        assert!(!own(&document, ids.door).contains("z"));
        assert_eq!(own(&document, ids.door).get("w"), Some(&PropertyValue::Int(2)));

        document.undo().expect("undo");
        assert!(own(&document, ids.door).is_empty());
    }

    #[test]
    fn conversion_targets_require_every_value_to_convert() {
        let (mut document, ids) = Document::demo();
        document.set_current_object(Some(ids.door)).expect("select");
        set_property(&mut document, "n", PropertyValue::from("12")).expect("set");
        set_property(&mut document, "word", PropertyValue::from("twelve")).expect("set");

        let kinds = convertible_kinds(&document, &names(&["n"])).expect("kinds");
        assert_eq!(
            kinds,
            vec![
                ValueKind::Float,
                ValueKind::FilePath,
                ValueKind::ObjectRef,
                ValueKind::Int
            ]
        );
        let kinds = convertible_kinds(&document, &names(&["n", "word"])).expect("kinds");
        assert_eq!(kinds, vec![ValueKind::FilePath]);

        let pushed = document.history().len();
        assert!(matches!(
            convert_properties(&mut document, &names(&["n", "word"]), ValueKind::Int),
            Err(EngineError::Conversion(_))
        ));
        assert_eq!(document.history().len(), pushed);

        convert_properties(&mut document, &names(&["n"]), ValueKind::Int).expect("convert");
        assert_eq!(own(&document, ids.door).get("n"), Some(&PropertyValue::Int(12)));
    }

    #[test]
    fn suggestions_come_from_siblings_then_inheritance() {
        let (mut document, ids) = Document::demo();
        document.set_current_object(Some(ids.orc)).expect("select");
        set_property(&mut document, "aggro", PropertyValue::Bool(true)).expect("set");

        document.set_current_objects([ids.chest, ids.orc]).expect("select");
        let suggested = suggested_properties(&document);
        assert_eq!(suggested.names().collect::<Vec<_>>(), vec!["aggro", "loot"]);
    }

    #[test]
    fn class_names_follow_entity_kind() {
        let (document, ids) = Document::demo();
        assert_eq!(
            class_names_for(&document, ids.door).expect("names"),
            names(&["Door", "Monster"])
        );
        assert_eq!(
            class_names_for(&document, ids.chest_tile).expect("names"),
            names(&["Door"])
        );
        assert!(class_names_for(&document, ids.ground).expect("names").is_empty());
    }

    #[test]
    fn composite_field_pushes_only_changed_components() {
        let (mut document, ids) = Document::demo();
        let field = Field::Layer(LayerField::Offset);
        document.set_current_objects([ids.ground, ids.objects]).expect("select");
        set_composite_field(&mut document, field, PropertyValue::PointF(PointF::new(0.0, 8.0)))
            .expect("set y");
        assert!(
            !set_composite_field(&mut document, field, PropertyValue::PointF(PointF::new(0.0, 8.0)))
                .expect("unchanged")
        );
        assert_eq!(
            document.graph().entity(ids.objects).and_then(|e| e.field(field)),
            Some(PropertyValue::PointF(PointF::new(0.0, 8.0)))
        );
    }

    #[test]
    fn field_values_are_converted_before_pushing() {
        let (mut document, ids) = Document::demo();
        document.set_current_object(Some(ids.ground)).expect("select");
        set_field(
            &mut document,
            Field::Layer(LayerField::TintColor),
            PropertyValue::from("#ff0000"),
        )
        .expect("set tint");
        assert_eq!(
            document
                .graph()
                .entity(ids.ground)
                .and_then(|e| e.field(Field::Layer(LayerField::TintColor))),
            Some(PropertyValue::Color(Color::rgb(255, 0, 0)))
        );

        let before = document.history().len();
        assert!(matches!(
            set_field(&mut document, Field::Layer(LayerField::Opacity), PropertyValue::from("half")),
            Err(EngineError::Conversion(_))
        ));
        assert!(matches!(
            set_field(
                &mut document,
                Field::Item(ItemField::Rotation),
                PropertyValue::Float(1.0)
            ),
            Err(EngineError::Field(_))
        ));
        assert_eq!(document.history().len(), before);
    }

    #[test]
    fn entities_added_and_removed_through_history() {
        let (mut document, ids) = Document::demo();
        let layer = add_entity(
            &mut document,
            "Sky",
            EntityData::Container(LayerData::default()),
        );
        assert_eq!(
            document.graph().entity(layer).map(|e| e.kind()),
            Some(EntityKind::Container)
        );

        document.set_current_objects([layer, ids.ground]).expect("select");
        assert_eq!(remove_selected(&mut document).expect("remove"), 2);
        assert!(document.selection().is_empty());

        document.undo().expect("undo remove");
        assert!(document.graph().contains(ids.ground));
        document.undo().expect("undo add");
        assert!(!document.graph().contains(layer));
    }
}
