//! 观察者用于判断事件是否需要刷新当前视图的辅助函数。

use strata_core::entity::EntityId;

use crate::document::Document;

/// 实体的属性是否与当前视图相关：它是主对象、主对象引用的图块，或共同选中的对象。
pub fn objects_relevant(document: &Document, id: EntityId) -> bool {
    let Some(current) = document.current_object() else {
        return false;
    };
    if current == id {
        return true;
    }
    let graph = document.graph();
    let tile = graph
        .entity(current)
        .and_then(|entity| document.resolver().tile_of(entity))
        .map(|tile| tile.id());
    tile == Some(id) || document.selection().contains(id)
}

/// `changed` 上名为 `name` 的属性变化是否影响 `current` 显示的值。
///
/// 变化发生在主对象本身时总是受影响；发生在其模板或图块上时，只有主对象自身未定义该属性才会受影响。
pub fn property_value_affected(
    document: &Document,
    current: Option<EntityId>,
    changed: EntityId,
    name: &str,
) -> bool {
    let Some(current) = current else {
        return false;
    };
    if current == changed {
        return true;
    }
    let graph = document.graph();
    let Some(entity) = graph.entity(current) else {
        return false;
    };
    if entity.properties.contains(name) {
        return false;
    }
    let resolver = document.resolver();
    let from_tile = resolver.tile_of(entity).map(|tile| tile.id()) == Some(changed);
    let from_template = entity.as_item().and_then(|item| item.template) == Some(changed);
    from_tile || from_template
}
