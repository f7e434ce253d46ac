use std::any::Any;

use strata_core::entity::EntityId;
use strata_core::graph::EntityGraph;
use strata_core::properties::PropertySet;
use strata_core::resolver::InheritanceResolver;
use strata_core::value::PropertyValue;
use tracing::debug;

use crate::command::Command;
use crate::event::{ChangeEvent, ChangeKind};

/// 在一组实体上写入同一个自定义属性。
///
/// 路径长度大于 1 时修改类属性中的成员：以各实体解析出的顶层值为基础，
/// 继承而来的类值会在写入时变成实体自身的覆盖值。
#[derive(Debug)]
pub struct SetProperty {
    description: String,
    targets: Vec<EntityId>,
    path: Vec<String>,
    value: PropertyValue,
    continuous: bool,
    previous: Vec<(EntityId, Option<PropertyValue>)>,
    applied: Vec<(EntityId, PropertyValue)>,
}

impl SetProperty {
    pub fn new(targets: Vec<EntityId>, name: impl Into<String>, value: PropertyValue) -> Self {
        Self::member(targets, vec![name.into()], value)
    }

    /// `path` 首项为顶层属性名，其余为类成员路径。
    pub fn member(targets: Vec<EntityId>, path: Vec<String>, value: PropertyValue) -> Self {
        let name = path.first().cloned().unwrap_or_default();
        Self {
            description: format!("Set Property {name}"),
            targets,
            path,
            value,
            continuous: false,
            previous: Vec::new(),
            applied: Vec::new(),
        }
    }

    /// 标记为连续编辑，相同属性与目标的后续编辑会并入本命令。
    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    pub fn name(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    fn new_value_for(&self, graph: &EntityGraph, id: EntityId) -> Option<PropertyValue> {
        let (_, members) = self.path.split_first()?;
        if members.is_empty() {
            return Some(self.value.clone());
        }
        let base = InheritanceResolver::new(graph).resolve(id, self.name())?;
        base.with_member(members, self.value.clone())
    }

    fn grouped_events(
        &self,
        added: Vec<EntityId>,
        changed: Vec<EntityId>,
        removed: Vec<EntityId>,
    ) -> Vec<ChangeEvent> {
        let name = self.name().to_string();
        let mut events = Vec::new();
        if !removed.is_empty() {
            events.push(ChangeEvent::new(
                ChangeKind::PropertyRemoved { name: name.clone() },
                removed,
            ));
        }
        if !added.is_empty() {
            events.push(ChangeEvent::new(ChangeKind::PropertyAdded { name: name.clone() }, added));
        }
        if !changed.is_empty() {
            events.push(ChangeEvent::new(ChangeKind::PropertyValueChanged { name }, changed));
        }
        events
    }
}

impl Command for SetProperty {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let name = self.name().to_string();
        let mut added = Vec::new();
        let mut changed = Vec::new();
        self.previous.clear();
        self.applied.clear();

        for &id in &self.targets {
            let Some(value) = self.new_value_for(graph, id) else {
                debug!(entity = id.get(), property = %name, "目标无法写入该属性，跳过");
                continue;
            };
            let Some(entity) = graph.entity_mut(id) else {
                continue;
            };
            let old = entity.properties.insert(name.clone(), value.clone());
            if old.is_some() {
                changed.push(id);
            } else {
                added.push(id);
            }
            self.previous.push((id, old));
            self.applied.push((id, value));
        }
        self.grouped_events(added, changed, Vec::new())
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let name = self.name().to_string();
        let mut removed = Vec::new();
        let mut changed = Vec::new();
        for (id, old) in self.previous.iter().rev() {
            let Some(entity) = graph.entity_mut(*id) else {
                continue;
            };
            match old {
                Some(value) => {
                    entity.properties.insert(name.clone(), value.clone());
                    changed.push(*id);
                }
                None => {
                    entity.properties.remove(&name);
                    removed.push(*id);
                }
            }
        }
        removed.reverse();
        changed.reverse();
        self.grouped_events(Vec::new(), changed, removed)
    }

    fn mergeable_with(&self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<SetProperty>() else {
            return false;
        };
        self.continuous
            && other.continuous
            && self.path == other.path
            && self.targets == other.targets
    }

    fn merge(&mut self, other: &dyn Command) {
        if let Some(other) = other.as_any().downcast_ref::<SetProperty>() {
            self.value = other.value.clone();
            self.applied = other.applied.clone();
        }
    }

    fn is_obsolete(&self) -> bool {
        self.applied.iter().all(|(id, value)| {
            self.previous
                .iter()
                .any(|(prev_id, prev)| prev_id == id && prev.as_ref() == Some(value))
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 从一组实体上删除自定义属性，撤销时恢复到原位置。
#[derive(Debug)]
pub struct RemoveProperty {
    description: String,
    targets: Vec<EntityId>,
    name: String,
    removed: Vec<(EntityId, usize, PropertyValue)>,
}

impl RemoveProperty {
    pub fn new(targets: Vec<EntityId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Remove Property {name}"),
            targets,
            name,
            removed: Vec::new(),
        }
    }
}

impl Command for RemoveProperty {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.removed.clear();
        for &id in &self.targets {
            let removed = graph
                .entity_mut(id)
                .and_then(|entity| entity.properties.remove(&self.name));
            if let Some((index, value)) = removed {
                self.removed.push((id, index, value));
            }
        }
        if self.removed.is_empty() {
            return Vec::new();
        }
        vec![ChangeEvent::new(
            ChangeKind::PropertyRemoved {
                name: self.name.clone(),
            },
            self.removed.iter().map(|(id, _, _)| *id),
        )]
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let mut restored = Vec::new();
        for (id, index, value) in self.removed.iter().rev() {
            if let Some(entity) = graph.entity_mut(*id) {
                entity.properties.insert_at(*index, self.name.clone(), value.clone());
                restored.push(*id);
            }
        }
        if restored.is_empty() {
            return Vec::new();
        }
        restored.reverse();
        vec![ChangeEvent::new(
            ChangeKind::PropertyAdded {
                name: self.name.clone(),
            },
            restored,
        )]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 在一组实体上重命名属性。新名称已存在时旧条目被替换，撤销时原样恢复。
#[derive(Debug)]
pub struct RenameProperty {
    description: String,
    targets: Vec<EntityId>,
    old_name: String,
    new_name: String,
    renamed: Vec<(EntityId, Option<(usize, PropertyValue)>)>,
}

impl RenameProperty {
    pub fn new(
        targets: Vec<EntityId>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        let old_name = old_name.into();
        let new_name = new_name.into();
        Self {
            description: format!("Rename Property {old_name} to {new_name}"),
            targets,
            old_name,
            new_name,
            renamed: Vec::new(),
        }
    }

    fn events(&self, removed: &str, added: &str) -> Vec<ChangeEvent> {
        if self.renamed.is_empty() {
            return Vec::new();
        }
        let ids: Vec<EntityId> = self.renamed.iter().map(|(id, _)| *id).collect();
        vec![
            ChangeEvent::new(
                ChangeKind::PropertyRemoved {
                    name: removed.to_string(),
                },
                ids.iter().copied(),
            ),
            ChangeEvent::new(
                ChangeKind::PropertyAdded {
                    name: added.to_string(),
                },
                ids,
            ),
        ]
    }
}

impl Command for RenameProperty {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.renamed.clear();
        for &id in &self.targets {
            let Some(entity) = graph.entity_mut(id) else {
                continue;
            };
            if !entity.properties.contains(&self.old_name) {
                continue;
            }
            let displaced = entity.properties.remove(&self.new_name);
            if entity.properties.rename(&self.old_name, &self.new_name) {
                self.renamed.push((id, displaced));
            } else if let Some((index, value)) = displaced {
                entity.properties.insert_at(index, self.new_name.clone(), value);
            }
        }
        self.events(&self.old_name, &self.new_name)
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        for (id, displaced) in self.renamed.iter().rev() {
            let Some(entity) = graph.entity_mut(*id) else {
                continue;
            };
            entity.properties.rename(&self.new_name, &self.old_name);
            if let Some((index, value)) = displaced {
                entity.properties.insert_at(*index, self.new_name.clone(), value.clone());
            }
        }
        self.events(&self.new_name, &self.old_name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 整体替换一个实体的属性集。粘贴属性时每个目标对应一条。
#[derive(Debug)]
pub struct ChangeProperties {
    description: String,
    target: EntityId,
    properties: PropertySet,
}

impl ChangeProperties {
    pub fn new(description: impl Into<String>, target: EntityId, properties: PropertySet) -> Self {
        Self {
            description: description.into(),
            target,
            properties,
        }
    }

    fn swap(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        match graph.entity_mut(self.target) {
            Some(entity) => {
                std::mem::swap(&mut entity.properties, &mut self.properties);
                vec![ChangeEvent::single(ChangeKind::PropertiesChanged, self.target)]
            }
            None => Vec::new(),
        }
    }
}

impl Command for ChangeProperties {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.swap(graph)
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.swap(graph)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改一组实体的类名。
#[derive(Debug)]
pub struct ChangeClassName {
    description: String,
    targets: Vec<EntityId>,
    class_name: String,
    previous: Vec<(EntityId, String)>,
}

impl ChangeClassName {
    pub fn new(targets: Vec<EntityId>, class_name: impl Into<String>) -> Self {
        Self {
            description: "Change Class".to_string(),
            targets,
            class_name: class_name.into(),
            previous: Vec::new(),
        }
    }
}

impl Command for ChangeClassName {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.previous.clear();
        for &id in &self.targets {
            if let Some(entity) = graph.entity_mut(id) {
                let old = std::mem::replace(&mut entity.class_name, self.class_name.clone());
                self.previous.push((id, old));
            }
        }
        if self.previous.is_empty() {
            return Vec::new();
        }
        vec![ChangeEvent::new(
            ChangeKind::ClassAssignmentChanged,
            self.previous.iter().map(|(id, _)| *id),
        )]
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let mut restored = Vec::new();
        for (id, old) in self.previous.iter().rev() {
            if let Some(entity) = graph.entity_mut(*id) {
                entity.class_name = old.clone();
                restored.push(*id);
            }
        }
        if restored.is_empty() {
            return Vec::new();
        }
        restored.reverse();
        vec![ChangeEvent::new(ChangeKind::ClassAssignmentChanged, restored)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use strata_core::entity::KindMask;
    use strata_core::value::ClassValue;

    use super::*;

    fn graph_with_layers(count: usize) -> (EntityGraph, Vec<EntityId>) {
        let mut graph = EntityGraph::new();
        let ids = (0..count)
            .map(|i| graph.add_container(format!("Layer {i}"), None))
            .collect();
        (graph, ids)
    }

    fn props(graph: &EntityGraph, id: EntityId) -> PropertySet {
        graph
            .entity(id)
            .map(|entity| entity.properties.clone())
            .unwrap_or_default()
    }

    #[test]
    fn set_property_groups_added_and_changed_targets() {
        let (mut graph, ids) = graph_with_layers(3);
        if let Some(entity) = graph.entity_mut(ids[1]) {
            entity.properties.insert("hp", PropertyValue::Int(1));
        }

        let mut command = SetProperty::new(ids.clone(), "hp", PropertyValue::Int(7));
        let events = command.apply(&mut graph);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), &ChangeKind::PropertyAdded { name: "hp".into() });
        assert_eq!(events[0].affected(), &[ids[0], ids[2]]);
        assert_eq!(events[1].affected(), &[ids[1]]);

        let events = command.revert(&mut graph);
        assert_eq!(events[0].kind(), &ChangeKind::PropertyRemoved { name: "hp".into() });
        assert!(props(&graph, ids[0]).is_empty());
        assert_eq!(props(&graph, ids[1]).get("hp"), Some(&PropertyValue::Int(1)));
    }

    #[test]
    fn missing_targets_are_skipped() {
        let (mut graph, ids) = graph_with_layers(1);
        let ghost = EntityId::new(404);
        let mut command = SetProperty::new(vec![ghost, ids[0]], "hp", PropertyValue::Int(3));
        let events = command.apply(&mut graph);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].affected(), &[ids[0]]);
        command.revert(&mut graph);
        assert!(props(&graph, ids[0]).is_empty());
    }

    #[test]
    fn member_edit_overrides_inherited_class_value() {
        let mut graph = EntityGraph::new();
        let stats: PropertySet = [("hp", PropertyValue::Int(10)), ("mp", PropertyValue::Int(4))]
            .into_iter()
            .collect();
        let defaults: PropertySet = [(
            "stats",
            PropertyValue::ClassRef(ClassValue::new("Stats", stats)),
        )]
        .into_iter()
        .collect();
        graph.add_class("Monster", KindMask::ITEM, defaults);
        let item = graph.add_item("orc", None, Default::default());
        if let Some(entity) = graph.entity_mut(item) {
            entity.class_name = "Monster".into();
        }

        let mut command = SetProperty::member(
            vec![item],
            vec!["stats".into(), "hp".into()],
            PropertyValue::Int(25),
        );
        let events = command.apply(&mut graph);
        assert_eq!(events[0].kind(), &ChangeKind::PropertyAdded { name: "stats".into() });

        let own = props(&graph, item);
        let stats = own.get("stats").expect("override is stored on the item");
        assert_eq!(stats.member(&["hp".into()]), Some(&PropertyValue::Int(25)));
        assert_eq!(stats.member(&["mp".into()]), Some(&PropertyValue::Int(4)));

        command.revert(&mut graph);
        assert!(props(&graph, item).is_empty());
    }

    #[test]
    fn continuous_edits_merge_and_become_obsolete_when_restored() {
        let (mut graph, ids) = graph_with_layers(1);
        if let Some(entity) = graph.entity_mut(ids[0]) {
            entity.properties.insert("speed", PropertyValue::Float(1.0));
        }
        let mut first = SetProperty::new(ids.clone(), "speed", PropertyValue::Float(2.0)).continuous();
        first.apply(&mut graph);
        let mut second = SetProperty::new(ids.clone(), "speed", PropertyValue::Float(1.0)).continuous();
        second.apply(&mut graph);

        assert!(first.mergeable_with(&second));
        first.merge(&second);
        assert!(first.is_obsolete());

        let plain = SetProperty::new(ids.clone(), "speed", PropertyValue::Float(3.0));
        assert!(!first.mergeable_with(&plain));
    }

    #[test]
    fn remove_property_restores_position() {
        let (mut graph, ids) = graph_with_layers(1);
        if let Some(entity) = graph.entity_mut(ids[0]) {
            entity.properties.insert("a", PropertyValue::Int(1));
            entity.properties.insert("b", PropertyValue::Int(2));
            entity.properties.insert("c", PropertyValue::Int(3));
        }
        let mut command = RemoveProperty::new(ids.clone(), "b");
        let events = command.apply(&mut graph);
        assert_eq!(events.len(), 1);
        command.revert(&mut graph);
        assert_eq!(
            props(&graph, ids[0]).names().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn rename_restores_displaced_property() {
        let (mut graph, ids) = graph_with_layers(1);
        if let Some(entity) = graph.entity_mut(ids[0]) {
            entity.properties.insert("a", PropertyValue::Int(1));
            entity.properties.insert("b", PropertyValue::Int(2));
            entity.properties.insert("c", PropertyValue::Int(3));
        }
        let before = props(&graph, ids[0]);

        let mut command = RenameProperty::new(ids.clone(), "a", "c");
        let events = command.apply(&mut graph);
        assert_eq!(events.len(), 2);
        let after = props(&graph, ids[0]);
        assert_eq!(after.names().collect::<Vec<_>>(), vec!["c", "b"]);
        assert_eq!(after.get("c"), Some(&PropertyValue::Int(1)));

        command.revert(&mut graph);
        let restored = props(&graph, ids[0]);
        assert_eq!(restored, before);
        assert_eq!(restored.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn class_name_change_is_reverted_per_entity() {
        let (mut graph, ids) = graph_with_layers(2);
        if let Some(entity) = graph.entity_mut(ids[0]) {
            entity.class_name = "Old".into();
        }
        let mut command = ChangeClassName::new(ids.clone(), "New");
        let events = command.apply(&mut graph);
        assert_eq!(events[0].affected(), ids.as_slice());
        command.revert(&mut graph);
        assert_eq!(graph.entity(ids[0]).map(|e| e.class_name.as_str()), Some("Old"));
        assert_eq!(graph.entity(ids[1]).map(|e| e.class_name.as_str()), Some(""));
    }
}
