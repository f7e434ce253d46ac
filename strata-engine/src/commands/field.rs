use std::any::Any;

use strata_core::entity::{EntityId, Field};
use strata_core::graph::EntityGraph;
use strata_core::value::{Component, PropertyValue};
use tracing::debug;

use crate::command::Command;
use crate::event::{ChangeEvent, ChangeKind};

/// 在一组实体上写入同一个内建字段，只产生一次事件。
///
/// 不具备该字段的实体会被跳过。
#[derive(Debug)]
pub struct SetField {
    description: String,
    field: Field,
    targets: Vec<EntityId>,
    value: PropertyValue,
    continuous: bool,
    previous: Vec<(EntityId, PropertyValue)>,
    /// 写入后实际保存的值，可能经过钳制。
    stored: Vec<(EntityId, PropertyValue)>,
}

impl SetField {
    pub fn new(targets: Vec<EntityId>, field: Field, value: PropertyValue) -> Self {
        Self {
            description: format!("Change {field:?}"),
            field,
            targets,
            value,
            continuous: false,
            previous: Vec::new(),
            stored: Vec::new(),
        }
    }

    /// 标记为连续编辑，例如拖动透明度滑块。
    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    fn event(&self, ids: Vec<EntityId>) -> Vec<ChangeEvent> {
        if ids.is_empty() {
            return Vec::new();
        }
        vec![ChangeEvent::new(ChangeKind::for_field(self.field), ids)]
    }
}

impl Command for SetField {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.previous.clear();
        self.stored.clear();
        for &id in &self.targets {
            let Some(entity) = graph.entity_mut(id) else {
                continue;
            };
            match entity.set_field(self.field, self.value.clone()) {
                Ok(old) => {
                    self.previous.push((id, old));
                    if let Some(stored) = entity.field(self.field) {
                        self.stored.push((id, stored));
                    }
                }
                Err(err) => debug!(entity = id.get(), error = %err, "跳过不适用的字段"),
            }
        }
        self.event(self.previous.iter().map(|(id, _)| *id).collect())
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let mut restored = Vec::new();
        for (id, old) in self.previous.iter().rev() {
            let Some(entity) = graph.entity_mut(*id) else {
                continue;
            };
            if entity.set_field(self.field, old.clone()).is_ok() {
                restored.push(*id);
            }
        }
        restored.reverse();
        self.event(restored)
    }

    fn mergeable_with(&self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<SetField>() else {
            return false;
        };
        self.continuous
            && other.continuous
            && self.field == other.field
            && self.targets == other.targets
    }

    fn merge(&mut self, other: &dyn Command) {
        if let Some(other) = other.as_any().downcast_ref::<SetField>() {
            self.value = other.value.clone();
            self.stored = other.stored.clone();
        }
    }

    fn is_obsolete(&self) -> bool {
        self.previous.iter().all(|(id, old)| {
            self.stored
                .iter()
                .find(|(stored_id, _)| stored_id == id)
                .is_none_or(|(_, stored)| stored == old)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 只修改复合字段的部分分量。
///
/// 撤销时只恢复被修改的分量，其余分量保持撤销时刻的最新值。
#[derive(Debug)]
pub struct SetFieldComponents {
    description: String,
    field: Field,
    targets: Vec<EntityId>,
    components: Vec<(Component, f64)>,
    previous: Vec<(EntityId, Vec<(Component, f64)>)>,
}

impl SetFieldComponents {
    pub fn new(targets: Vec<EntityId>, field: Field, components: Vec<(Component, f64)>) -> Self {
        Self {
            description: format!("Change {field:?}"),
            field,
            targets,
            components,
            previous: Vec::new(),
        }
    }

    fn write(
        graph: &mut EntityGraph,
        id: EntityId,
        field: Field,
        components: &[(Component, f64)],
    ) -> Option<Vec<(Component, f64)>> {
        let entity = graph.entity_mut(id)?;
        let current = entity.field(field)?;
        let mut old = Vec::with_capacity(components.len());
        let mut updated = current.clone();
        for &(component, value) in components {
            old.push((component, current.component(component)?));
            updated = updated.with_component(component, value)?;
        }
        entity.set_field(field, updated).ok()?;
        Some(old)
    }

    fn event(&self, ids: Vec<EntityId>) -> Vec<ChangeEvent> {
        if ids.is_empty() {
            return Vec::new();
        }
        vec![ChangeEvent::new(ChangeKind::for_field(self.field), ids)]
    }
}

impl Command for SetFieldComponents {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.previous.clear();
        for &id in &self.targets {
            match Self::write(graph, id, self.field, &self.components) {
                Some(old) => self.previous.push((id, old)),
                None => debug!(entity = id.get(), field = ?self.field, "跳过不适用的分量"),
            }
        }
        self.event(self.previous.iter().map(|(id, _)| *id).collect())
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let mut restored = Vec::new();
        for (id, old) in self.previous.iter().rev() {
            if Self::write(graph, *id, self.field, old).is_some() {
                restored.push(*id);
            }
        }
        restored.reverse();
        self.event(restored)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use strata_core::entity::{ItemField, LayerField};
    use strata_core::geometry::{PointF, RectF};

    use super::*;
    use crate::event::LayerFields;

    fn offset(graph: &EntityGraph, id: EntityId) -> Option<PropertyValue> {
        graph.entity(id)?.field(Field::Layer(LayerField::Offset))
    }

    #[test]
    fn one_event_lists_every_target() {
        let mut graph = EntityGraph::new();
        let ids: Vec<EntityId> = (0..3)
            .map(|i| graph.add_container(format!("L{i}"), None))
            .collect();
        let mut command = SetField::new(
            ids.clone(),
            Field::Layer(LayerField::Visible),
            PropertyValue::Bool(false),
        );
        let events = command.apply(&mut graph);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].affected(), ids.as_slice());
        assert_eq!(
            events[0].kind(),
            &ChangeKind::LayersChanged(LayerFields::VISIBLE)
        );

        command.revert(&mut graph);
        for id in ids {
            assert_eq!(
                graph.entity(id).and_then(|e| e.field(Field::Layer(LayerField::Visible))),
                Some(PropertyValue::Bool(true))
            );
        }
    }

    #[test]
    fn entities_without_the_field_are_skipped() {
        let mut graph = EntityGraph::new();
        let layer = graph.add_container("L", None);
        let item = graph.add_item("I", None, RectF::new(0.0, 0.0, 1.0, 1.0));
        let mut command = SetField::new(
            vec![item, layer],
            Field::Layer(LayerField::Opacity),
            PropertyValue::Float(0.5),
        );
        let events = command.apply(&mut graph);
        assert_eq!(events[0].affected(), &[layer]);
    }

    #[test]
    fn reverting_one_axis_keeps_the_other_axis_current() {
        let mut graph = EntityGraph::new();
        let layer = graph.add_container("L", None);

        let mut set_x = SetFieldComponents::new(
            vec![layer],
            Field::Layer(LayerField::Offset),
            vec![(Component::X, 10.0)],
        );
        set_x.apply(&mut graph);
        let mut set_y = SetFieldComponents::new(
            vec![layer],
            Field::Layer(LayerField::Offset),
            vec![(Component::Y, 20.0)],
        );
        set_y.apply(&mut graph);
        assert_eq!(
            offset(&graph, layer),
            Some(PropertyValue::PointF(PointF::new(10.0, 20.0)))
        );

        set_x.revert(&mut graph);
        assert_eq!(
            offset(&graph, layer),
            Some(PropertyValue::PointF(PointF::new(0.0, 20.0)))
        );
    }

    #[test]
    fn item_position_components_move_the_item() {
        let mut graph = EntityGraph::new();
        let item = graph.add_item("I", None, RectF::new(1.0, 2.0, 8.0, 8.0));
        let mut command = SetFieldComponents::new(
            vec![item],
            Field::Item(ItemField::Position),
            vec![(Component::Y, 40.0)],
        );
        command.apply(&mut graph);
        assert_eq!(
            graph.entity(item).and_then(|e| e.field(Field::Item(ItemField::Geometry))),
            Some(PropertyValue::RectF(RectF::new(1.0, 40.0, 8.0, 8.0)))
        );
        command.revert(&mut graph);
        assert_eq!(
            graph.entity(item).and_then(|e| e.field(Field::Item(ItemField::Position))),
            Some(PropertyValue::PointF(PointF::new(1.0, 2.0)))
        );
    }

    #[test]
    fn continuous_field_edits_merge() {
        let mut graph = EntityGraph::new();
        let layer = graph.add_container("L", None);
        let field = Field::Layer(LayerField::Opacity);
        let mut first = SetField::new(vec![layer], field, PropertyValue::Float(0.8)).continuous();
        first.apply(&mut graph);
        let mut second = SetField::new(vec![layer], field, PropertyValue::Float(0.4)).continuous();
        second.apply(&mut graph);

        assert!(first.mergeable_with(&second));
        first.merge(&second);
        assert!(!first.is_obsolete());

        first.revert(&mut graph);
        assert_eq!(
            graph.entity(layer).and_then(|e| e.field(field)),
            Some(PropertyValue::Float(1.0))
        );
    }

    #[test]
    fn clamped_values_count_as_unchanged() {
        let mut graph = EntityGraph::new();
        let layer = graph.add_container("L", None);
        let field = Field::Layer(LayerField::Opacity);
        let mut first = SetField::new(vec![layer], field, PropertyValue::Float(0.8)).continuous();
        first.apply(&mut graph);
        let mut second = SetField::new(vec![layer], field, PropertyValue::Float(1.5)).continuous();
        second.apply(&mut graph);
        assert_eq!(
            graph.entity(layer).and_then(|e| e.field(field)),
            Some(PropertyValue::Float(1.0))
        );

        first.merge(&second);
        assert!(first.is_obsolete());
    }
}
