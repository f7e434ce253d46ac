use std::any::Any;

use strata_core::entity::{Entity, EntityId};
use strata_core::graph::EntityGraph;

use crate::command::Command;
use crate::event::{ChangeEvent, ChangeKind};

/// 向实体图中添加一个实体。撤销时移除，重做时插回原位置。
#[derive(Debug)]
pub struct AddEntity {
    description: String,
    id: EntityId,
    index: Option<usize>,
    entity: Option<Entity>,
}

impl AddEntity {
    /// `entity` 的标识须事先通过 [`EntityGraph::reserve_id`] 取得。
    pub fn new(entity: Entity) -> Self {
        Self {
            description: format!("Add {}", entity.kind()),
            id: entity.id(),
            index: None,
            entity: Some(entity),
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl Command for AddEntity {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let Some(entity) = self.entity.take() else {
            return Vec::new();
        };
        let index = self.index.unwrap_or(graph.len());
        graph.insert_at(index, entity);
        vec![ChangeEvent::single(ChangeKind::EntitiesAdded, self.id)]
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let Some((index, entity)) = graph.remove(self.id) else {
            return Vec::new();
        };
        self.index = Some(index);
        self.entity = Some(entity);
        vec![ChangeEvent::single(ChangeKind::EntitiesRemoved, self.id)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 删除一组实体，撤销时按原顺序插回。
#[derive(Debug)]
pub struct RemoveEntities {
    description: String,
    targets: Vec<EntityId>,
    removed: Vec<(usize, Entity)>,
}

impl RemoveEntities {
    pub fn new(targets: Vec<EntityId>) -> Self {
        Self {
            description: "Remove Objects".to_string(),
            targets,
            removed: Vec::new(),
        }
    }
}

impl Command for RemoveEntities {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.removed.clear();
        for &id in &self.targets {
            if let Some(removed) = graph.remove(id) {
                self.removed.push(removed);
            }
        }
        if self.removed.is_empty() {
            return Vec::new();
        }
        vec![ChangeEvent::new(
            ChangeKind::EntitiesRemoved,
            self.removed.iter().map(|(_, entity)| entity.id()),
        )]
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        let mut restored = Vec::with_capacity(self.removed.len());
        for (index, entity) in self.removed.drain(..).rev() {
            restored.push(entity.id());
            graph.insert_at(index, entity);
        }
        if restored.is_empty() {
            return Vec::new();
        }
        restored.reverse();
        vec![ChangeEvent::new(ChangeKind::EntitiesAdded, restored)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
