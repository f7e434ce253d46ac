//! 文档：持有实体图、撤销栈与当前选择，是外部观察者唯一的事件来源。

use std::fmt;

use strata_core::entity::{EntityId, KindMask, PatternType};
use strata_core::geometry::{Color, Rect, RectF, Size};
use strata_core::graph::EntityGraph;
use strata_core::properties::PropertySet;
use strata_core::resolver::InheritanceResolver;
use strata_core::value::{ClassValue, PropertyValue};
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::errors::{EngineError, HistoryError};
use crate::event::{ChangeEvent, ChangeKind};
use crate::history::CommandHistory;
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// 文档事件的订阅者。
///
/// 回调期间只能读取文档；尝试推入命令会被 [`DispatchContext::push`] 拒绝。
pub trait DocumentObserver {
    fn changed(&mut self, event: &ChangeEvent, context: &mut DispatchContext<'_>);

    fn selection_changed(&mut self, _selection: &Selection, _context: &mut DispatchContext<'_>) {}
}

/// 分发回调中可用的只读视图。
pub struct DispatchContext<'a> {
    graph: &'a EntityGraph,
    selection: &'a Selection,
    rejected: usize,
}

impl<'a> DispatchContext<'a> {
    fn new(graph: &'a EntityGraph, selection: &'a Selection) -> Self {
        Self {
            graph,
            selection,
            rejected: 0,
        }
    }

    #[inline]
    pub fn graph(&self) -> &'a EntityGraph {
        self.graph
    }

    #[inline]
    pub fn selection(&self) -> &'a Selection {
        self.selection
    }

    #[inline]
    pub fn resolver(&self) -> InheritanceResolver<'a> {
        InheritanceResolver::new(self.graph)
    }

    /// 分发期间推入命令总是被拒绝，命令被丢弃且没有任何效果。
    pub fn push<C: Command + 'static>(&mut self, command: C) -> Result<(), EngineError> {
        self.rejected += 1;
        warn!(command = command.description(), "分发事件期间拒绝推入命令");
        Err(EngineError::ReentrantPush)
    }

    #[inline]
    pub fn rejected_pushes(&self) -> usize {
        self.rejected
    }
}

/// 演示文档中的关键实体。
#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    pub root: EntityId,
    pub ground: EntityId,
    pub objects: EntityId,
    pub chest_tile: EntityId,
    pub door_template: EntityId,
    pub door: EntityId,
    pub chest: EntityId,
    pub orc: EntityId,
    pub terrain: EntityId,
    pub grass: EntityId,
}

pub struct Document {
    graph: EntityGraph,
    history: CommandHistory,
    selection: Selection,
    observers: Vec<(ObserverId, Box<dyn DocumentObserver>)>,
    next_observer: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("entities", &self.graph.len())
            .field("history", &self.history.len())
            .field("cursor", &self.history.cursor())
            .field("selection", &self.selection)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_graph(EntityGraph::new())
    }

    pub fn with_graph(graph: EntityGraph) -> Self {
        Self {
            graph,
            history: CommandHistory::new(),
            selection: Selection::default(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// 按配置调整撤销栈：条目上限（0 为不限）与是否合并连续编辑。
    pub fn configure_history(&mut self, undo_limit: usize, merge_edits: bool) {
        self.history.set_undo_limit(undo_limit);
        self.history.set_merge_enabled(merge_edits);
    }

    #[inline]
    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    #[inline]
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    #[inline]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[inline]
    pub fn resolver(&self) -> InheritanceResolver<'_> {
        InheritanceResolver::new(&self.graph)
    }

    #[inline]
    pub fn current_object(&self) -> Option<EntityId> {
        self.selection.current()
    }

    #[inline]
    pub fn current_objects(&self) -> &[EntityId] {
        self.selection.objects()
    }

    pub(crate) fn reserve_entity_id(&mut self) -> EntityId {
        self.graph.reserve_id()
    }

    /// 执行命令并记入历史，随后同步分发产生的事件。
    pub fn push<C: Command + 'static>(&mut self, command: C) {
        self.push_boxed(Box::new(command));
    }

    pub fn push_boxed(&mut self, command: Box<dyn Command>) {
        let events = self.history.push(&mut self.graph, command);
        self.emit(events);
    }

    pub fn undo(&mut self) -> Result<(), EngineError> {
        let events = self.history.undo(&mut self.graph)?;
        self.emit(events);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EngineError> {
        let events = self.history.redo(&mut self.graph)?;
        self.emit(events);
        Ok(())
    }

    /// 开始录制宏。可以嵌套，只有最外层宏关闭时才分发事件。
    pub fn begin_macro(&mut self, description: impl Into<String>) {
        self.history.begin_macro(description);
    }

    /// 关闭宏，并按提交顺序分发宏内缓存的事件。
    pub fn end_macro(&mut self) -> Result<(), EngineError> {
        let events = self.history.end_macro()?;
        self.emit(events);
        Ok(())
    }

    /// 记录保存点。
    pub fn mark_saved(&mut self) {
        self.history.set_clean();
    }

    pub fn set_current_object(&mut self, id: Option<EntityId>) -> Result<(), EngineError> {
        if let Some(id) = id {
            self.ensure_exists(id)?;
        }
        if self.selection.set_current(id) {
            self.notify_selection();
        }
        Ok(())
    }

    /// 替换选择集。任一标识不存在时不做修改并返回错误。
    pub fn set_current_objects(
        &mut self,
        ids: impl IntoIterator<Item = EntityId>,
    ) -> Result<(), EngineError> {
        let ids: Vec<EntityId> = ids.into_iter().collect();
        for &id in &ids {
            self.ensure_exists(id)?;
        }
        if self.selection.set_objects(ids) {
            self.notify_selection();
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selection.set_current(None) {
            self.notify_selection();
        }
    }

    pub fn subscribe(&mut self, observer: impl DocumentObserver + 'static) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.push((id, Box::new(observer)));
        debug!(observer = id.0, "观察者已注册");
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    /// 按注册顺序同步分发事件。
    pub fn dispatch(&mut self, event: &ChangeEvent) {
        let Self {
            graph,
            selection,
            observers,
            ..
        } = self;
        for (_, observer) in observers.iter_mut() {
            let mut context = DispatchContext::new(graph, selection);
            observer.changed(event, &mut context);
            if context.rejected_pushes() > 0 {
                debug!(rejected = context.rejected_pushes(), kind = ?event.kind(), "观察者的重入推入已拒绝");
            }
        }
    }

    /// 原子地替换实体图。
    ///
    /// 历史记录被清空，选择中不再存在的实体被移除。录制宏期间不允许重载。
    pub fn reload(&mut self, graph: EntityGraph) -> Result<(), EngineError> {
        if self.history.is_recording_macro() {
            error!("录制宏期间不能重载文档");
            return Err(HistoryError::MacroOpen.into());
        }
        self.dispatch(&ChangeEvent::document(ChangeKind::DocumentReloading));

        self.graph = graph;
        self.history.clear()?;
        let selection_changed = {
            let graph = &self.graph;
            self.selection.retain(|id| graph.contains(id))
        };
        info!(entities = self.graph.len(), "文档已重载");

        self.dispatch(&ChangeEvent::document(ChangeKind::DocumentReloaded));
        if selection_changed {
            self.notify_selection();
        }
        Ok(())
    }

    fn ensure_exists(&self, id: EntityId) -> Result<(), EngineError> {
        if self.graph.contains(id) {
            Ok(())
        } else {
            Err(EngineError::EntityNotFound(id.get()))
        }
    }

    fn emit(&mut self, events: Vec<ChangeEvent>) {
        for event in events {
            let mut selection_changed = false;
            if matches!(event.kind(), ChangeKind::EntitiesRemoved) {
                selection_changed = self.selection.retain(|id| !event.affects(id));
            }
            self.dispatch(&event);
            if selection_changed {
                self.notify_selection();
            }
        }
    }

    fn notify_selection(&mut self) {
        debug!(
            current = ?self.selection.current().map(EntityId::get),
            count = self.selection.len(),
            "选择已改变"
        );
        let Self {
            graph,
            selection,
            observers,
            ..
        } = self;
        for (_, observer) in observers.iter_mut() {
            let mut context = DispatchContext::new(graph, selection);
            observer.selection_changed(selection, &mut context);
        }
    }

    /// 构建演示文档，返回关键实体标识。
    pub fn demo() -> (Self, DemoEntities) {
        let mut graph = EntityGraph::new();
        let root = graph.add_root("Demo Map", Size::new(30, 20), Size::new(16, 16));

        let door_members: PropertySet = [
            ("locked", PropertyValue::Bool(true)),
            ("key", PropertyValue::from("")),
        ]
        .into_iter()
        .collect();
        graph.add_class("Door", KindMask::ITEM | KindMask::TILE, door_members);

        let stats: PropertySet = [
            ("hp", PropertyValue::Int(10)),
            ("speed", PropertyValue::Float(1.0)),
        ]
        .into_iter()
        .collect();
        graph.add_class("Stats", KindMask::PROPERTY_VALUE, stats.clone());
        let monster: PropertySet = [(
            "stats",
            PropertyValue::ClassRef(ClassValue::new("Stats", stats)),
        )]
        .into_iter()
        .collect();
        graph.add_class("Monster", KindMask::ITEM, monster);

        let ground = graph.add_container("Ground", None);
        let objects = graph.add_group("Objects", None, Color::rgb(0xff, 0xaa, 0x00));

        let chest_tile = graph.add_tile("chest", "tiles/chest.png", Rect::new(0, 0, 16, 16));
        if let Some(tile) = graph.entity_mut(chest_tile) {
            tile.properties.insert("loot", PropertyValue::from("gold"));
        }

        let door_template = graph.add_item(
            "Door Template",
            None,
            RectF::new(0.0, 0.0, 16.0, 32.0),
        );
        if let Some(template) = graph.entity_mut(door_template) {
            template.class_name = "Door".to_string();
            template
                .properties
                .insert("color", PropertyValue::Color(Color::rgb(0xff, 0, 0)));
        }

        let door = graph.add_item("Front Door", Some(objects), RectF::new(64.0, 32.0, 16.0, 32.0));
        graph.set_item_template(door, Some(door_template));

        let chest = graph.add_item("Chest", Some(objects), RectF::new(96.0, 48.0, 16.0, 16.0));
        graph.set_item_tile(chest, Some(chest_tile));

        let orc = graph.add_item("Orc", Some(objects), RectF::new(128.0, 64.0, 16.0, 16.0));
        if let Some(orc) = graph.entity_mut(orc) {
            orc.class_name = "Monster".to_string();
        }

        let terrain = graph.add_pattern_set("Terrain", PatternType::Corner, 2);
        let grass = graph.add_pattern_color("Grass", terrain, Color::rgb(0x40, 0xa0, 0x40));

        let ids = DemoEntities {
            root,
            ground,
            objects,
            chest_tile,
            door_template,
            door,
            chest,
            orc,
            terrain,
            grass,
        };
        debug!(
            entities = graph.len(),
            door = ids.door.get(),
            chest = ids.chest.get(),
            orc = ids.orc.get(),
            "已创建演示文档"
        );
        (Self::with_graph(graph), ids)
    }
}
