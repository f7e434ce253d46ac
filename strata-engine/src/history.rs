//! 撤销栈。
//!
//! `cursor` 把条目分为“已执行”与“已撤销”两段，始终满足 `0 <= cursor <= len`。
//! 宏录制期间推入的命令立即执行，但事件缓存到最外层宏关闭时一并返回。
//! 宏可以嵌套，内层宏关闭后作为一个成员并入外层宏。

use strata_core::graph::EntityGraph;
use tracing::{debug, error};

use crate::command::{Command, MacroCommand};
use crate::errors::HistoryError;
use crate::event::ChangeEvent;

/// 撤销栈的可观察状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Clean,
    Dirty,
    PartiallyUndone,
    FullyUndone,
    RecordingMacro,
}

#[derive(Debug)]
pub struct CommandHistory {
    entries: Vec<Box<dyn Command>>,
    cursor: usize,
    clean_index: Option<usize>,
    undo_limit: usize,
    merge_enabled: bool,
    open_macros: Vec<MacroCommand>,
    macro_events: Vec<ChangeEvent>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            clean_index: Some(0),
            undo_limit: 0,
            merge_enabled: true,
            open_macros: Vec::new(),
            macro_events: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.open_macros.is_empty() && self.cursor > 0
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.open_macros.is_empty() && self.cursor < self.entries.len()
    }

    pub fn undo_text(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .map(|entry| entry.description())
    }

    pub fn redo_text(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|entry| entry.description())
    }

    #[inline]
    pub fn is_recording_macro(&self) -> bool {
        !self.open_macros.is_empty()
    }

    /// 当前打开的宏层数。
    #[inline]
    pub fn macro_depth(&self) -> usize {
        self.open_macros.len()
    }

    pub fn state(&self) -> HistoryState {
        if self.is_recording_macro() {
            HistoryState::RecordingMacro
        } else if self.cursor == 0 && !self.entries.is_empty() {
            HistoryState::FullyUndone
        } else if self.cursor < self.entries.len() {
            HistoryState::PartiallyUndone
        } else if self.clean_index == Some(self.cursor) {
            HistoryState::Clean
        } else {
            HistoryState::Dirty
        }
    }

    /// 记录保存点。
    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.cursor);
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.open_macros.is_empty() && self.clean_index == Some(self.cursor)
    }

    /// 设置条目上限，0 表示不限。超出时丢弃最旧的条目。
    pub fn set_undo_limit(&mut self, limit: usize) {
        self.undo_limit = limit;
        self.enforce_limit();
    }

    #[inline]
    pub fn undo_limit(&self) -> usize {
        self.undo_limit
    }

    pub fn set_merge_enabled(&mut self, enabled: bool) {
        self.merge_enabled = enabled;
    }

    /// 执行命令并记入历史，返回产生的事件。
    ///
    /// 录制宏时命令并入宏中，返回空事件列表。
    pub fn push(
        &mut self,
        graph: &mut EntityGraph,
        mut command: Box<dyn Command>,
    ) -> Vec<ChangeEvent> {
        let events = command.apply(graph);

        if let Some(open) = self.open_macros.last_mut() {
            debug!(command = command.description(), depth = open.len() + 1, "命令并入宏");
            open.push_applied(command);
            self.macro_events.extend(events);
            return Vec::new();
        }

        self.truncate_redo();

        if self.try_merge(command.as_ref()) {
            return events;
        }

        debug!(
            command = command.description(),
            cursor = self.cursor + 1,
            "命令已入栈"
        );
        self.entries.push(command);
        self.cursor += 1;
        self.enforce_limit();
        events
    }

    /// 撤销最近一条已执行的条目。
    pub fn undo(&mut self, graph: &mut EntityGraph) -> Result<Vec<ChangeEvent>, HistoryError> {
        self.ensure_no_macro("undo")?;
        if self.cursor == 0 {
            error!(len = self.entries.len(), "没有可撤销的命令");
            return Err(HistoryError::NothingToUndo);
        }
        self.cursor -= 1;
        let entry = &mut self.entries[self.cursor];
        debug!(command = entry.description(), cursor = self.cursor, "撤销");
        Ok(entry.revert(graph))
    }

    /// 重做游标处的条目。
    pub fn redo(&mut self, graph: &mut EntityGraph) -> Result<Vec<ChangeEvent>, HistoryError> {
        self.ensure_no_macro("redo")?;
        let len = self.entries.len();
        let Some(entry) = self.entries.get_mut(self.cursor) else {
            error!(len, "没有可重做的命令");
            return Err(HistoryError::NothingToRedo);
        };
        let events = entry.apply(graph);
        self.cursor += 1;
        debug!(cursor = self.cursor, "重做");
        Ok(events)
    }

    /// 开始录制宏。已有宏打开时新宏嵌套在其中。
    pub fn begin_macro(&mut self, description: impl Into<String>) {
        let description = description.into();
        debug!(
            description = %description,
            depth = self.open_macros.len() + 1,
            "开始录制宏"
        );
        self.open_macros.push(MacroCommand::new(description));
    }

    /// 关闭最内层的宏。
    ///
    /// 内层宏并入外层宏，返回空事件列表；最外层宏作为单个条目入栈，
    /// 返回整个录制期间缓存的事件。空宏直接丢弃。
    pub fn end_macro(&mut self) -> Result<Vec<ChangeEvent>, HistoryError> {
        let Some(finished) = self.open_macros.pop() else {
            error!("没有正在录制的宏");
            return Err(HistoryError::NoOpenMacro);
        };

        if let Some(parent) = self.open_macros.last_mut() {
            if finished.is_empty() {
                debug!(description = finished.description(), "空宏已丢弃");
            } else {
                debug!(
                    description = finished.description(),
                    into = parent.description(),
                    "内层宏并入外层宏"
                );
                parent.push_applied(Box::new(finished));
            }
            return Ok(Vec::new());
        }

        let events = std::mem::take(&mut self.macro_events);
        if finished.is_empty() {
            debug!(description = finished.description(), "空宏已丢弃");
            return Ok(events);
        }

        self.truncate_redo();
        debug!(
            description = finished.description(),
            commands = finished.len(),
            cursor = self.cursor + 1,
            "宏已入栈"
        );
        self.entries.push(Box::new(finished));
        self.cursor += 1;
        self.enforce_limit();
        Ok(events)
    }

    /// 清空历史。录制宏期间不允许清空。
    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.ensure_no_macro("clear")?;
        self.entries.clear();
        self.cursor = 0;
        self.clean_index = Some(0);
        debug!("历史已清空");
        Ok(())
    }

    fn ensure_no_macro(&self, operation: &'static str) -> Result<(), HistoryError> {
        if self.is_recording_macro() {
            error!(operation, "宏录制期间不能执行该操作");
            return Err(HistoryError::MacroOpen);
        }
        Ok(())
    }

    fn truncate_redo(&mut self) {
        if self.cursor < self.entries.len() {
            debug!(
                discarded = self.entries.len() - self.cursor,
                "丢弃可重做的条目"
            );
            self.entries.truncate(self.cursor);
            if self.clean_index.is_some_and(|index| index > self.cursor) {
                self.clean_index = None;
            }
        }
    }

    /// 尝试把新命令并入栈顶。保存点上的条目不参与合并。
    fn try_merge(&mut self, command: &dyn Command) -> bool {
        if !self.merge_enabled || self.cursor == 0 || self.clean_index == Some(self.cursor) {
            return false;
        }
        let top = &mut self.entries[self.cursor - 1];
        if !top.mergeable_with(command) {
            return false;
        }
        top.merge(command);
        if top.is_obsolete() {
            debug!(command = top.description(), "合并后无净改动，条目已移除");
            self.entries.pop();
            self.cursor -= 1;
            if self.clean_index.is_some_and(|index| index > self.cursor) {
                self.clean_index = None;
            }
        } else {
            debug!(command = top.description(), "命令已合并到栈顶");
        }
        true
    }

    fn enforce_limit(&mut self) {
        if self.undo_limit == 0 || self.entries.len() <= self.undo_limit {
            return;
        }
        let excess = self.entries.len() - self.undo_limit;
        let dropped = excess.min(self.cursor);
        if dropped == 0 {
            return;
        }
        self.entries.drain(..dropped);
        self.cursor -= dropped;
        self.clean_index = self.clean_index.and_then(|index| index.checked_sub(dropped));
        debug!(dropped, limit = self.undo_limit, "超出撤销上限，丢弃最旧的条目");
    }
}

#[cfg(test)]
mod tests {
    use strata_core::entity::{EntityId, Field, LayerField};
    use strata_core::value::PropertyValue;

    use super::*;
    use crate::commands::{SetField, SetProperty};

    fn layer_graph() -> (EntityGraph, EntityId) {
        let mut graph = EntityGraph::new();
        let layer = graph.add_container("L", None);
        (graph, layer)
    }

    fn set_hp(layer: EntityId, hp: i64) -> Box<dyn Command> {
        Box::new(SetProperty::new(vec![layer], "hp", PropertyValue::Int(hp)))
    }

    fn hp(graph: &EntityGraph, layer: EntityId) -> Option<PropertyValue> {
        graph.entity(layer)?.properties.get("hp").cloned()
    }

    #[test]
    fn state_machine_follows_cursor() {
        let (mut graph, layer) = layer_graph();
        let mut history = CommandHistory::new();
        assert_eq!(history.state(), HistoryState::Clean);

        history.push(&mut graph, set_hp(layer, 1));
        history.push(&mut graph, set_hp(layer, 2));
        assert_eq!(history.state(), HistoryState::Dirty);

        history.undo(&mut graph).expect("undo");
        assert_eq!(history.state(), HistoryState::PartiallyUndone);
        history.undo(&mut graph).expect("undo");
        assert_eq!(history.state(), HistoryState::FullyUndone);
        assert_eq!(history.undo(&mut graph), Err(HistoryError::NothingToUndo));

        history.redo(&mut graph).expect("redo");
        history.redo(&mut graph).expect("redo");
        assert_eq!(history.redo(&mut graph), Err(HistoryError::NothingToRedo));
        history.set_clean();
        assert_eq!(history.state(), HistoryState::Clean);
        assert!(history.is_clean());
    }

    #[test]
    fn pushing_after_undo_truncates_redo() {
        let (mut graph, layer) = layer_graph();
        let mut history = CommandHistory::new();
        history.push(&mut graph, set_hp(layer, 1));
        history.push(&mut graph, set_hp(layer, 2));
        history.undo(&mut graph).expect("undo");

        history.push(&mut graph, set_hp(layer, 3));
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 2);
        assert!(!history.can_redo());
        assert_eq!(hp(&graph, layer), Some(PropertyValue::Int(3)));
    }

    #[test]
    fn macro_is_one_entry_and_buffers_events() {
        let (mut graph, layer) = layer_graph();
        let mut history = CommandHistory::new();
        history.begin_macro("Edit");
        assert_eq!(history.state(), HistoryState::RecordingMacro);

        assert!(history.push(&mut graph, set_hp(layer, 1)).is_empty());
        assert!(history.push(&mut graph, set_hp(layer, 2)).is_empty());
        assert_eq!(history.undo(&mut graph), Err(HistoryError::MacroOpen));

        let events = history.end_macro().expect("end");
        assert_eq!(events.len(), 2);
        assert_eq!(history.len(), 1);
        assert_eq!(history.undo_text(), Some("Edit"));

        history.undo(&mut graph).expect("undo macro");
        assert_eq!(hp(&graph, layer), None);
    }

    #[test]
    fn empty_macro_is_a_no_op() {
        let mut history = CommandHistory::new();
        history.begin_macro("Nothing");
        history.begin_macro("Inner");
        assert!(history.end_macro().expect("end inner").is_empty());
        assert!(history.end_macro().expect("end").is_empty());
        assert!(history.is_empty());
        assert_eq!(history.end_macro(), Err(HistoryError::NoOpenMacro));
    }

    #[test]
    fn nested_macro_folds_into_outer_entry() {
        let (mut graph, layer) = layer_graph();
        let mut history = CommandHistory::new();
        history.begin_macro("Outer");
        history.push(&mut graph, set_hp(layer, 1));
        history.begin_macro("Inner");
        assert_eq!(history.macro_depth(), 2);
        history.push(&mut graph, set_hp(layer, 2));

        assert!(history.end_macro().expect("end inner").is_empty());
        assert!(history.is_empty());
        assert!(history.is_recording_macro());
        assert_eq!(hp(&graph, layer), Some(PropertyValue::Int(2)));

        let events = history.end_macro().expect("end outer");
        assert_eq!(events.len(), 2);
        assert_eq!(history.len(), 1);
        assert_eq!(history.undo_text(), Some("Outer"));
        assert_eq!(history.end_macro(), Err(HistoryError::NoOpenMacro));

        history.undo(&mut graph).expect("undo");
        assert_eq!(hp(&graph, layer), None);
        history.redo(&mut graph).expect("redo");
        assert_eq!(hp(&graph, layer), Some(PropertyValue::Int(2)));
    }

    #[test]
    fn coalesced_edits_undo_as_a_whole() {
        let (mut graph, layer) = layer_graph();
        let field = Field::Layer(LayerField::Opacity);
        let mut history = CommandHistory::new();
        for value in [0.9, 0.7, 0.5] {
            history.push(
                &mut graph,
                Box::new(SetField::new(vec![layer], field, PropertyValue::Float(value)).continuous()),
            );
        }
        assert_eq!(history.len(), 1);

        history.undo(&mut graph).expect("undo");
        assert_eq!(
            graph.entity(layer).and_then(|e| e.field(field)),
            Some(PropertyValue::Float(1.0))
        );
    }

    #[test]
    fn drag_back_to_the_clamped_start_leaves_no_entry() {
        let (mut graph, layer) = layer_graph();
        let field = Field::Layer(LayerField::Opacity);
        let mut history = CommandHistory::new();
        for value in [0.8, 1.5] {
            history.push(
                &mut graph,
                Box::new(SetField::new(vec![layer], field, PropertyValue::Float(value)).continuous()),
            );
        }
        assert!(history.is_empty());
        assert!(history.is_clean());
        assert_eq!(
            graph.entity(layer).and_then(|e| e.field(field)),
            Some(PropertyValue::Float(1.0))
        );
    }

    #[test]
    fn merging_can_be_disabled() {
        let (mut graph, layer) = layer_graph();
        let field = Field::Layer(LayerField::Opacity);
        let mut history = CommandHistory::new();
        history.set_merge_enabled(false);
        for value in [0.9, 0.7] {
            history.push(
                &mut graph,
                Box::new(SetField::new(vec![layer], field, PropertyValue::Float(value)).continuous()),
            );
        }
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn undo_limit_drops_oldest_entries() {
        let (mut graph, layer) = layer_graph();
        let mut history = CommandHistory::new();
        history.set_undo_limit(2);
        for value in 1..=4 {
            history.push(&mut graph, set_hp(layer, value));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 2);
        history.undo(&mut graph).expect("undo");
        history.undo(&mut graph).expect("undo");
        assert!(!history.can_undo());
        assert_eq!(hp(&graph, layer), Some(PropertyValue::Int(2)));
        assert!(!history.is_clean());
    }
}
