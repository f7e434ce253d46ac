use std::any::Any;
use std::fmt;

use strata_core::graph::EntityGraph;

use crate::event::ChangeEvent;

/// 可逆的修改单元。
///
/// `revert` 必须完整恢复 `apply` 之前可见的状态。命令只通过标识引用实体，
/// 执行时发现实体已不存在则跳过该实体，其余实体照常完成。
pub trait Command: fmt::Debug {
    fn description(&self) -> &str;

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent>;

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent>;

    /// 连续编辑（例如拖动滑块）可以并入栈顶命令。
    fn mergeable_with(&self, _other: &dyn Command) -> bool {
        false
    }

    /// 吸收 `other` 的效果。`other` 已经执行过，合并后撤销本命令会回退两者的全部改动。
    fn merge(&mut self, _other: &dyn Command) {}

    /// 合并后净效果为空时返回 `true`，历史记录会丢弃该条目。
    fn is_obsolete(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// 按顺序执行、逆序撤销的一组命令，在历史中只占一个条目。
#[derive(Debug, Default)]
pub struct MacroCommand {
    description: String,
    commands: Vec<Box<dyn Command>>,
}

impl MacroCommand {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    /// 追加已经执行过的命令。
    pub(crate) fn push_applied(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for MacroCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.commands
            .iter_mut()
            .flat_map(|command| command.apply(graph))
            .collect()
    }

    fn revert(&mut self, graph: &mut EntityGraph) -> Vec<ChangeEvent> {
        self.commands
            .iter_mut()
            .rev()
            .flat_map(|command| command.revert(graph))
            .collect()
    }

    fn is_obsolete(&self) -> bool {
        self.commands.iter().all(|command| command.is_obsolete())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
