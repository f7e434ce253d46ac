pub mod actions;
pub mod bus;
pub mod command;
pub mod commands;
pub mod document;
pub mod event;
pub mod history;
pub mod relevance;
pub mod selection;

pub mod errors {
    use strata_core::entity::FieldError;
    use strata_core::value::ConversionError;
    use thiserror::Error;

    /// 撤销栈的前置条件错误。出现即表示调用方违反了使用约定。
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum HistoryError {
        #[error("nothing to undo")]
        NothingToUndo,
        #[error("nothing to redo")]
        NothingToRedo,
        #[error("no macro is being recorded")]
        NoOpenMacro,
        #[error("operation is not allowed while a macro is being recorded")]
        MacroOpen,
    }

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("no current object")]
        NoCurrentObject,
        #[error("property name must not be empty")]
        EmptyPropertyName,
        #[error("property {0:?} is not defined on the current object")]
        PropertyNotFound(String),
        #[error("property {0:?} does not hold a class value")]
        NotAClassValue(String),
        #[error("commands cannot be pushed while an event is being dispatched")]
        ReentrantPush,
        #[error(transparent)]
        Conversion(#[from] ConversionError),
        #[error(transparent)]
        Field(#[from] FieldError),
        #[error(transparent)]
        History(#[from] HistoryError),
    }
}
