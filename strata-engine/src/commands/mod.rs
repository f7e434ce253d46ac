//! 具体命令。

mod entity;
mod field;
mod property;

pub use entity::{AddEntity, RemoveEntities};
pub use field::{SetField, SetFieldComponents};
pub use property::{ChangeClassName, ChangeProperties, RemoveProperty, RenameProperty, SetProperty};
