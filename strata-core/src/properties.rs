use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

/// 有序的自定义属性集合。
///
/// 名称在集合内唯一，迭代顺序等于插入顺序；比较相等时不考虑顺序。
/// 集合只应由命令修改，观察者只读。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(IndexMap<String, PropertyValue>);

impl PropertySet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.get_index_of(name)
    }

    /// 写入属性。已存在的名称保持原有位置，返回旧值。
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        let name = name.into();
        debug_assert!(!name.is_empty(), "property names must not be empty");
        self.0.insert(name, value)
    }

    /// 在指定位置插入新属性，用于撤销删除时恢复原有顺序。
    pub fn insert_at(&mut self, index: usize, name: impl Into<String>, value: PropertyValue) {
        let index = index.min(self.0.len());
        self.0.shift_insert(index, name.into(), value);
    }

    /// 删除属性并保持其余属性的相对顺序，返回原位置与旧值。
    pub fn remove(&mut self, name: &str) -> Option<(usize, PropertyValue)> {
        self.0
            .shift_remove_full(name)
            .map(|(index, _, value)| (index, value))
    }

    /// 原地重命名。`new_name` 必须不在集合中，否则返回 `false` 且不做修改。
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        if self.0.contains_key(new_name) {
            return false;
        }
        let Some((index, value)) = self.remove(old_name) else {
            return false;
        };
        self.insert_at(index, new_name, value);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// 追加合并：只插入 `source` 中本集合尚未定义的名称，已有条目保持不变。
    ///
    /// 多选建议与粘贴都依赖这一语义，粘贴不会覆盖目标已有的值。
    pub fn merge(&mut self, source: &PropertySet) {
        for (name, value) in source.iter() {
            if !self.0.contains_key(name) {
                self.0.insert(name.clone(), value.clone());
            }
        }
    }

    /// [`PropertySet::merge`] 的非破坏版本。
    pub fn merged(&self, source: &PropertySet) -> PropertySet {
        let mut result = self.clone();
        result.merge(source);
        result
    }
}

impl<N: Into<String>> FromIterator<(N, PropertyValue)> for PropertySet {
    fn from_iter<T: IntoIterator<Item = (N, PropertyValue)>>(iter: T) -> Self {
        let mut set = PropertySet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = indexmap::map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// 自由函数形式的合并，便于在多个目标上独立调用。
#[inline]
pub fn merge_properties(target: &mut PropertySet, source: &PropertySet) {
    target.merge(source);
}
