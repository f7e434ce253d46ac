use strata_core::entity::EntityId;

/// 当前选择：一个主对象加上一组共同选中的对象。
///
/// 主对象非空时总是 `objects` 的成员，`objects` 内不重复且保持选择顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<EntityId>,
    objects: Vec<EntityId>,
}

impl Selection {
    #[inline]
    pub fn current(&self) -> Option<EntityId> {
        self.current
    }

    #[inline]
    pub fn objects(&self) -> &[EntityId] {
        &self.objects
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.objects.contains(&id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// 除主对象外的其他选中对象。
    pub fn others(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.objects
            .iter()
            .copied()
            .filter(move |id| Some(*id) != self.current)
    }

    /// 设置主对象。对象不在选择集中时，选择集变为只含该对象。返回选择是否改变。
    pub(crate) fn set_current(&mut self, id: Option<EntityId>) -> bool {
        let before = self.clone();
        match id {
            Some(id) => {
                if !self.objects.contains(&id) {
                    self.objects = vec![id];
                }
                self.current = Some(id);
            }
            None => {
                self.current = None;
                self.objects.clear();
            }
        }
        *self != before
    }

    /// 替换选择集。原主对象仍在集合中时保留，否则取第一个对象。
    pub(crate) fn set_objects(&mut self, ids: impl IntoIterator<Item = EntityId>) -> bool {
        let before = self.clone();
        self.objects.clear();
        for id in ids {
            if !self.objects.contains(&id) {
                self.objects.push(id);
            }
        }
        if !self.current.is_some_and(|current| self.objects.contains(&current)) {
            self.current = self.objects.first().copied();
        }
        *self != before
    }

    /// 只保留满足条件的对象，用于实体删除或文档重载之后。
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) -> bool {
        let before = self.clone();
        self.objects.retain(|id| keep(*id));
        if !self.current.is_some_and(|current| self.objects.contains(&current)) {
            self.current = self.objects.first().copied();
        }
        *self != before
    }
}
