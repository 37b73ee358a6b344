use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Dense identifier handed out by an [`IdMap`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MappedId(pub u32);

/// Bidirectional map between arbitrary source ids and dense ids counting up from a base.
#[derive(Debug, Default)]
pub struct IdMap {
    base: u32,
    src_to_dst: FxHashMap<u32, MappedId>,
    dst_to_src: Vec<u32>,
}

impl IdMap {
    /// Maps ids in the order they are first seen. Duplicates keep their first mapping.
    pub fn new_from_ids(ids: impl IntoIterator<Item = u32>, base: u32) -> Self {
        let mut s = Self {
            base,
            ..Default::default()
        };
        ids.into_iter().for_each(|id| {
            s.insert(id);
        });
        s
    }

    /// Maps `id` if it has not been seen yet and returns its mapped value.
    pub fn insert(&mut self, id: u32) -> MappedId {
        let next = MappedId(self.base + self.dst_to_src.len() as u32);
        *self.src_to_dst.entry(id).or_insert_with(|| {
            self.dst_to_src.push(id);
            next
        })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.dst_to_src.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.dst_to_src.is_empty()
    }

    #[inline(always)]
    pub fn to_map(&self, id: u32) -> Option<MappedId> {
        self.src_to_dst.get(&id).copied()
    }

    #[inline(always)]
    pub fn from_map(&self, mapped: MappedId) -> Option<u32> {
        mapped
            .0
            .checked_sub(self.base)
            .and_then(|idx| self.dst_to_src.get(idx as usize))
            .copied()
    }
}
