//! Generational slot arena.
//!
//! Vertices and edges refer to each other through handles into two arenas
//! owned by `Graph`, never through references. Removing a value bumps its
//! slot's generation, so any handle still naming the old value stops
//! resolving instead of aliasing whatever reuses the slot.

use crate::model::{EdgeId, VertexId};

/// A handle type the arena can mint.
pub(crate) trait SlotId: Copy + Eq {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(&self) -> u32;
    fn generation(&self) -> u32;
}

impl SlotId for VertexId {
    fn from_parts(index: u32, generation: u32) -> Self {
        VertexId { index, generation }
    }
    fn index(&self) -> u32 {
        self.index
    }
    fn generation(&self) -> u32 {
        self.generation
    }
}

impl SlotId for EdgeId {
    fn from_parts(index: u32, generation: u32) -> Self {
        EdgeId { index, generation }
    }
    fn index(&self) -> u32 {
        self.index
    }
    fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug, Clone)]
pub(crate) struct Arena<I, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    _id: std::marker::PhantomData<I>,
}

impl<I: SlotId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), _id: std::marker::PhantomData }
    }
}

impl<I: SlotId, T> Arena<I, T> {
    pub fn insert(&mut self, value: T) -> I {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.value.is_none());
                slot.value = Some(value);
                I::from_parts(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).expect("arena exhausted");
                self.slots.push(Slot { generation: 0, value: Some(value) });
                I::from_parts(index, 0)
            }
        }
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(value)
    }

    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
