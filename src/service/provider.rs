//! Display-set source.

use crate::model::DisplaySet;

/// Supplies the display sets currently loaded by the host application.
pub trait DisplaySetProvider {
    /// Every loaded display set, in the host's order.
    fn active_display_sets(&self) -> Vec<DisplaySet>;

    fn display_set_by_uid(&self, uid: &str) -> Option<&DisplaySet>;
}

/// A [`DisplaySetProvider`] backed by a vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryDisplaySets {
    display_sets: Vec<DisplaySet>,
}

impl InMemoryDisplaySets {
    pub fn new(display_sets: Vec<DisplaySet>) -> Self {
        Self { display_sets }
    }

    /// Adds a display set, replacing any with the same uid.
    pub fn insert(&mut self, display_set: DisplaySet) {
        match self
            .display_sets
            .iter_mut()
            .find(|ds| ds.display_set_instance_uid == display_set.display_set_instance_uid)
        {
            Some(existing) => *existing = display_set,
            None => self.display_sets.push(display_set),
        }
    }

    pub fn remove(&mut self, uid: &str) -> Option<DisplaySet> {
        let index = self
            .display_sets
            .iter()
            .position(|ds| ds.display_set_instance_uid == uid)?;
        Some(self.display_sets.remove(index))
    }

    pub fn len(&self) -> usize {
        self.display_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display_sets.is_empty()
    }
}

impl DisplaySetProvider for InMemoryDisplaySets {
    fn active_display_sets(&self) -> Vec<DisplaySet> {
        self.display_sets.clone()
    }

    fn display_set_by_uid(&self, uid: &str) -> Option<&DisplaySet> {
        self.display_sets
            .iter()
            .find(|ds| ds.display_set_instance_uid == uid)
    }
}

impl FromIterator<DisplaySet> for InMemoryDisplaySets {
    fn from_iter<I: IntoIterator<Item = DisplaySet>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
