use super::Sample;

/// Handle to a sample slot in a [`SampleArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(usize);

/// Owns every sample created during resolution. Duplicating a sample
/// allocates a new slot holding its own copy of settings and tokens.
#[derive(Debug, Default)]
pub struct SampleArena {
    slots: Vec<Option<Sample>>,
}

impl SampleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sample: Sample) -> SampleId {
        self.slots.push(Some(sample));
        SampleId(self.slots.len() - 1)
    }

    pub fn duplicate(&mut self, id: SampleId) -> Option<SampleId> {
        let copy = self.get(id)?.clone();
        Some(self.insert(copy))
    }

    pub fn get(&self, id: SampleId) -> Option<&Sample> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SampleId) -> Option<&mut Sample> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Move the given samples out, in the order of `ids`
    pub fn take_all(&mut self, ids: &[SampleId]) -> Vec<Sample> {
        ids.iter()
            .filter_map(|id| self.slots.get_mut(id.0).and_then(Option::take))
            .collect()
    }
}
