use serde::{Deserialize, Serialize};

use crate::mechanism::Polarity;

/// Marker group a rendered marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerTag {
    Up,
    Down,
}

impl MarkerTag {
    pub const ALL: [MarkerTag; 2] = [MarkerTag::Up, MarkerTag::Down];

    pub fn for_polarity(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Up => MarkerTag::Up,
            Polarity::Down => MarkerTag::Down,
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            MarkerTag::Up => Polarity::Up,
            MarkerTag::Down => Polarity::Down,
        }
    }
}

/// Position of a pick in the mechanism's ordered pick list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickRef(pub usize);

/// Maps (group, marker-local index) to the originating pick and back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickIndex {
    up: Vec<usize>,
    down: Vec<usize>,
    reverse: Vec<Option<(MarkerTag, usize)>>,
}

impl PickIndex {
    /// `pick_count` is the length of the full pick list the groups were cut from.
    pub fn from_partition(pick_count: usize, up: Vec<usize>, down: Vec<usize>) -> Self {
        let mut reverse = vec![None; pick_count];
        for (tag, indices) in [(MarkerTag::Up, &up), (MarkerTag::Down, &down)] {
            for (local, &pick) in indices.iter().enumerate() {
                if let Some(slot) = reverse.get_mut(pick) {
                    *slot = Some((tag, local));
                }
            }
        }
        Self { up, down, reverse }
    }

    pub fn resolve(&self, tag: MarkerTag, local: usize) -> Option<PickRef> {
        self.indices(tag).get(local).copied().map(PickRef)
    }

    pub fn locate(&self, pick: PickRef) -> Option<(MarkerTag, usize)> {
        self.reverse.get(pick.0).copied().flatten()
    }

    pub fn indices(&self, tag: MarkerTag) -> &[usize] {
        match tag {
            MarkerTag::Up => &self.up,
            MarkerTag::Down => &self.down,
        }
    }

    pub fn len(&self) -> usize {
        self.up.len() + self.down.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
