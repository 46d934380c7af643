use std::collections::HashMap;

use super::{Name, NumericKind};

/// How temporaries are handed out during one run of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempPolicy {
    /// Every temporary is new.
    #[default]
    Monotonic,
    /// Temporaries are returned once consumed, and the most recently returned one is
    /// handed out first.
    Recycle,
}

pub struct NameGenerator {
    policy: TempPolicy,
    next_index: HashMap<NumericKind, usize>,
    free: HashMap<NumericKind, Vec<usize>>,
}

impl NameGenerator {
    pub fn new(policy: TempPolicy) -> Self {
        Self {
            policy,
            next_index: HashMap::new(),
            free: HashMap::new(),
        }
    }

    /// Generates a temporary name of the given kind. Integers and floats are counted
    /// separately.
    pub fn next_temp(&mut self, kind: NumericKind) -> Name {
        if let Some(index) = self.free.get_mut(&kind).and_then(Vec::pop) {
            return Name::temp(index, kind);
        }
        let index = self.next_index.entry(kind).or_insert(0);
        let name = Name::temp(*index, kind);
        *index += 1;
        name
    }

    /// Returns a consumed temporary. Does nothing for variables, or when temporaries are
    /// never reused.
    pub fn release(&mut self, name: &Name) {
        if self.policy != TempPolicy::Recycle {
            return;
        }
        if let Name::Temp(temp) = name {
            let free = self.free.entry(temp.kind).or_default();
            if !free.contains(&temp.index) {
                free.push(temp.index);
            }
        }
    }
}
