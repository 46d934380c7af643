//! Stack slots for the names of a procedure.
use std::collections::HashMap;

use crate::{
    il::{Name, NumericKind},
    prelude::*,
};

use super::calling_convention::{param_offset, WORD_SIZE};

/// A fixed, `$fp`-relative location holding the value of one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: i32,
    pub kind: NumericKind,
}

/// Assigns every name of a procedure its own slot. Parameters live above the frame pointer
/// where the caller left them; locals and temporaries are assigned a slot below it the first
/// time they are referenced.
#[derive(Debug)]
pub struct Frame {
    slots: HashMap<Name, Slot>,
    locals: i32,
}
impl Frame {
    pub fn new(params: &[Name]) -> Self {
        let slots = params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let slot = Slot {
                    offset: param_offset(index, params.len()),
                    kind: param.kind(),
                };
                (param.clone(), slot)
            })
            .collect();
        Self { slots, locals: 0 }
    }

    pub fn slot(&mut self, name: &Name) -> Slot {
        if let Some(slot) = self.slots.get(name) {
            return *slot;
        }
        self.locals += 1;
        let slot = Slot {
            offset: -WORD_SIZE * self.locals,
            kind: name.kind(),
        };
        trace!("{} is stored at {}($fp)", name, slot.offset);
        self.slots.insert(name.clone(), slot);
        slot
    }

    /// The bytes to reserve below the frame pointer, kept at a multiple of eight.
    pub fn size(&self) -> i32 {
        let bytes = WORD_SIZE * self.locals;
        (bytes + 7) / 8 * 8
    }
}
