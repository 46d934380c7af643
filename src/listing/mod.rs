//! Generic logic for code listings (TAC, assembly).
mod position;

use std::{
    fmt::{self, Display, Formatter},
    slice::{Iter, IterMut},
    vec::IntoIter,
};

pub use position::Position;

/// An ordered sequence of lines. Lines are addressed by their [`Position`].
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    lines: Vec<T>,
}

impl<T> Listing<T> {
    pub fn new() -> Self {
        Self { lines: vec![] }
    }

    pub fn push(&mut self, line: T) {
        self.lines.push(line);
    }

    pub fn insert(&mut self, position: Position, line: T) {
        self.lines.insert(position.0, line);
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.lines.get(position.0)
    }

    /// Removes every line at the given positions. The relative order of the remaining
    /// lines is unchanged.
    pub fn remove_lines(&mut self, mut positions: Vec<Position>) {
        positions.sort_unstable();
        positions.dedup();
        for position in positions.into_iter().rev() {
            self.lines.remove(position.0);
        }
    }

    pub fn iter_lines(&self) -> LinesIter<T> {
        LinesIter {
            inner: self.lines.iter(),
            position: Position(0),
        }
    }

    pub fn iter_instructions(&self) -> Iter<T> {
        self.lines.iter()
    }

    pub fn iter_instructions_mut(&mut self) -> IterMut<T> {
        self.lines.iter_mut()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> FromIterator<T> for Listing<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}
impl<T> From<Vec<T>> for Listing<T> {
    fn from(lines: Vec<T>) -> Self {
        Self { lines }
    }
}
impl<T: Display> Display for Listing<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

pub struct LinesIter<'item, T> {
    inner: Iter<'item, T>,
    position: Position,
}

impl<'item, T> Iterator for LinesIter<'item, T> {
    type Item = (Position, &'item T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|v| {
            let current = self.position;
            self.position = current + 1;
            (current, v)
        })
    }
}

impl<T> IntoIterator for Listing<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}
