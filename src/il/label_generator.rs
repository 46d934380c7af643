use std::collections::HashMap;

use super::Label;

/// Hands out labels that are unique within a program. Each prefix is counted separately.
pub struct LabelGenerator {
    seen_subscripts: HashMap<String, usize>,
}
impl LabelGenerator {
    pub fn new() -> Self {
        Self {
            seen_subscripts: HashMap::new(),
        }
    }

    /// Generates a new unique label.
    pub fn next_label(&mut self, id: &str) -> Label {
        let current_subscript = self.seen_subscripts.entry(id.to_string()).or_insert(0);
        *current_subscript += 1;

        Label::new(id, *current_subscript)
    }
}
