//! Chromosome representation and ordering.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    name: String,
    length: u32,
}

impl Chromosome {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Records a length for this chromosome. Lengths only ever grow, so several
    /// entries contributing to one chromosome leave the largest extent.
    pub fn set_length(&mut self, length: u32) {
        if length > self.length {
            self.length = length;
        }
    }
}

/// Natural chromosome order: numeric names first (numerically), then text.
/// A `pseudo` prefix is ignored.
impl Ord for Chromosome {
    fn cmp(&self, other: &Self) -> Ordering {
        let this = self.name.strip_prefix("pseudo").unwrap_or(&self.name);
        let that = other.name.strip_prefix("pseudo").unwrap_or(&other.name);
        let ordering = match (this.parse::<i64>(), that.parse::<i64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => this.cmp(that),
        };
        ordering.then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Chromosome {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
