//! Username candidate generator
//!
//! Candidates are enumerated as mixed-radix counting over the alphabet, most
//! significant position first: index `n` decomposes in base `|alphabet|`,
//! zero-padded to `length` digits.

use super::Alphabet;

/// Position in the enumeration of a [`NameGenerator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct GeneratorCursor {
    index: u128,
}

impl GeneratorCursor {
    /// Index of the next candidate this cursor yields
    pub fn index(&self) -> u128 {
        self.index
    }
}

/// Outcome of advancing a cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Yielded(String, GeneratorCursor),
    Exhausted,
}

/// Pure description of an enumeration: alphabet and length
#[derive(Debug, Clone)]
pub struct NameGenerator {
    alphabet: Alphabet,
    length: usize,
    total: u128,
}

impl NameGenerator {
    /// Create a new generator for names of given length
    pub fn new(length: usize, alphabet: Alphabet) -> Self {
        let total = alphabet.total_combinations(length);
        Self {
            alphabet,
            length,
            total,
        }
    }

    /// Get total number of combinations
    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Cursor at the first candidate
    pub fn start(&self) -> GeneratorCursor {
        GeneratorCursor::default()
    }

    /// Generate name at specific index
    pub fn name_at(&self, index: u128) -> Option<String> {
        if index >= self.total {
            return None;
        }

        let chars = self.alphabet.chars();
        let base = chars.len() as u128;
        let mut result = vec![' '; self.length];
        let mut n = index;

        for i in (0..self.length).rev() {
            result[i] = chars[(n % base) as usize];
            n /= base;
        }

        Some(result.into_iter().collect())
    }

    /// Produce the candidate at `cursor` and the cursor after it
    pub fn next(&self, cursor: GeneratorCursor) -> Step {
        match self.name_at(cursor.index) {
            Some(name) => Step::Yielded(
                name,
                GeneratorCursor {
                    index: cursor.index + 1,
                },
            ),
            None => Step::Exhausted,
        }
    }

    /// Start a fresh stream over this enumeration
    pub fn stream(&self) -> NameStream {
        NameStream {
            generator: self.clone(),
            cursor: self.start(),
        }
    }
}

/// Generator paired with its live cursor
#[derive(Debug, Clone)]
pub struct NameStream {
    generator: NameGenerator,
    cursor: GeneratorCursor,
}

impl NameStream {
    pub fn generator(&self) -> &NameGenerator {
        &self.generator
    }

    /// Get current progress index
    pub fn current_index(&self) -> u128 {
        self.cursor.index
    }

    /// Generate next batch of names
    pub fn next_batch(&mut self, count: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(count);

        for _ in 0..count {
            match self.generator.next(self.cursor) {
                Step::Yielded(name, cursor) => {
                    batch.push(name);
                    self.cursor = cursor;
                }
                Step::Exhausted => break,
            }
        }

        batch
    }

    /// Check if stream is exhausted
    pub fn is_exhausted(&self) -> bool {
        self.cursor.index >= self.generator.total
    }

    /// Remaining count
    pub fn remaining(&self) -> u128 {
        self.generator.total.saturating_sub(self.cursor.index)
    }
}

impl Iterator for NameStream {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        match self.generator.next(self.cursor) {
            Step::Yielded(name, cursor) => {
                self.cursor = cursor;
                Some(name)
            }
            Step::Exhausted => None,
        }
    }
}
