//! Per-run blank node identifier generation.

use std::collections::HashMap;

const PREFIX_LEN: usize = 16;
const ALPHABET_LEN: u8 = 36; // 0-9 then A-Z

fn random_prefix() -> String {
    (0..PREFIX_LEN)
        .map(|_| {
            let n = rand::random::<u8>() % ALPHABET_LEN;
            if n < 10 {
                (b'0' + n) as char
            } else {
                (b'A' + (n - 10)) as char
            }
        })
        .collect()
}

/// Mints blank node identifiers unique within one run.
///
/// A labeled call (`generate(Some(label))`) is deterministic per label: the
/// same label always maps to the same id, by simple memoization, matching
/// `_:foo` always meaning the same blank node within one document.
/// Unlabeled calls draw from a monotonic counter.
#[derive(Debug)]
pub struct BlankNodeGenerator {
    prefix: String,
    counter: u64,
    labels: HashMap<String, String>,
}

impl BlankNodeGenerator {
    /// Create a generator with a freshly drawn random prefix.
    pub fn new() -> Self {
        BlankNodeGenerator {
            prefix: random_prefix(),
            counter: 0,
            labels: HashMap::new(),
        }
    }

    /// Mint a fresh, anonymous blank node id.
    pub fn generate(&mut self) -> String {
        let id = self.counter;
        self.counter += 1;
        format!("{}-{}", self.prefix, id)
    }

    /// Mint (or recall) the blank node id for a user-supplied label, such as
    /// the `foo` in a Turtle `_:foo`.
    pub fn generate_labeled(&mut self, label: &str) -> String {
        if let Some(existing) = self.labels.get(label) {
            return existing.clone();
        }
        let id = format!("{}-{}", self.prefix, label);
        self.labels.insert(label.to_string(), id.clone());
        id
    }
}

impl Default for BlankNodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
