use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rows of keys in physical order, used to decide which characters sit
/// "near" each other when a mistake is injected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardLayout {
    rows: Vec<Vec<char>>,
}

impl KeyboardLayout {
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.as_ref().chars().collect())
                .collect(),
        }
    }

    fn position_of(&self, c: char) -> Option<(usize, usize)> {
        for (row_idx, row) in self.rows.iter().enumerate() {
            if let Some(col_idx) = row.iter().position(|&key| key == c) {
                return Some((row_idx, col_idx));
            }
        }
        None
    }

    /// A random key adjacent to `c` on this layout: the neighbors on the
    /// same row plus the nearest keys on the rows above and below. The case
    /// of the input is preserved. `None` when `c` is not on the layout.
    pub fn neighbor(&self, c: char, rng: &mut impl Rng) -> Option<char> {
        let (base, restore_upper) = if c.is_uppercase() {
            (c.to_lowercase().next().unwrap_or(c), true)
        } else {
            (c, false)
        };

        let (row_idx, col_idx) = self.position_of(base)?;
        let mut candidates = Vec::new();

        let row = &self.rows[row_idx];
        if col_idx > 0 {
            candidates.push(row[col_idx - 1]);
        }
        if col_idx + 1 < row.len() {
            candidates.push(row[col_idx + 1]);
        }

        for other_idx in [row_idx.checked_sub(1), row_idx.checked_add(1)]
            .into_iter()
            .flatten()
        {
            let Some(other) = self.rows.get(other_idx) else {
                continue;
            };
            for col in col_idx.saturating_sub(1)..=col_idx + 1 {
                if let Some(&key) = other.get(col) {
                    candidates.push(key);
                }
            }
        }

        if candidates.is_empty() {
            return None;
        }

        let chosen = candidates[rng.gen_range(0..candidates.len())];
        Some(if restore_upper {
            chosen.to_uppercase().next().unwrap_or(chosen)
        } else {
            chosen
        })
    }
}

/// US-QWERTY, the built-in layout registered for the "en" locale.
pub fn qwerty() -> KeyboardLayout {
    KeyboardLayout::from_rows(&["1234567890", "qwertyuiop", "asdfghjkl", "zxcvbnm"])
}
