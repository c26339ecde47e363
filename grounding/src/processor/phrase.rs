use crate::common::*;

/// Direction words exchanged by a top-to-bottom flip.
pub const VERTICAL_DIRECTION_WORDS: [(&str, &str); 6] = [
    ("north", "south"),
    ("northern", "southern"),
    ("northeast", "southeast"),
    ("northwest", "southwest"),
    ("northeastern", "southeastern"),
    ("northwestern", "southwestern"),
];
/// Direction words exchanged by a left-to-right flip.
pub const HORIZONTAL_DIRECTION_WORDS: [(&str, &str); 6] = [
    ("west", "east"),
    ("western", "eastern"),
    ("northwest", "northeast"),
    ("southwest", "southeast"),
    ("northwestern", "northeastern"),
    ("southwestern", "southeastern"),
];

/// Swaps paired words in a phrase in a single pass.
///
/// Words are maximal runs of alphabetic characters, and only whole words
/// are replaced. Every other character is kept as is.
#[derive(Debug, Clone)]
pub struct WordSwap {
    table: HashMap<&'static str, &'static str>,
}

impl WordSwap {
    pub fn new(pairs: &[(&'static str, &'static str)]) -> Self {
        let table = pairs
            .iter()
            .flat_map(|&(lhs, rhs)| [(lhs, rhs), (rhs, lhs)])
            .collect();
        Self { table }
    }

    pub fn vertical() -> Self {
        Self::new(&VERTICAL_DIRECTION_WORDS)
    }

    pub fn horizontal() -> Self {
        Self::new(&HORIZONTAL_DIRECTION_WORDS)
    }

    pub fn apply(&self, phrase: &str) -> String {
        let mut output = String::with_capacity(phrase.len());
        let mut word_start = None;

        for (index, ch) in phrase.char_indices() {
            match (ch.is_alphabetic(), word_start) {
                (true, None) => word_start = Some(index),
                (true, Some(_)) => {}
                (false, Some(start)) => {
                    output.push_str(self.swap(&phrase[start..index]));
                    output.push(ch);
                    word_start = None;
                }
                (false, None) => output.push(ch),
            }
        }
        if let Some(start) = word_start {
            output.push_str(self.swap(&phrase[start..]));
        }

        output
    }

    fn swap<'a>(&'a self, word: &'a str) -> &'a str {
        self.table.get(word).copied().unwrap_or(word)
    }
}
