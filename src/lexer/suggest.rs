/// Levenshtein table over the matcher's literal words.
///
/// On a match failure the consumed characters are compared against every
/// word; a unique word within distance 2 becomes the error's suggestion.
#[derive(Debug, Default, Clone)]
pub struct WordTable {
    words: Vec<String>,
}

impl WordTable {
    pub fn insert(&mut self, word: &str) {
        if !self.words.iter().any(|w| w == word) {
            self.words.push(word.to_string());
        }
    }

    /// The single closest word at distance 1, then 2. Ties yield nothing.
    pub fn closest(&self, consumed: &str) -> Option<String> {
        if consumed.is_empty() {
            return None;
        }

        for distance in 1..=2 {
            let mut hits = self
                .words
                .iter()
                .filter(|word| strsim::levenshtein(word, consumed) == distance);

            match (hits.next(), hits.next()) {
                (Some(word), None) => return Some(word.clone()),
                (Some(_), Some(_)) => return None,
                (None, _) => {}
            }
        }

        None
    }
}
