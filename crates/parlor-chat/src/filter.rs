/// Profanity masking over an injected word list. The list itself is
/// configuration, not something this module owns.
///
/// Matching is ASCII-case-insensitive and substring-based (no word
/// boundaries, matching the moderation behavior this replaces): every
/// occurrence of a listed word is overwritten with a `*` run of the same
/// length, so clients can never recover the original text.
pub struct WordFilter {
    words: Vec<String>,
}

impl WordFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words
                .into_iter()
                .map(Into::into)
                .filter(|w: &String| !w.is_empty())
                .collect(),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        for word in &self.words {
            mask_word(&mut chars, word);
        }
        chars.into_iter().collect()
    }
}

fn mask_word(chars: &mut [char], word: &str) {
    let needle: Vec<char> = word.chars().collect();
    if needle.is_empty() || chars.len() < needle.len() {
        return;
    }
    let mut i = 0;
    while i + needle.len() <= chars.len() {
        let matched = chars[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
        if matched {
            for c in &mut chars[i..i + needle.len()] {
                *c = '*';
            }
            i += needle.len();
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_with_equal_length() {
        let filter = WordFilter::new(["darn"]);
        assert_eq!(filter.apply("well darn it"), "well **** it");
    }

    #[test]
    fn case_insensitive() {
        let filter = WordFilter::new(["darn"]);
        assert_eq!(filter.apply("DARN and DaRn"), "**** and ****");
    }

    #[test]
    fn masks_every_occurrence_including_substrings() {
        let filter = WordFilter::new(["darn"]);
        assert_eq!(filter.apply("darndarn, darnation"), "********, ****ation");
    }

    #[test]
    fn clean_text_untouched() {
        let filter = WordFilter::new(["darn", "heck"]);
        assert_eq!(filter.apply("perfectly fine"), "perfectly fine");
    }

    #[test]
    fn multiple_words() {
        let filter = WordFilter::new(["darn", "heck"]);
        assert_eq!(filter.apply("darn this heck"), "**** this ****");
    }

    #[test]
    fn empty_list_is_identity() {
        let filter = WordFilter::new(Vec::<String>::new());
        assert_eq!(filter.apply("anything goes"), "anything goes");
    }

    #[test]
    fn non_ascii_text_survives_masking() {
        let filter = WordFilter::new(["darn"]);
        assert_eq!(filter.apply("héllo darn wörld"), "héllo **** wörld");
    }
}
