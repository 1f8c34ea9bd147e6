//! Wake-phrase matching on transcripts.
//!
//! Whisper punctuates and capitalises freely ("Hey, Buddy!"), so both the
//! configured phrase and the transcript are reduced to lowercase
//! alphanumeric words before comparison.  A match must cover whole words:
//! "hey buddy" matches "Hey, buddy." but not "hey buddyguard".

/// Split `text` into lowercase alphanumeric words.
pub fn normalize_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Compiled wake phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct WakePhrase {
    words: Vec<String>,
}

impl WakePhrase {
    pub fn new(phrase: &str) -> Self {
        Self {
            words: normalize_words(phrase),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word index just past the first occurrence of the phrase in
    /// `transcript`, if it occurs.
    fn find_end(&self, words: &[String]) -> Option<usize> {
        if self.words.is_empty() || words.len() < self.words.len() {
            return None;
        }
        words
            .windows(self.words.len())
            .position(|w| w == self.words.as_slice())
            .map(|start| start + self.words.len())
    }

    pub fn matches(&self, transcript: &str) -> bool {
        self.find_end(&normalize_words(transcript)).is_some()
    }

    /// Words spoken after the phrase in the same breath
    /// ("hey buddy open calculator" → "open calculator").
    pub fn remainder(&self, transcript: &str) -> Option<String> {
        let words = normalize_words(transcript);
        let end = self.find_end(&words)?;
        let rest = words[end..].join(" ");
        (!rest.is_empty()).then_some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_and_case_are_ignored() {
        let phrase = WakePhrase::new("hey buddy");
        assert!(phrase.matches("Hey, Buddy!"));
        assert!(phrase.matches("  hey   buddy. "));
        assert!(phrase.matches("oh hey buddy"));
    }

    #[test]
    fn whole_words_only() {
        let phrase = WakePhrase::new("hey buddy");
        assert!(!phrase.matches("hey buddyguard"));
        assert!(!phrase.matches("they buddy"));
        assert!(!phrase.matches("buddy hey"));
        assert!(!phrase.matches(""));
    }

    #[test]
    fn remainder_after_phrase() {
        let phrase = WakePhrase::new("Hey Buddy");
        assert_eq!(
            phrase.remainder("Hey buddy, open Calculator.").as_deref(),
            Some("open calculator")
        );
        assert_eq!(phrase.remainder("hey buddy"), None);
        assert_eq!(phrase.remainder("hello there"), None);
    }

    #[test]
    fn empty_phrase_never_matches() {
        let phrase = WakePhrase::new("  ,  ");
        assert!(phrase.is_empty());
        assert!(!phrase.matches("anything at all"));
    }

    #[test]
    fn apostrophes_stay_inside_words() {
        assert_eq!(normalize_words("What's up?"), vec!["what's", "up"]);
    }
}
