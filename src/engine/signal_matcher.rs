//! Content signal matching for chat messages.

use crate::models::SignalMatch;

/// Case-insensitive matcher for the target identity and the keyword list.
#[derive(Debug, Clone)]
pub struct SignalMatcher {
    target: String,
    /// `(configured form, lowercased form)` in configuration order.
    keywords: Vec<(String, String)>,
}

impl SignalMatcher {
    /// Creates a matcher. An empty target identity never matches.
    pub fn new(target_identity: &str, keywords: &[String]) -> Self {
        Self {
            target: target_identity.trim().to_lowercase(),
            keywords: keywords
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| (k.clone(), k.to_lowercase()))
                .collect(),
        }
    }

    /// Matches one message. The username is only checked for the target
    /// identity, keywords are only looked up in the text.
    pub fn matches(&self, username: &str, text: &str) -> SignalMatch {
        let text = text.to_lowercase();
        let target_mentioned = !self.target.is_empty()
            && (username.to_lowercase().contains(&self.target) || text.contains(&self.target));
        let matched_keywords = self
            .keywords
            .iter()
            .filter(|(_, lowered)| text.contains(lowered.as_str()))
            .map(|(configured, _)| configured.clone())
            .collect();

        SignalMatch { target_mentioned, matched_keywords }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(keywords: &[&str]) -> SignalMatcher {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        SignalMatcher::new("777aldo", &keywords)
    }

    #[test]
    fn test_target_in_text_or_username() {
        let m = matcher(&[]);
        assert!(m.matches("bob", "hey 777ALDO nice").target_mentioned);
        assert!(m.matches("The777Aldo", "hello").target_mentioned);
        assert!(!m.matches("bob", "hello there").target_mentioned);
    }

    #[test]
    fn test_keywords_case_insensitive_all_in_config_order() {
        let m = matcher(&["parlay", "won", "gg", "kupon tuttu"]);
        let result = m.matches("bob", "GG! Kupon TUTTU, he WON the parlay");
        assert_eq!(result.matched_keywords, vec!["parlay", "won", "gg", "kupon tuttu"]);
        assert!(result.has_signal());
    }

    #[test]
    fn test_keywords_only_searched_in_text() {
        let m = matcher(&["gg"]);
        let result = m.matches("ggmaster", "hello");
        assert!(result.matched_keywords.is_empty());
        assert!(!result.has_signal());
    }

    #[test]
    fn test_non_ascii_keyword() {
        let m = matcher(&["kazandı", "süper"]);
        assert_eq!(m.matches("x", "Aldo KAZANDI mı? süper").matched_keywords, vec!["süper"]);
        assert_eq!(m.matches("x", "aldo kazandı").matched_keywords, vec!["kazandı"]);
    }

    #[test]
    fn test_empty_target_never_matches() {
        let m = SignalMatcher::new("", &[]);
        let result = m.matches("anyone", "anything");
        assert!(!result.target_mentioned);
        assert!(!result.has_signal());
    }

    #[test]
    fn test_overlapping_keywords_are_all_reported() {
        let m = matcher(&["tebrik", "tebrikler", "tebrikler abi"]);
        let result = m.matches("x", "Tebrikler abi!");
        assert_eq!(result.matched_keywords, vec!["tebrik", "tebrikler", "tebrikler abi"]);
    }
}
