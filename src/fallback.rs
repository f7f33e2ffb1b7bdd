//!
//! src/fallback.rs
//!
//! Deterministic mood to query mapping used whenever the generative
//! provider is unavailable or too slow
//!

/// Query returned when no rule matches
pub const DEFAULT_QUERY: &str = "Popular Thai Songs";

/// Evaluated top to bottom, first hit wins
pub const DEFAULT_RULES: &[(&[&str], &str)] = &[
    (&["เศร้า", "อกหัก", "ร้องไห้"], "Sad Thai Songs"),
    (&["รัก", "แฟน", "love"], "Romantic Love Songs"),
    (&["สนุก", "เต้น", "มันส์"], "Dance Pop Party"),
    (&["นอน", "ชิล", "ผ่อนคลาย"], "Acoustic Chill"),
    (&["งาน", "อ่าน", "work"], "Lofi Study"),
    (&["เดือด", "โกรธ", "rock"], "Thai Rock Hits"),
];

#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub query: String
}

impl KeywordRule {
    pub fn new(keywords: &[&str], query: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            query: query.to_string()
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct KeywordFallbackResolver {
    rules: Vec<KeywordRule>,
    default_query: String
}

impl Default for KeywordFallbackResolver {
    fn default() -> Self {
        Self::new(
            DEFAULT_RULES.iter().map(|(k, q)| KeywordRule::new(k, q)).collect(),
            DEFAULT_QUERY
        )
    }
}

impl KeywordFallbackResolver {
    pub fn new(rules: Vec<KeywordRule>, default_query: &str) -> Self {
        Self { rules, default_query: default_query.to_string() }
    }

    /// Total: every mood, including the empty string, maps to a query
    pub fn resolve(&self, mood: &str) -> String {
        let lowered = mood.to_lowercase();
        self.rules.iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.query.clone())
            .unwrap_or_else(|| self.default_query.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_category_resolves() {
        let resolver = KeywordFallbackResolver::default();
        let cases = [
            ("วันนี้เศร้ามาก", "Sad Thai Songs"),
            ("เพิ่งอกหัก", "Sad Thai Songs"),
            ("คิดถึงแฟน", "Romantic Love Songs"),
            ("in love", "Romantic Love Songs"),
            ("อยากเต้น", "Dance Pop Party"),
            ("มันส์ๆ", "Dance Pop Party"),
            ("ชิลๆ ริมทะเล", "Acoustic Chill"),
            ("อ่านหนังสือสอบ", "Lofi Study"),
            ("need to work", "Lofi Study"),
            ("โกรธมาก", "Thai Rock Hits"),
            ("rock on", "Thai Rock Hits"),
        ];
        for (mood, expected) in cases {
            assert_eq!(resolver.resolve(mood), expected, "mood {mood:?}");
        }
    }

    #[test]
    fn earlier_rules_win_on_overlap() {
        let resolver = KeywordFallbackResolver::default();
        // (mood hitting two categories, higher priority query)
        let table = [
            ("เศร้า แต่ยังรัก", "Sad Thai Songs"),
            ("ร้องไห้ อยากเต้น", "Sad Thai Songs"),
            ("love and rock", "Romantic Love Songs"),
            ("แฟนชวนไปเต้น", "Romantic Love Songs"),
            ("เต้นแล้วชิล", "Dance Pop Party"),
            ("ชิลๆ ทำงาน", "Acoustic Chill"),
            ("work then rock", "Lofi Study"),
        ];
        for (mood, expected) in table {
            assert_eq!(resolver.resolve(mood), expected, "mood {mood:?}");
        }
    }

    #[test]
    fn matching_ignores_case() {
        let resolver = KeywordFallbackResolver::default();
        assert_eq!(resolver.resolve("LOVE"), "Romantic Love Songs");
        assert_eq!(resolver.resolve("Heavy ROCK"), "Thai Rock Hits");
        assert_eq!(resolver.resolve("WoRk"), "Lofi Study");
    }

    #[test]
    fn unmatched_and_empty_use_default() {
        let resolver = KeywordFallbackResolver::default();
        assert_eq!(resolver.resolve("happy sunday"), DEFAULT_QUERY);
        assert_eq!(resolver.resolve(""), DEFAULT_QUERY);
        assert_eq!(resolver.resolve("   "), DEFAULT_QUERY);
    }

    #[test]
    fn custom_rules_keep_their_order() {
        let resolver = KeywordFallbackResolver::new(
            vec![
                KeywordRule::new(&["Rain"], "Rainy Day Jazz"),
                KeywordRule::new(&["rain", "storm"], "Storm Ambient"),
            ],
            "Anything"
        );
        assert_eq!(resolver.resolve("rainstorm"), "Rainy Day Jazz");
        assert_eq!(resolver.resolve("storm"), "Storm Ambient");
        assert_eq!(resolver.resolve("sun"), "Anything");
    }
}
