// src/process/convert.rs
use crate::fetch::urls::{Pattern, Region};
use std::collections::HashMap;

/// The five score levels shared by every vocabulary, best first.
pub const LEVELS: [f64; 5] = [1.0, 0.75, 0.5, 0.25, 0.0];

const SYMBOLS: [&str; 5] = ["◎", "○", "□", "▲", "×"];

const KOSHINETSU_CURRENT: [&str; 5] = [
    "良くなっている",
    "やや良くなっている",
    "変わらない",
    "やや悪くなっている",
    "悪くなっている",
];

const KOSHINETSU_OUTLOOK: [&str; 5] = [
    "良くなる",
    "やや良くなる",
    "変わらない",
    "やや悪くなる",
    "悪くなる",
];

/// Maps judgment symbols and phrases to scores in [0.0, 1.0].
///
/// Immutable once built; the normalizer borrows one instead of consulting
/// process-wide tables.
#[derive(Debug, Clone)]
pub struct ScoreConverter {
    symbols: HashMap<String, f64>,
    koshinetsu_current: HashMap<String, f64>,
    koshinetsu_outlook: HashMap<String, f64>,
}

fn scale(words: [&str; 5]) -> HashMap<String, f64> {
    words
        .iter()
        .zip(LEVELS)
        .map(|(w, v)| (w.to_string(), v))
        .collect()
}

impl Default for ScoreConverter {
    fn default() -> Self {
        Self {
            symbols: scale(SYMBOLS),
            koshinetsu_current: scale(KOSHINETSU_CURRENT),
            koshinetsu_outlook: scale(KOSHINETSU_OUTLOOK),
        }
    }
}

impl ScoreConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match lookup. `None` means "no value", never zero.
    pub fn score(&self, pattern: Pattern, region: Region, raw: &str) -> Option<f64> {
        let map = match (region, pattern) {
            (Region::All, _) => &self.symbols,
            (Region::Koshinetsu, Pattern::Current) => &self.koshinetsu_current,
            (Region::Koshinetsu, Pattern::Outlook) => &self.koshinetsu_outlook,
        };
        map.get(raw).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_map_to_documented_levels() {
        let c = ScoreConverter::new();
        for pattern in [Pattern::Current, Pattern::Outlook] {
            assert_eq!(c.score(pattern, Region::All, "◎"), Some(1.0));
            assert_eq!(c.score(pattern, Region::All, "○"), Some(0.75));
            assert_eq!(c.score(pattern, Region::All, "□"), Some(0.5));
            assert_eq!(c.score(pattern, Region::All, "▲"), Some(0.25));
            assert_eq!(c.score(pattern, Region::All, "×"), Some(0.0));
        }
    }

    #[test]
    fn unknown_input_is_absent_not_zero() {
        let c = ScoreConverter::new();
        assert_eq!(c.score(Pattern::Current, Region::All, "△"), None);
        assert_eq!(c.score(Pattern::Current, Region::All, ""), None);
        assert_eq!(c.score(Pattern::Current, Region::All, " ◎"), None);
        assert_eq!(c.score(Pattern::Current, Region::All, "良くなっている"), None);
    }

    #[test]
    fn koshinetsu_phrases_depend_on_pattern() {
        let c = ScoreConverter::new();
        assert_eq!(
            c.score(Pattern::Current, Region::Koshinetsu, "やや良くなっている"),
            Some(0.75)
        );
        assert_eq!(
            c.score(Pattern::Outlook, Region::Koshinetsu, "やや悪くなる"),
            Some(0.25)
        );
        assert_eq!(
            c.score(Pattern::Outlook, Region::Koshinetsu, "変わらない"),
            Some(0.5)
        );
        assert_eq!(c.score(Pattern::Outlook, Region::Koshinetsu, "悪くなっている"), None);
        assert_eq!(c.score(Pattern::Current, Region::Koshinetsu, "◎"), None);
    }
}
