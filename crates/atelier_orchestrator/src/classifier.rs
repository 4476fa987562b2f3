//! Keyword prompt classifier.

use atelier_core::Category;
use atelier_interface::CategoryClassifier;

/// Picks the category whose keywords appear most often in the prompt.
///
/// Matching is case-insensitive on whole words; multi-word keywords match as a
/// phrase. Ties go to the category listed first, and a prompt matching nothing
/// stays uncategorised.
///
/// # Examples
///
/// ```
/// use atelier_core::Category;
/// use atelier_interface::CategoryClassifier;
/// use atelier_orchestrator::KeywordClassifier;
///
/// let categories = vec![Category {
///     id: "landscape".into(),
///     name: "Landscape".into(),
///     keywords: vec!["mountain".into(), "lake".into()],
/// }];
/// let found = KeywordClassifier.classify("A Mountain over a still lake", &categories);
/// assert_eq!(found.map(|c| c.id.as_str()), Some("landscape"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn occurrences(prompt: &[String], keyword: &str) -> usize {
    let needle = words(keyword);
    if needle.is_empty() || needle.len() > prompt.len() {
        return 0;
    }
    prompt
        .windows(needle.len())
        .filter(|window| *window == needle.as_slice())
        .count()
}

impl CategoryClassifier for KeywordClassifier {
    fn classify<'a>(&self, prompt: &str, categories: &'a [Category]) -> Option<&'a Category> {
        let prompt = words(prompt);
        let mut best: Option<(&Category, usize)> = None;
        for category in categories {
            let score: usize = category
                .keywords
                .iter()
                .map(|keyword| occurrences(&prompt, keyword))
                .sum();
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((category, score));
            }
        }
        best.map(|(category, _)| category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, keywords: &[&str]) -> Category {
        Category {
            id: id.into(),
            name: id.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn highest_score_wins_and_ties_keep_order() {
        let categories = vec![
            category("fantasy", &["dragon", "castle"]),
            category("landscape", &["castle", "valley", "river"]),
        ];
        let classifier = KeywordClassifier;

        let found = classifier.classify("castle above a river valley", &categories);
        assert_eq!(found.unwrap().id, "landscape");

        let tie = classifier.classify("a castle", &categories);
        assert_eq!(tie.unwrap().id, "fantasy");
    }

    #[test]
    fn phrases_match_whole_words_only() {
        let categories = vec![category("portrait", &["close up"])];
        let classifier = KeywordClassifier;
        assert!(classifier.classify("Close-up of an old sailor", &categories).is_some());
        assert!(classifier.classify("closed upstairs door", &categories).is_none());
    }
}
