//! Model identifier grammar
//!
//! A model identifier names both a query strategy and the set of collections to
//! search, e.g. `formatted_proposition_question`. The first `_`-separated token is
//! the strategy prefix, every following token is a part. Parts form a set: their
//! order in the input does not matter, and the canonical rendering always lists
//! them as proposition, summary, question.
//!
//! The legacy names used by the first deployment (`embGemma_ques_prop`,
//! `qwen3_summ`) are accepted as aliases and normalized to the canonical form.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '_';

/// How the raw user query is turned into search text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Raw query is searched as-is against every part's collection
    Direct,
    /// Raw query is first rewritten by the query formatter
    Formatted,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Direct, Strategy::Formatted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Formatted => "formatted",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "direct" | "embGemma" => Some(Strategy::Direct),
            "formatted" | "qwen3" => Some(Strategy::Formatted),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query-formatting task category, which doubles as a collection selector
///
/// Declaration order is the canonical order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    Proposition,
    Summary,
    Question,
}

impl Part {
    /// All parts in canonical order
    pub const ALL: [Part; 3] = [Part::Proposition, Part::Summary, Part::Question];

    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Proposition => "proposition",
            Part::Summary => "summary",
            Part::Question => "question",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "proposition" | "prop" => Some(Part::Proposition),
            "summary" | "summ" => Some(Part::Summary),
            "question" | "ques" => Some(Part::Question),
            _ => None,
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, validated model identifier
///
/// Always holds at least one part. Construct with [`resolve`] or `str::parse`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelIdentifier {
    strategy: Strategy,
    parts: BTreeSet<Part>,
}

impl ModelIdentifier {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Parts in canonical order
    pub fn parts(&self) -> &BTreeSet<Part> {
        &self.parts
    }

    pub fn requires_formatting(&self) -> bool {
        self.strategy == Strategy::Formatted
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy.as_str())?;
        for part in &self.parts {
            write!(f, "{}{}", SEPARATOR, part)?;
        }
        Ok(())
    }
}

impl FromStr for ModelIdentifier {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        resolve(s)
    }
}

impl TryFrom<String> for ModelIdentifier {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self> {
        resolve(&value)
    }
}

impl From<ModelIdentifier> for String {
    fn from(value: ModelIdentifier) -> Self {
        value.to_string()
    }
}

/// Parse a model identifier into an execution plan
pub fn resolve(identifier: &str) -> Result<ModelIdentifier> {
    let mut tokens = identifier.split(SEPARATOR);

    // split always yields at least one item
    let prefix = tokens.next().unwrap_or_default();
    let strategy = Strategy::from_token(prefix).ok_or_else(|| {
        EvalError::invalid_identifier(
            identifier,
            format!(
                "unrecognized strategy prefix '{}', expected one of {:?}",
                prefix,
                Strategy::ALL.map(|s| s.as_str())
            ),
        )
    })?;

    let mut parts = BTreeSet::new();
    for token in tokens {
        if token.is_empty() {
            return Err(EvalError::invalid_identifier(identifier, "empty part token"));
        }
        let part = Part::from_token(token).ok_or_else(|| {
            EvalError::invalid_identifier(identifier, format!("unknown part token '{}'", token))
        })?;
        if !parts.insert(part) {
            return Err(EvalError::invalid_identifier(
                identifier,
                format!("part '{}' appears more than once", part),
            ));
        }
    }

    if parts.is_empty() {
        return Err(EvalError::invalid_identifier(
            identifier,
            "at least one part is required",
        ));
    }

    Ok(ModelIdentifier { strategy, parts })
}

/// Every valid identifier in canonical form, sorted lexicographically
///
/// Two strategies times seven non-empty part subsets.
pub fn enumerate_all() -> Vec<ModelIdentifier> {
    let subset_count = 1u8 << Part::ALL.len();
    let mut all: Vec<ModelIdentifier> = Strategy::ALL
        .iter()
        .flat_map(|&strategy| {
            (1..subset_count).map(move |mask| ModelIdentifier {
                strategy,
                parts: Part::ALL
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .map(|(_, part)| *part)
                    .collect(),
            })
        })
        .collect();

    all.sort_by_cached_key(|id| id.to_string());
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_canonical() {
        let id = resolve("formatted_summary").unwrap();
        assert_eq!(id.strategy(), Strategy::Formatted);
        assert_eq!(id.parts().iter().copied().collect::<Vec<_>>(), vec![Part::Summary]);
        assert!(id.requires_formatting());
    }

    #[test]
    fn test_part_order_is_irrelevant() {
        let a = resolve("direct_question_proposition").unwrap();
        let b = resolve("direct_proposition_question").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "direct_proposition_question");
    }

    #[test]
    fn test_legacy_aliases() {
        let id = resolve("embGemma_ques_prop").unwrap();
        assert_eq!(id.to_string(), "direct_proposition_question");

        let id = resolve("qwen3_prop_summ_ques").unwrap();
        assert_eq!(id.to_string(), "formatted_proposition_summary_question");
    }

    #[test]
    fn test_rejections() {
        for bad in [
            "",
            "direct",
            "direct_",
            "_summary",
            "hybrid_summary",
            "direct_summary_summary",
            "direct_summ_summary",
            "direct_summary__question",
            "direct_summary_bogus",
            "Direct_summary",
        ] {
            let err = resolve(bad).unwrap_err();
            assert!(
                matches!(err, EvalError::InvalidIdentifier { .. }),
                "'{}' should be rejected, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_enumerate_all() {
        let all: Vec<String> = enumerate_all().iter().map(|id| id.to_string()).collect();
        assert_eq!(all.len(), 14);

        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);

        assert_eq!(all.first().unwrap(), "direct_proposition");
        assert!(all.contains(&"formatted_proposition_summary_question".to_string()));
    }

    #[test]
    fn test_round_trip_over_enumeration() {
        for id in enumerate_all() {
            let rendered = id.to_string();
            let reparsed = resolve(&rendered).unwrap();
            assert_eq!(reparsed, id);
            assert_eq!(reparsed.to_string(), rendered);
        }
    }

    #[test]
    fn test_every_accepted_identifier_is_enumerated() {
        let all = enumerate_all();
        for input in ["embGemma_summ_prop", "formatted_question", "qwen3_ques_summ"] {
            let id = resolve(input).unwrap();
            assert!(all.contains(&id), "{} missing from enumeration", id);
        }
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id: ModelIdentifier = serde_json::from_str("\"qwen3_ques\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"formatted_question\"");

        let err = serde_json::from_str::<ModelIdentifier>("\"nope_ques\"");
        assert!(err.is_err());
    }
}
