use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use strsim::normalized_levenshtein;

/// `candidate` is the stored scraped text and `query` the name looked up.
/// Substring containment is loose: "Son" hits "Robertson".
pub trait NameMatcher: Send + Sync + fmt::Debug {
    fn matches(&self, candidate: &str, query: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl NameMatcher for SubstringMatcher {
    fn matches(&self, candidate: &str, query: &str) -> bool {
        candidate.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Query tokens must appear as a contiguous run of whole tokens in the candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBoundaryMatcher;

impl NameMatcher for TokenBoundaryMatcher {
    fn matches(&self, candidate: &str, query: &str) -> bool {
        let hay = tokens(candidate);
        let needle = tokens(query);
        if needle.is_empty() {
            return false;
        }
        hay.windows(needle.len()).any(|w| w == needle.as_slice())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl NameMatcher for ExactMatcher {
    fn matches(&self, candidate: &str, query: &str) -> bool {
        tokens(candidate) == tokens(query)
    }
}

/// Token-sort similarity at or above `threshold` (0–100).
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    pub threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self { threshold: 80.0 }
    }
}

impl NameMatcher for FuzzyMatcher {
    fn matches(&self, candidate: &str, query: &str) -> bool {
        token_sort_ratio(candidate, query) >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    #[default]
    Substring,
    TokenBoundary,
    Exact,
    Fuzzy,
}

impl MatchPolicy {
    pub fn matcher(self) -> Arc<dyn NameMatcher> {
        match self {
            MatchPolicy::Substring => Arc::new(SubstringMatcher),
            MatchPolicy::TokenBoundary => Arc::new(TokenBoundaryMatcher),
            MatchPolicy::Exact => Arc::new(ExactMatcher),
            MatchPolicy::Fuzzy => Arc::new(FuzzyMatcher::default()),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "substring" | "" => Ok(MatchPolicy::Substring),
            "token" | "token_boundary" => Ok(MatchPolicy::TokenBoundary),
            "exact" => Ok(MatchPolicy::Exact),
            "fuzzy" => Ok(MatchPolicy::Fuzzy),
            other => Err(anyhow::anyhow!("unknown name match policy: {other}")),
        }
    }
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    (normalized_levenshtein(&a, &b) * 100.0).round()
}

fn sorted_tokens(raw: &str) -> String {
    let mut parts = tokens(raw);
    parts.sort();
    parts.join(" ")
}

fn tokens(raw: &str) -> Vec<String> {
    raw.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
