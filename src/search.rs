//! Fuzzy search over icon titles and aliases.
//!
//! The index is an explicitly owned value: build one with
//! [`SearchIndex::build`] and query it directly, or use the rebuildable
//! [`Searcher`] wrapper when one shared index serves many callers. Querying
//! a [`Searcher`] that was never built is a hard error, not a crash: "not
//! yet built" and "built empty" are distinguishable states.
//!
//! Ranking uses a Sellers-style substring edit distance: the query is
//! matched against the best-aligned substring of each term, and the edit
//! count is normalized by the query length into a 0..=1 similarity score.

use std::sync::RwLock;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// `search` was called before any index was built.
    #[error("search index not initialized: build it before querying")]
    IndexNotBuilt,
}

// ============================================================================
// Candidates and hits
// ============================================================================

/// One searchable entry: a set of terms (title plus aliases) keyed to a
/// caller-side identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Searchable terms. The first is the primary title.
    pub terms: Vec<String>,
    /// Caller-side identifier returned in hits (typically an index into
    /// the caller's icon list).
    pub id: usize,
}

impl Candidate {
    /// A candidate with a single searchable term.
    pub fn new(term: impl Into<String>, id: usize) -> Self {
        Self {
            terms: vec![term.into()],
            id,
        }
    }

    /// A candidate with a title and additional alias terms.
    pub fn with_aliases<I, S>(title: impl Into<String>, aliases: I, id: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms = vec![title.into()];
        terms.extend(aliases.into_iter().map(Into::into));
        Self { terms, id }
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matched candidate's identifier.
    pub id: usize,
    /// Similarity in 0..=1; 1 is an exact (substring) match.
    pub score: f32,
    /// The term that produced the best score, as originally supplied.
    pub term: String,
}

/// Index tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearcherOptions {
    /// Minimum similarity for a hit to be returned.
    pub threshold: f32,
}

impl Default for SearcherOptions {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

// ============================================================================
// SearchIndex
// ============================================================================

struct IndexEntry {
    id: usize,
    /// (original, normalized) per term.
    terms: Vec<(String, String)>,
}

/// An owned, immutable fuzzy index over a candidate set.
///
/// # Example
///
/// ```
/// use icondeck_exporter::{Candidate, SearchIndex, SearcherOptions};
///
/// let index = SearchIndex::build(
///     vec![
///         Candidate::new("Rust", 0),
///         Candidate::with_aliases("PostgreSQL", ["postgres"], 1),
///     ],
///     SearcherOptions::default(),
/// );
///
/// let hits = index.search("postgre");
/// assert_eq!(hits[0].id, 1);
/// ```
pub struct SearchIndex {
    entries: Vec<IndexEntry>,
    options: SearcherOptions,
}

impl SearchIndex {
    /// Builds an index owning normalized copies of every term.
    pub fn build(candidates: Vec<Candidate>, options: SearcherOptions) -> Self {
        let entries = candidates
            .into_iter()
            .map(|candidate| IndexEntry {
                id: candidate.id,
                terms: candidate
                    .terms
                    .into_iter()
                    .map(|term| {
                        let normalized = normalize(&term);
                        (term, normalized)
                    })
                    .collect(),
            })
            .collect();
        Self { entries, options }
    }

    /// Number of indexed candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns candidates ranked by similarity to `query`, best first.
    ///
    /// Scores below the configured threshold are dropped. Ties keep the
    /// candidate build order. An empty query matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let best = entry
                    .terms
                    .iter()
                    .map(|(original, normalized)| {
                        (substring_similarity(&query, normalized), original)
                    })
                    .max_by(|(a, _), (b, _)| a.total_cmp(b))?;
                let (score, term) = best;
                (score >= self.options.threshold).then(|| SearchHit {
                    id: entry.id,
                    score,
                    term: term.clone(),
                })
            })
            .collect();

        // Stable: equal scores keep candidate order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits
    }
}

fn normalize(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Sellers substring edit distance, normalized into a similarity score.
///
/// The query may begin matching at any position in the term for free; the
/// score is `1 - edits / query_len`. Transpositions count as one edit.
fn substring_similarity(query: &str, term: &str) -> f32 {
    let q: Vec<char> = query.chars().collect();
    let t: Vec<char> = term.chars().collect();
    if q.is_empty() {
        return 0.0;
    }
    if t.is_empty() {
        return 0.0;
    }

    let n = t.len();
    let mut prev2: Vec<usize> = vec![0; n + 1];
    let mut prev: Vec<usize> = vec![0; n + 1];
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, qc) in q.iter().enumerate() {
        curr[0] = i + 1;
        for (j, tc) in t.iter().enumerate() {
            let cost = usize::from(qc != tc);
            let mut best = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            if i > 0 && j > 0 && q[i] == t[j - 1] && q[i - 1] == t[j] {
                best = best.min(prev2[j - 1] + 1);
            }
            curr[j + 1] = best;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let edits = prev.iter().copied().min().unwrap_or(q.len());
    1.0 - edits as f32 / q.len() as f32
}

// ============================================================================
// Searcher (shared, rebuildable)
// ============================================================================

/// A shared search index that can be rebuilt as the candidate set changes.
///
/// Rebuilding replaces the whole index atomically: readers either see the
/// previous complete index or the new one, never a partial state. Searching
/// before the first build fails with [`SearchError::IndexNotBuilt`].
#[derive(Default)]
pub struct Searcher {
    index: RwLock<Option<SearchIndex>>,
}

impl Searcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index with one built from `candidates`.
    pub fn rebuild(&self, candidates: Vec<Candidate>, options: SearcherOptions) {
        let index = SearchIndex::build(candidates, options);
        *self.index.write().unwrap() = Some(index);
    }

    /// Queries the most recently built index.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        match &*self.index.read().unwrap() {
            Some(index) => Ok(index.search(query)),
            None => Err(SearchError::IndexNotBuilt),
        }
    }

    /// Whether an index has been built (possibly empty).
    pub fn is_built(&self) -> bool {
        self.index.read().unwrap().is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn icons() -> Vec<Candidate> {
        vec![
            Candidate::new("Rust", 0),
            Candidate::with_aliases("PostgreSQL", ["postgres"], 1),
            Candidate::new("JavaScript", 2),
            Candidate::with_aliases("GitHub", ["gh"], 3),
        ]
    }

    #[test]
    fn exact_substring_scores_one() {
        assert_eq!(substring_similarity("script", "javascript"), 1.0);
        assert_eq!(substring_similarity("rust", "rust"), 1.0);
    }

    #[test]
    fn one_edit_costs_one_over_query_length() {
        // "smple" vs "simple": one insertion.
        let score = substring_similarity("smple", "simple");
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn transposition_is_a_single_edit() {
        let score = substring_similarity("jaavscript", "javascript");
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn search_ranks_best_match_first() {
        let index = SearchIndex::build(icons(), SearcherOptions::default());
        let hits = index.search("postgres");

        assert!(!hits.is_empty());
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].term, "postgres");
        assert_eq!(hits[0].score, 1.0);
    }

    #[test]
    fn results_only_come_from_the_candidate_set() {
        let index = SearchIndex::build(icons(), SearcherOptions::default());
        let known: Vec<usize> = icons().iter().map(|c| c.id).collect();

        for hit in index.search("a") {
            assert!(known.contains(&hit.id));
        }
    }

    #[test]
    fn empty_query_matches_nothing() {
        let index = SearchIndex::build(icons(), SearcherOptions::default());
        assert!(index.search("").is_empty());
        assert!(index.search("   ").is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let index = SearchIndex::build(icons(), SearcherOptions::default());
        let hits = index.search("RUST");
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[0].score, 1.0);
    }

    #[test]
    fn threshold_drops_weak_matches() {
        let strict = SearchIndex::build(icons(), SearcherOptions { threshold: 1.0 });
        assert!(strict.search("rst").is_empty());

        let lax = SearchIndex::build(icons(), SearcherOptions { threshold: 0.5 });
        assert!(lax.search("rst").iter().any(|hit| hit.id == 0));
    }

    #[test]
    fn searcher_fails_before_first_build() {
        let searcher = Searcher::new();
        assert!(!searcher.is_built());
        assert_eq!(searcher.search("rust"), Err(SearchError::IndexNotBuilt));
    }

    #[test]
    fn searcher_built_empty_is_not_an_error() {
        let searcher = Searcher::new();
        searcher.rebuild(Vec::new(), SearcherOptions::default());

        assert!(searcher.is_built());
        assert_eq!(searcher.search("rust"), Ok(Vec::new()));
    }

    #[test]
    fn rebuild_fully_replaces_the_candidate_set() {
        let searcher = Searcher::new();
        searcher.rebuild(icons(), SearcherOptions::default());
        assert_eq!(searcher.search("rust").unwrap()[0].id, 0);

        searcher.rebuild(
            vec![Candidate::new("Zig", 9)],
            SearcherOptions::default(),
        );

        let hits = searcher.search("rust").unwrap();
        assert!(
            hits.iter().all(|hit| hit.id == 9),
            "no hits from the previous set may survive a rebuild"
        );
        assert_eq!(searcher.search("zig").unwrap()[0].id, 9);
    }
}
