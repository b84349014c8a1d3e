//! Okapi BM25 relevance scoring over a fixed corpus.
//!
//! [`Bm25Index`] is a small, self-contained ranking engine: documents are
//! tokenized once at build time and scored against free-text queries with
//! the classic BM25 formula
//!
//! ```text
//! score(D, Q) = Σ IDF(q) · tf(q, D) · (k1 + 1) / (tf(q, D) + k1 · (1 − b + b · |D| / avgdl))
//! IDF(q)      = ln((N − n_q + 0.5) / (n_q + 0.5) + 1)
//! ```
//!
//! The index is immutable once built, so a shared reference can be searched
//! from any number of threads.

use std::collections::HashMap;

/// Default term-frequency saturation parameter.
pub const DEFAULT_K1: f64 = 1.5;

/// Default document-length normalization parameter.
pub const DEFAULT_B: f64 = 0.75;

/// Split text into lower-cased tokens.
///
/// A token is a maximal run of alphanumeric characters or underscores;
/// everything else is a separator. `"read_file(path)"` yields
/// `["read_file", "path"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A tokenized document with its term-frequency table.
#[derive(Debug, Clone)]
struct Document {
    tokens: Vec<String>,
    term_freqs: HashMap<String, u32>,
}

impl Document {
    fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let mut term_freqs = HashMap::new();
        for token in &tokens {
            *term_freqs.entry(token.clone()).or_insert(0) += 1;
        }
        Self { tokens, term_freqs }
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// BM25 index over a batch of text documents.
///
/// Documents are addressed by their insertion index. Search results are
/// sorted by descending score with ties broken by ascending document index,
/// so output is deterministic for a given corpus and query.
///
/// # Example
///
/// ```
/// use cinch_search::search::bm25::Bm25Index;
///
/// let mut index = Bm25Index::new();
/// index.add_documents(["read a file from disk", "fetch a url over http"]);
///
/// let hits = index.search("http", 5);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].0, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Bm25Index {
    k1: f64,
    b: f64,
    docs: Vec<Document>,
    /// Number of documents containing each term.
    doc_freqs: HashMap<String, usize>,
    avg_doc_len: f64,
    /// IDF per term, rebuilt whenever the corpus changes.
    idf: HashMap<String, f64>,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Bm25Index {
    /// Create an empty index with the default `k1` and `b`.
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    /// Create an empty index with custom BM25 parameters.
    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            k1,
            b,
            docs: Vec::new(),
            doc_freqs: HashMap::new(),
            avg_doc_len: 0.0,
            idf: HashMap::new(),
        }
    }

    /// Tokenize and index a batch of documents.
    ///
    /// Intended to be called once with the whole corpus. Calling it again
    /// appends the new documents and recomputes corpus statistics; cached
    /// IDF values are discarded and rebuilt.
    pub fn add_documents<I, S>(&mut self, documents: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for text in documents {
            let doc = Document::new(text.as_ref());
            for term in doc.term_freqs.keys() {
                *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            self.docs.push(doc);
        }

        let total_len: usize = self.docs.iter().map(Document::len).sum();
        self.avg_doc_len = if self.docs.is_empty() {
            0.0
        } else {
            total_len as f64 / self.docs.len() as f64
        };

        self.idf.clear();
        let n = self.docs.len() as f64;
        for (term, &df) in &self.doc_freqs {
            let df = df as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            self.idf.insert(term.clone(), idf);
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Average document length in tokens.
    pub fn avg_doc_len(&self) -> f64 {
        self.avg_doc_len
    }

    /// Inverse document frequency of a term, if the term occurs in the corpus.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// Rank documents against `query`.
    ///
    /// Returns at most `limit` `(document_index, score)` pairs with a
    /// strictly positive score.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(usize, f64)> {
        if self.docs.is_empty() || limit == 0 {
            return Vec::new();
        }
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .docs
            .iter()
            .enumerate()
            .filter_map(|(i, doc)| {
                let score = self.score(doc, &terms);
                (score > 0.0).then_some((i, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
    }

    fn score(&self, doc: &Document, terms: &[String]) -> f64 {
        // All-empty corpus: drop length normalization.
        let norm = if self.avg_doc_len > 0.0 {
            self.k1 * (1.0 - self.b + self.b * doc.len() as f64 / self.avg_doc_len)
        } else {
            self.k1
        };

        terms
            .iter()
            .filter_map(|term| {
                let tf = f64::from(*doc.term_freqs.get(term)?);
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                Some(idf * tf * (self.k1 + 1.0) / (tf + norm))
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn corpus() -> Bm25Index {
        let mut index = Bm25Index::new();
        index.add_documents([
            "read_file read_file read_file Read a file from disk",
            "write_file write_file write_file Write a file to disk",
            "http_get http_get http_get Fetch a URL over HTTP",
        ]);
        index
    }

    #[test]
    fn tokenize_lowercases_and_splits_on_punctuation() {
        assert_eq!(
            tokenize("Read_File(path: &str) -> HTTP!"),
            vec!["read_file", "path", "str", "http"]
        );
        assert!(tokenize("  \t ").is_empty());
    }

    #[test]
    fn unique_term_ranks_its_document_first() {
        let index = corpus();
        let hits = index.search("url", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 2);
        assert!(hits[0].1 > 0.0);
    }

    #[test]
    fn shared_term_matches_every_containing_document() {
        let index = corpus();
        let hits = index.search("disk", 10);
        let ids: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(ids, vec![0, 1]);
        // Equal length, equal tf: tie broken by document index.
        assert!((hits[0].1 - hits[1].1).abs() < 1e-12);
    }

    #[test]
    fn limit_truncates_results() {
        let index = corpus();
        assert_eq!(index.search("a", 2).len(), 2);
        assert!(index.search("a", 0).is_empty());
    }

    #[test]
    fn empty_corpus_returns_nothing() {
        let index = Bm25Index::new();
        assert!(index.search("anything", 5).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn blank_query_returns_nothing() {
        let index = corpus();
        assert!(index.search("", 5).is_empty());
        assert!(index.search("   ", 5).is_empty());
        assert!(index.search("!!! ---", 5).is_empty());
    }

    #[test]
    fn all_empty_documents_do_not_divide_by_zero() {
        let mut index = Bm25Index::new();
        index.add_documents(["", "  ", "..."]);
        assert_eq!(index.avg_doc_len(), 0.0);
        assert!(index.search("file", 5).is_empty());
    }

    #[test]
    fn idf_formula_matches_definition() {
        let index = corpus();
        // "disk" occurs in 2 of 3 documents.
        let expected = ((3.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0_f64).ln();
        let idf = index.idf("disk").unwrap();
        assert!((idf - expected).abs() < 1e-12);
        assert!(index.idf("missing").is_none());
    }

    #[test]
    fn single_document_score_matches_formula() {
        let mut index = Bm25Index::new();
        index.add_documents(["alpha beta", "gamma"]);
        let hits = index.search("alpha", 5);
        let idf = ((2.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0_f64).ln();
        let avgdl = 1.5;
        let expected = idf * (DEFAULT_K1 + 1.0)
            / (1.0 + DEFAULT_K1 * (1.0 - DEFAULT_B + DEFAULT_B * 2.0 / avgdl));
        assert_eq!(hits.len(), 1);
        assert!((hits[0].1 - expected).abs() < 1e-12);
    }

    #[test]
    fn appending_documents_refreshes_statistics() {
        let mut index = Bm25Index::new();
        index.add_documents(["shared term"]);
        let before = index.idf("shared").unwrap();
        index.add_documents(["unrelated words here"]);
        let after = index.idf("shared").unwrap();
        assert_eq!(index.len(), 2);
        assert!(after > before, "rarer term should gain idf");
        assert!((index.avg_doc_len() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn custom_params_change_scores() {
        let mut flat = Bm25Index::with_params(1.2, 0.0);
        let mut normalized = Bm25Index::with_params(1.2, 1.0);
        let docs = ["term", "term padding padding padding padding"];
        flat.add_documents(docs);
        normalized.add_documents(docs);

        let flat_hits = flat.search("term", 5);
        let norm_hits = normalized.search("term", 5);
        // b = 0 ignores length: both documents score the same.
        assert!((flat_hits[0].1 - flat_hits[1].1).abs() < 1e-12);
        // b = 1 penalizes the long document.
        assert_eq!(norm_hits[0].0, 0);
        assert!(norm_hits[0].1 > norm_hits[1].1);
    }

    proptest! {
        #[test]
        fn results_are_sorted_by_non_increasing_score(
            docs in prop::collection::vec("[a-e ]{0,24}", 1..12),
            query in "[a-e ]{1,8}",
            limit in 1usize..20,
        ) {
            let mut index = Bm25Index::new();
            index.add_documents(&docs);
            let hits = index.search(&query, limit);
            prop_assert!(hits.len() <= limit);
            for pair in hits.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
                if pair[0].1 == pair[1].1 {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }
            for (_, score) in &hits {
                prop_assert!(*score > 0.0);
            }
        }
    }
}
