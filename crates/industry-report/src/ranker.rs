/// Lexical relevance ranking of report paragraphs against a question.
///
/// Builds a TF-IDF space over `{query} ∪ paragraphs` for every call, so scores are only
/// comparable within one call. Tokens are lowercase runs of two or more word characters.
/// Weights use the smoothed idf `ln((1 + n) / (1 + df)) + 1` over raw term counts, and
/// vectors are L2-normalized before the cosine (dot product) is taken.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Number of passages handed to the summarizer per question.
pub const TOP_K: usize = 3;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid regex"))
}

fn term_counts(text: &str) -> HashMap<String, f64> {
    let lowered = text.to_lowercase();
    let mut counts = HashMap::new();
    for m in token_re().find_iter(&lowered) {
        *counts.entry(m.as_str().to_string()).or_insert(0.0) += 1.0;
    }
    counts
}

/// Cosine similarity between `query` and each paragraph, in input order.
pub fn score_paragraphs(query: &str, paragraphs: &[String]) -> Vec<f64> {
    let query_counts = term_counts(query);
    let paragraph_counts: Vec<HashMap<String, f64>> =
        paragraphs.iter().map(|p| term_counts(p)).collect();

    let n_docs = (paragraphs.len() + 1) as f64;
    let mut doc_freq: HashMap<&str, f64> = HashMap::new();
    for counts in std::iter::once(&query_counts).chain(paragraph_counts.iter()) {
        for term in counts.keys() {
            *doc_freq.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
    }
    let idf = |term: &str| -> f64 {
        let df = doc_freq.get(term).copied().unwrap_or(0.0);
        ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
    };

    let query_weights: HashMap<&str, f64> = query_counts
        .iter()
        .map(|(term, tf)| (term.as_str(), tf * idf(term.as_str())))
        .collect();
    let query_norm = l2_norm(query_weights.values().copied());

    paragraph_counts
        .iter()
        .map(|counts| {
            if query_norm == 0.0 {
                return 0.0;
            }
            let mut dot = 0.0;
            let mut sum_sq = 0.0;
            for (term, tf) in counts {
                let w = tf * idf(term.as_str());
                sum_sq += w * w;
                if let Some(qw) = query_weights.get(term.as_str()) {
                    dot += qw * w;
                }
            }
            let norm = sum_sq.sqrt();
            if norm == 0.0 {
                0.0
            } else {
                dot / (query_norm * norm)
            }
        })
        .collect()
}

fn l2_norm(values: impl Iterator<Item = f64>) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}

/// Return up to `k` paragraphs most similar to `query`, best first.
///
/// Equal scores keep their original paragraph order, so zero-overlap queries still get a
/// deterministic (if unhelpful) selection.
pub fn rank_paragraphs<'a>(query: &str, paragraphs: &'a [String], k: usize) -> Vec<&'a str> {
    let scores = score_paragraphs(query, paragraphs);
    let mut order: Vec<usize> = (0..paragraphs.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    order
        .into_iter()
        .take(k)
        .map(|i| paragraphs[i].as_str())
        .collect()
}
