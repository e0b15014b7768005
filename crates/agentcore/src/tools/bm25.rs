//! Hand-rolled BM25 lexical index over tool descriptors.
//!
//! Scale here is a few hundred tool descriptors at most, so a vendored
//! search-engine crate would be overkill -- lexical scoring over a
//! `HashMap<term, stats>` is plenty.

use agentcore_types::ToolDescriptor;
use std::collections::HashMap;

const K1: f64 = 1.2;
const B: f64 = 0.75;

struct Doc {
    name: String,
    kind_priority: u8,
    term_freqs: HashMap<String, usize>,
    len: usize,
}

/// BM25 index over the concatenation `name ⊕ description ⊕ param_names` of
/// each registered tool.
pub struct Bm25Index {
    docs: Vec<Doc>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

impl Bm25Index {
    pub fn build(descriptors: &[ToolDescriptor]) -> Self {
        let mut docs = Vec::with_capacity(descriptors.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for d in descriptors {
            let param_names: String = d
                .parameters_schema
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let text = format!("{} {} {}", d.name, d.description, param_names);
            let terms = tokenize(&text);
            total_len += terms.len();

            let mut term_freqs = HashMap::new();
            for term in &terms {
                *term_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            docs.push(Doc {
                name: d.name.clone(),
                kind_priority: d.kind.priority(),
                len: terms.len(),
                term_freqs,
            });
        }

        let avg_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };

        Self {
            docs,
            doc_freq,
            avg_len,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score(&self, doc: &Doc, query_terms: &[String]) -> f64 {
        query_terms
            .iter()
            .map(|term| {
                let tf = *doc.term_freqs.get(term).unwrap_or(&0) as f64;
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf(term);
                let denom = tf + K1 * (1.0 - B + B * doc.len as f64 / self.avg_len.max(1.0));
                idf * (tf * (K1 + 1.0)) / denom
            })
            .sum()
    }

    /// Top-`k` tool names by BM25 score. Ties break by (higher kind
    /// priority, then lexicographic name).
    pub fn search(&self, query: &str, k: usize) -> Vec<String> {
        let query_terms = tokenize(query);
        let mut scored: Vec<(f64, u8, &str)> = self
            .docs
            .iter()
            .map(|doc| (self.score(doc, &query_terms), doc.kind_priority, doc.name.as_str()))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(b.2))
        });

        scored.into_iter().take(k).map(|(_, _, name)| name.to_string()).collect()
    }
}
