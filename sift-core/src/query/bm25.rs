//! BM25 scoring
//!
//! Shared by WAND scoring and by callers computing per-list upper bounds.

use crate::config::{BM25_B, BM25_K1};
use crate::Score;

/// Inverse document frequency, BM25 variant (never negative)
#[inline]
pub fn bm25_idf(doc_freq: u32, total_docs: u32) -> Score {
    let df = doc_freq as f32;
    let n = total_docs.max(doc_freq) as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Score of one term occurrence
///
/// * `tf` - Term frequency in the document
/// * `idf` - Inverse document frequency of the term
/// * `doc_len` - Document length
/// * `avg_doc_len` - Average document length of the collection
#[inline]
pub fn bm25_score(tf: f32, idf: Score, doc_len: f32, avg_doc_len: f32) -> Score {
    // Without a usable average every document counts as average length
    let relative_len = if avg_doc_len > 0.0 {
        doc_len / avg_doc_len
    } else {
        1.0
    };
    let length_norm = 1.0 - BM25_B + BM25_B * relative_len;
    let tf_norm = (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * length_norm);
    idf * tf_norm
}

/// Largest score a term can contribute: its maximum frequency in the
/// shortest possible document
#[inline]
pub fn bm25_upper_bound(max_tf: u32, idf: Score) -> Score {
    let min_length_norm = 1.0 - BM25_B;
    let max_tf = max_tf as f32;
    let tf_norm = (max_tf * (BM25_K1 + 1.0)) / (max_tf + BM25_K1 * min_length_norm);
    idf * tf_norm
}
