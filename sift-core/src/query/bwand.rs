//! Bloom-accelerated Boolean retrieval
//!
//! List 0 drives the scan and is decoded block by block; every other list
//! is only probed for membership, so its blocks are decoded at most once
//! and often not at all.

use super::{BlockCursor, TopK};
use crate::compression::BlockCodec;
use crate::pool::{MembershipCursor, SegmentPool};
use crate::{BlockPtr, DocId, Result, Score, ScoredDoc, SiftError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How probed lists answer membership tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// Bloom filter answer only; may admit false positives
    Bloom,
    /// Bloom hits are confirmed against the decoded block
    #[default]
    Exact,
}

impl Membership {
    /// Cursor of this kind positioned at `head`
    pub fn cursor(self, head: BlockPtr) -> MembershipCursor {
        match self {
            Membership::Bloom => MembershipCursor::bloom(head),
            Membership::Exact => MembershipCursor::exact(head),
        }
    }
}

/// DocIDs of list 0 present in every other list, at most `hits` of them,
/// in traversal order
pub fn bwand_and(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    heads: &[BlockPtr],
    hits: usize,
    membership: Membership,
) -> Result<Vec<DocId>> {
    let mut results = Vec::new();
    if heads.is_empty() || hits == 0 {
        return Ok(results);
    }

    let mut driver = BlockCursor::open(pool, codec, heads[0], false)?;
    let mut probes: Vec<MembershipCursor> =
        heads[1..].iter().map(|&head| membership.cursor(head)).collect();

    'scan: while let Some(doc) = driver.doc() {
        let mut matched = true;
        for probe in probes.iter_mut() {
            if !pool.contains_doc_id(codec, doc, probe)? {
                if probe.block().is_null() {
                    // Probed list exhausted: nothing later can match
                    break 'scan;
                }
                matched = false;
                break;
            }
        }

        if matched {
            results.push(doc);
            if results.len() == hits {
                break;
            }
        }
        driver.advance()?;
    }

    debug!(
        lists = heads.len(),
        results = results.len(),
        ?membership,
        "BWAND AND finished"
    );
    Ok(results)
}

/// Rank docIDs of list 0 by the summed upper bounds of the lists that
/// contain them, keeping the `hits` best
pub fn bwand_or(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    heads: &[BlockPtr],
    upper_bounds: &[Score],
    hits: usize,
    membership: Membership,
) -> Result<Vec<ScoredDoc>> {
    if heads.len() != upper_bounds.len() {
        return Err(SiftError::Query(format!(
            "{} lists but {} upper bounds",
            heads.len(),
            upper_bounds.len()
        )));
    }
    let (results, scanned) = rank_or(pool, codec, heads, upper_bounds, hits, membership)?;
    debug!(
        lists = heads.len(),
        scanned,
        results = results.len(),
        ?membership,
        "BWAND OR finished"
    );
    Ok(results)
}

/// Ranked docIDs plus the number of list 0 postings visited
fn rank_or(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    heads: &[BlockPtr],
    upper_bounds: &[Score],
    hits: usize,
    membership: Membership,
) -> Result<(Vec<ScoredDoc>, usize)> {
    if heads.is_empty() || hits == 0 {
        return Ok((Vec::new(), 0));
    }

    // Summed in list order, the same order candidates accumulate in
    let max_score: Score = upper_bounds.iter().sum();

    let mut driver = BlockCursor::open(pool, codec, heads[0], false)?;
    let mut probes: Vec<MembershipCursor> =
        heads[1..].iter().map(|&head| membership.cursor(head)).collect();
    let mut topk = TopK::new(hits);
    let mut scanned = 0usize;

    while let Some(doc) = driver.doc() {
        scanned += 1;
        let mut score = upper_bounds[0];
        for (probe, &bound) in probes.iter_mut().zip(&upper_bounds[1..]) {
            if pool.contains_doc_id(codec, doc, probe)? {
                score += bound;
            }
        }
        topk.push(doc, score);

        if topk.threshold().is_some_and(|threshold| threshold >= max_score) {
            break;
        }
        driver.advance()?;
    }

    Ok((topk.into_sorted_vec(), scanned))
}
