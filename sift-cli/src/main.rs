//! Sift CLI - build, inspect and query posting pools

mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Algorithm, Cli, Commands};
use serde::{Deserialize, Serialize};
use sift_core::compression::CodecKind;
use sift_core::pool::{BloomConfig, ListBuilder, ListHandle, PoolConfig, SegmentPool};
use sift_core::query::{
    bm25_idf, bm25_upper_bound, bwand_and, bwand_or, intersect_svs, wand, CollectionStats,
    Membership, WandQuery,
};
use sift_core::{DocId, Direction, Score, ScoredDoc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Posting file read by `sift build`
#[derive(Deserialize)]
struct CorpusInput {
    /// Document length indexed by docID
    #[serde(default)]
    doc_lengths: Vec<u32>,
    /// Postings per term, in any order
    terms: BTreeMap<String, Vec<PostingInput>>,
}

#[derive(Deserialize)]
struct PostingInput {
    doc: DocId,
    #[serde(default = "default_tf")]
    tf: u32,
    #[serde(default)]
    positions: Vec<u32>,
}

fn default_tf() -> u32 {
    1
}

/// Term dictionary stored next to a snapshot
#[derive(Serialize, Deserialize)]
struct TermIndex {
    codec: CodecKind,
    total_docs: u32,
    doc_lengths: Vec<u32>,
    terms: BTreeMap<String, ListHandle>,
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    algorithm: &'a str,
    terms: &'a [String],
    results: Vec<ScoredDoc>,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            input,
            output,
            direction,
            codec,
            bloom_bits,
            segment_words,
        } => {
            let mut config = PoolConfig::default()
                .with_direction(direction.into())
                .with_segment_words(segment_words);
            if bloom_bits > 0 {
                config = config.with_bloom(BloomConfig::with_bits_per_element(bloom_bits));
            }
            run_build(&input, &output, config, codec.into())
        }
        Commands::Stats { pool } => run_stats(&pool),
        Commands::Query {
            pool,
            terms,
            algorithm,
            hits,
            membership,
            no_frequencies,
        } => run_query(&pool, &terms, algorithm, hits, membership.into(), !no_frequencies),
    }
}

fn terms_path(pool: &Path) -> PathBuf {
    let mut name = pool.as_os_str().to_owned();
    name.push(".terms.json");
    PathBuf::from(name)
}

fn run_build(input: &Path, output: &Path, config: PoolConfig, codec_kind: CodecKind) -> anyhow::Result<()> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let corpus: CorpusInput = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    let codec = codec_kind.codec();
    let mut pool = SegmentPool::new(config)?;
    let mut builder = ListBuilder::new(&mut pool, codec.as_ref());
    let mut terms = BTreeMap::new();
    let mut max_doc: Option<DocId> = None;

    for (term, mut postings) in corpus.terms {
        if postings.is_empty() {
            continue;
        }
        postings.sort_by_key(|p| p.doc);
        if config.direction == Direction::Descending {
            postings.reverse();
        }

        let doc_ids: Vec<DocId> = postings.iter().map(|p| p.doc).collect();
        let frequencies: Vec<u32> = postings.iter().map(|p| p.tf).collect();
        let positional = postings.iter().any(|p| !p.positions.is_empty());

        let handle = if positional {
            let positions: Vec<u32> = postings
                .iter()
                .flat_map(|p| p.positions.iter().copied())
                .collect();
            builder.positional(&doc_ids, &frequencies, &positions)
        } else {
            builder.with_frequencies(&doc_ids, &frequencies)
        }
        .with_context(|| format!("failed to store postings of '{}'", term))?;

        max_doc = max_doc.max(doc_ids.iter().copied().max());
        terms.insert(term, handle);
    }

    pool.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let total_docs = if corpus.doc_lengths.is_empty() {
        max_doc.map_or(0, |doc| doc + 1)
    } else {
        corpus.doc_lengths.len() as u32
    };
    let index = TermIndex {
        codec: codec_kind,
        total_docs,
        doc_lengths: corpus.doc_lengths,
        terms,
    };
    let dictionary = terms_path(output);
    fs::write(&dictionary, serde_json::to_vec_pretty(&index)?)
        .with_context(|| format!("failed to write {}", dictionary.display()))?;

    info!(
        terms = index.terms.len(),
        blocks = pool.block_count(),
        segments = pool.segment_count(),
        codec = codec.name(),
        "Built pool"
    );
    Ok(())
}

fn load(pool_path: &Path) -> anyhow::Result<(SegmentPool, TermIndex)> {
    let pool = SegmentPool::load(pool_path)
        .with_context(|| format!("failed to load {}", pool_path.display()))?;
    let dictionary = terms_path(pool_path);
    let raw = fs::read_to_string(&dictionary)
        .with_context(|| format!("failed to read {}", dictionary.display()))?;
    let index: TermIndex = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", dictionary.display()))?;
    Ok((pool, index))
}

fn run_stats(pool_path: &Path) -> anyhow::Result<()> {
    let (pool, index) = load(pool_path)?;
    let report = serde_json::json!({
        "config": pool.config(),
        "stats": pool.stats(),
        "codec": index.codec,
        "terms": index.terms.len(),
        "total_docs": index.total_docs,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_query(
    pool_path: &Path,
    terms: &[String],
    algorithm: Algorithm,
    hits: usize,
    membership: Membership,
    use_frequencies: bool,
) -> anyhow::Result<()> {
    let (pool, index) = load(pool_path)?;
    let codec = index.codec.codec();

    let mut handles = Vec::with_capacity(terms.len());
    for term in terms {
        match index.terms.get(term) {
            Some(handle) => handles.push(*handle),
            None => bail!("unknown term '{}'", term),
        }
    }

    let idfs: Vec<Score> = handles
        .iter()
        .map(|h| bm25_idf(h.doc_freq, index.total_docs))
        .collect();
    let upper_bounds: Vec<Score> = handles
        .iter()
        .zip(&idfs)
        .map(|(h, &idf)| bm25_upper_bound(h.max_frequency, idf))
        .collect();

    let results = match algorithm {
        Algorithm::Svs | Algorithm::And => {
            // Shortest list first
            let mut by_df = handles.clone();
            by_df.sort_by_key(|h| h.doc_freq);
            let heads: Vec<_> = by_df.iter().map(|h| h.head).collect();
            let docs = if algorithm == Algorithm::Svs {
                let min_df = by_df[0].doc_freq as usize;
                intersect_svs(&pool, codec.as_ref(), &heads, min_df, hits)?
            } else {
                bwand_and(&pool, codec.as_ref(), &heads, hits, membership)?
            };
            docs.into_iter().map(|doc| ScoredDoc::new(doc, 0.0)).collect()
        }
        Algorithm::Or => {
            let heads: Vec<_> = handles.iter().map(|h| h.head).collect();
            bwand_or(&pool, codec.as_ref(), &heads, &upper_bounds, hits, membership)?
        }
        Algorithm::Wand => {
            let heads: Vec<_> = handles.iter().map(|h| h.head).collect();
            let doc_freqs: Vec<u32> = handles.iter().map(|h| h.doc_freq).collect();
            let avg_doc_length = if index.doc_lengths.is_empty() {
                1.0
            } else {
                index.doc_lengths.iter().map(|&l| l as f64).sum::<f64>() as f32
                    / index.doc_lengths.len() as f32
            };
            let stats = CollectionStats {
                doc_lengths: &index.doc_lengths,
                total_docs: index.total_docs,
                avg_doc_length,
            };
            let query = WandQuery {
                heads: &heads,
                doc_freqs: &doc_freqs,
                upper_bounds: &upper_bounds,
            };
            wand(&pool, codec.as_ref(), query, &stats, hits, use_frequencies)?
        }
    };

    let name = match algorithm {
        Algorithm::Svs => "svs",
        Algorithm::And => "bwand-and",
        Algorithm::Or => "bwand-or",
        Algorithm::Wand => "wand",
    };
    let output = QueryOutput {
        algorithm: name,
        terms,
        results,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
