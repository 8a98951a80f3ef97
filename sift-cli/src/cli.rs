use clap::{Parser, Subcommand, ValueEnum};
use sift_core::compression::CodecKind;
use sift_core::query::Membership;
use sift_core::Direction;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sift",
    about = "Build and query block-compressed posting pools",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a pool snapshot from a JSON posting file
    Build {
        /// Input JSON file with `terms` and optional `doc_lengths`
        #[arg(short, long)]
        input: PathBuf,

        /// Output snapshot path; the term dictionary is written next to it
        #[arg(short, long)]
        output: PathBuf,

        /// Traversal order of every list
        #[arg(long, value_enum, default_value_t = DirectionArg::Ascending)]
        direction: DirectionArg,

        /// Block codec
        #[arg(long, value_enum, default_value_t = CodecArg::Bitpack)]
        codec: CodecArg,

        /// Bloom filter bits per docID (0 disables filters)
        #[arg(long, default_value_t = sift_core::config::BLOOM_BITS_PER_ELEMENT)]
        bloom_bits: u32,

        /// Segment capacity in words
        #[arg(long, default_value_t = sift_core::config::DEFAULT_SEGMENT_WORDS)]
        segment_words: usize,
    },

    /// Print pool configuration and storage statistics
    Stats {
        /// Snapshot path
        pool: PathBuf,
    },

    /// Run a query against a pool snapshot
    Query {
        /// Snapshot path
        pool: PathBuf,

        /// Query terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// Query algorithm
        #[arg(short, long, value_enum, default_value_t = Algorithm::Wand)]
        algorithm: Algorithm,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = 10)]
        hits: usize,

        /// Membership checking for BWAND
        #[arg(long, value_enum, default_value_t = MembershipArg::Exact)]
        membership: MembershipArg,

        /// Score WAND candidates by upper bounds instead of BM25
        #[arg(long)]
        no_frequencies: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Galloping small-vs-small intersection
    Svs,
    /// Bloom-accelerated conjunction
    And,
    /// Bloom-accelerated disjunction ranked by upper bounds
    Or,
    /// WAND top-k with BM25
    Wand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Ascending,
    Descending,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Ascending => Direction::Ascending,
            DirectionArg::Descending => Direction::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    Bitpack,
    Lz4,
}

impl From<CodecArg> for CodecKind {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Bitpack => CodecKind::BitPack,
            CodecArg::Lz4 => CodecKind::Lz4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MembershipArg {
    Bloom,
    Exact,
}

impl From<MembershipArg> for Membership {
    fn from(arg: MembershipArg) -> Self {
        match arg {
            MembershipArg::Bloom => Membership::Bloom,
            MembershipArg::Exact => Membership::Exact,
        }
    }
}
