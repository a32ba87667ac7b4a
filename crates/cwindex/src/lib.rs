//! Compressed-window min-hash indexing for approximate containment search.
//!
//! Given a corpus of tokenized documents, cwindex precomputes, for each of
//! `k` hash functions, the min-hash value of **every** sub-range of every
//! document - compressed into *windows*: maximal rectangles
//! `(a <= i <= b, c <= j <= d)` over which the minimum is one constant
//! value. A query is then answered by hashing it into a k-dimensional
//! signature and sweeping the windows that collide with the signature,
//! reporting document regions that agree on at least a fraction `threshold`
//! of the hash coordinates.
//!
//! # Pipeline
//!
//! 1. Load documents ([`corpus::read_docs`] and friends).
//! 2. Pick a hash kernel: [`hash::IntHasher`] for raw counts, or
//!    [`hash::CwsHasher`] (consistent weighted sampling) for weighted TF
//!    modes and IDF.
//! 3. Enumerate windows with one of three builders
//!    ([`builder::build_table`]).
//! 4. Persist ([`index::save_index`]) or query ([`query::QueryEngine`]).
//!
//! # Example
//!
//! ```rust
//! use cwindex::prelude::*;
//!
//! let docs = vec![vec![1u32, 2, 3], vec![1, 2, 4]];
//! let hasher = IntHasher::new(8, 16, 0);
//! let table = build_table(&docs, &hasher, BuildOptions::default());
//!
//! let engine = QueryEngine::new(hasher, table)?;
//! let hits = engine.search(&[1, 2], 0.5)?;
//! assert!(!hits.is_empty());
//! # Ok::<(), cwindex::error::BuildError>(())
//! ```
//!
//! # Determinism
//!
//! Everything is single-threaded and derived from the stored 64-bit seed;
//! two builds over the same corpus with the same parameters produce
//! byte-identical index files, and index files are portable across
//! platforms (the format is little-endian and the hash draws are pinned to
//! a fixed ChaCha20 derivation).

/// Term-frequency weighting strategies.
pub mod tf;

/// Deterministic hash kernels (integer linear hash, consistent weighted
/// sampling).
pub mod hash;

/// Window records and their wire codec.
pub mod window;

/// Dominant-interval sets (splay tree and naive backend).
pub mod splay;

/// The three window enumeration algorithms.
pub mod builder;

/// On-disk index format.
pub mod index;

/// Corpus, query-token and IDF file I/O.
pub mod corpus;

/// Query signature and two-level sweep.
pub mod query;

/// Error types for configuration and usage errors.
pub mod error;

/// Common imports.
pub mod prelude {
    pub use crate::builder::{
        build_table, validate, BuildOptions, BuilderKind, SearchStrategy, WindowTable,
    };
    pub use crate::error::BuildError;
    pub use crate::hash::{CwsHasher, HashKernel, IntHasher, Precision};
    pub use crate::index::{load_index, read_header, save_index, IndexError, IndexHeader};
    pub use crate::query::{DocHits, MatchRegion, QueryEngine, SweepMode};
    pub use crate::tf::TfMode;
    pub use crate::window::Window;
}
