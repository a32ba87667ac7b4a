//! Index persistence: round-trips, header inference, determinism,
//! corruption handling.

use cwindex::builder::{build_table, BuildOptions, BuilderKind, SearchStrategy};
use cwindex::hash::{CwsHasher, HashKernel, IntHasher, Precision};
use cwindex::index::{load_index, read_header, save_index, IndexError};
use cwindex::tf::TfMode;

fn corpus() -> Vec<Vec<u32>> {
    vec![vec![10u32, 10, 20], vec![20u32, 30], vec![1u32, 2, 1, 10]]
}

#[test]
fn integer_index_roundtrip() {
    let docs = corpus();
    let hasher = IntHasher::new(4, 40, 17);
    let table = build_table(&docs, &hasher, BuildOptions::default());

    let file = tempfile::NamedTempFile::new().unwrap();
    save_index(file.path(), &hasher, &table).unwrap();

    let header = read_header(file.path()).unwrap();
    assert_eq!(header.k, 4);
    assert_eq!(header.token_num, 40);
    assert_eq!(header.tf_mode, TfMode::Raw);
    assert!(!header.use_idf);
    assert_eq!(header.precision(), Precision::Integer);

    let (back_hasher, back_table) = load_index::<_, IntHasher>(file.path()).unwrap();
    assert_eq!(back_hasher.seed(), 17);
    assert_eq!(back_table.per_hash, table.per_hash);
}

#[test]
fn cws_index_roundtrip_with_corpus_idf() {
    // LogNorm + corpus IDF forces the real (f64) window layout.
    let docs = corpus();
    let mut hasher = CwsHasher::new(3, 40, TfMode::LogNorm, 5);
    hasher.idf_from_corpus(&docs);
    let table = build_table(&docs, &hasher, BuildOptions::default());

    let file = tempfile::NamedTempFile::new().unwrap();
    save_index(file.path(), &hasher, &table).unwrap();

    let header = read_header(file.path()).unwrap();
    assert_eq!(header.precision(), Precision::Real);
    assert!(header.use_idf);
    assert_eq!(header.tf_mode, TfMode::LogNorm);

    let (back_hasher, back_table) = load_index::<_, CwsHasher>(file.path()).unwrap();
    assert_eq!(back_hasher.idf(), hasher.idf());
    assert_eq!(back_hasher.tf_mode(), TfMode::LogNorm);
    // Bit-for-bit window equality, including the f64 values.
    assert_eq!(back_table.per_hash.len(), table.per_hash.len());
    for (lhs, rhs) in back_table.per_hash.iter().zip(&table.per_hash) {
        assert_eq!(lhs.len(), rhs.len());
        for (l, r) in lhs.iter().zip(rhs) {
            assert_eq!((l.doc, l.a, l.b, l.c, l.d), (r.doc, r.a, r.b, r.c, r.d));
            assert_eq!(l.value.to_bits(), r.value.to_bits());
        }
    }
}

#[test]
fn independent_builds_are_byte_identical() {
    let docs = corpus();
    let options = BuildOptions {
        builder: BuilderKind::Monotonic,
        active: true,
        strategy: SearchStrategy::Binary,
    };

    let file_a = tempfile::NamedTempFile::new().unwrap();
    let file_b = tempfile::NamedTempFile::new().unwrap();

    let hasher_a = IntHasher::new(8, 40, 99);
    let table_a = build_table(&docs, &hasher_a, options);
    save_index(file_a.path(), &hasher_a, &table_a).unwrap();

    let hasher_b = IntHasher::new(8, 40, 99);
    let table_b = build_table(&docs, &hasher_b, options);
    save_index(file_b.path(), &hasher_b, &table_b).unwrap();

    let bytes_a = std::fs::read(file_a.path()).unwrap();
    let bytes_b = std::fs::read(file_b.path()).unwrap();
    assert!(!bytes_a.is_empty());
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn all_builders_roundtrip() {
    let docs = corpus();
    for builder in [
        BuilderKind::Monotonic,
        BuilderKind::AllAlign,
        BuilderKind::SingleColumn,
    ] {
        let hasher = IntHasher::new(2, 40, 3);
        let options = BuildOptions {
            builder,
            ..BuildOptions::default()
        };
        let table = build_table(&docs, &hasher, options);
        let file = tempfile::NamedTempFile::new().unwrap();
        save_index(file.path(), &hasher, &table).unwrap();
        let (_, back) = load_index::<_, IntHasher>(file.path()).unwrap();
        assert_eq!(back.per_hash, table.per_hash, "{:?}", builder);
    }
}

#[test]
fn truncated_file_is_a_format_error() {
    let docs = corpus();
    let hasher = IntHasher::new(2, 40, 0);
    let table = build_table(&docs, &hasher, BuildOptions::default());
    let file = tempfile::NamedTempFile::new().unwrap();
    save_index(file.path(), &hasher, &table).unwrap();

    let bytes = std::fs::read(file.path()).unwrap();
    let cut = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(cut.path(), &bytes[..bytes.len() / 2]).unwrap();

    match load_index::<_, IntHasher>(cut.path()) {
        Err(IndexError::Format { .. }) => {}
        other => panic!("expected format error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn missing_file_reports_path() {
    let err = read_header("does-not-exist.index").unwrap_err();
    match err {
        IndexError::Open { path, .. } => {
            assert_eq!(path, std::path::Path::new("does-not-exist.index"))
        }
        other => panic!("expected open error, got {:?}", other),
    }
}

#[test]
fn wrong_kernel_is_rejected() {
    let docs = corpus();
    let hasher = CwsHasher::new(2, 40, TfMode::Square, 0);
    let table = build_table(&docs, &hasher, BuildOptions::default());
    let file = tempfile::NamedTempFile::new().unwrap();
    save_index(file.path(), &hasher, &table).unwrap();

    assert!(matches!(
        load_index::<_, IntHasher>(file.path()),
        Err(IndexError::Hasher(_))
    ));
}
