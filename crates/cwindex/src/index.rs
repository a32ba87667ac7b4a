//! On-disk index format.
//!
//! Little-endian throughout. Write order:
//!
//! 1. `i32 k`, `i32 token_num`
//! 2. hasher block: `i32 k`, `i32 token_num` (both repeated - the hasher
//!    serializes its own copy and the duplication is part of the format),
//!    `u8 use_idf`, `i32 tf_mode`, `u64 seed`, then `token_num` `f64` IDF
//!    entries iff `use_idf`
//! 3. for each hash id: `u64 window_count`, then that many window records
//!    (`i32 doc, a, b, c, d` + value)
//!
//! The value field is `i32` when the header implies integer precision (raw
//! TF, no IDF) and `f64` otherwise; the header alone determines the layout,
//! so readers inspect it first and then pick the kernel.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::builder::WindowTable;
use crate::error::BuildError;
use crate::hash::{HashKernel, Precision, StoredHasher};
use crate::tf::TfMode;
use crate::window::Window;

/// Errors from reading or writing index files.
#[derive(Debug)]
pub enum IndexError {
    /// Cannot open the file at all.
    Open {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    /// I/O error mid-stream.
    Io(std::io::Error),
    /// Malformed or truncated data.
    Format {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },
    /// Stored configuration does not fit the requested kernel.
    Hasher(BuildError),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Open { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
            IndexError::Io(e) => write!(f, "I/O error: {}", e),
            IndexError::Format {
                message,
                expected,
                actual,
            } => {
                write!(f, "format error: {}", message)?;
                if let Some(e) = expected {
                    write!(f, " (expected: {})", e)?;
                }
                if let Some(a) = actual {
                    write!(f, " (actual: {})", a)?;
                }
                Ok(())
            }
            IndexError::Hasher(e) => write!(f, "hasher configuration: {}", e),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Open { source, .. } => Some(source),
            IndexError::Io(e) => Some(e),
            IndexError::Hasher(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e)
    }
}

impl From<BuildError> for IndexError {
    fn from(e: BuildError) -> Self {
        IndexError::Hasher(e)
    }
}

/// Result type for index persistence.
pub type IndexResult<T> = Result<T, IndexError>;

fn truncated<T>(res: std::io::Result<T>, what: &str) -> IndexResult<T> {
    res.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            IndexError::Format {
                message: format!("truncated while reading {}", what),
                expected: None,
                actual: None,
            }
        } else {
            IndexError::Io(e)
        }
    })
}

/// Index file header, readable without loading the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub k: usize,
    pub token_num: usize,
    pub use_idf: bool,
    pub tf_mode: TfMode,
}

impl IndexHeader {
    /// Weight layout implied by the stored configuration.
    pub fn precision(&self) -> Precision {
        Precision::of(self.tf_mode, self.use_idf)
    }

    /// Read the header fields, including the duplicated hasher copy, from
    /// the start of an index stream.
    pub fn read_from<R: Read>(reader: &mut R) -> IndexResult<Self> {
        let k = truncated(reader.read_i32::<LittleEndian>(), "header k")?;
        let token_num = truncated(reader.read_i32::<LittleEndian>(), "header token_num")?;
        let hasher_k = truncated(reader.read_i32::<LittleEndian>(), "hasher k")?;
        let hasher_token_num =
            truncated(reader.read_i32::<LittleEndian>(), "hasher token_num")?;
        if k != hasher_k || token_num != hasher_token_num {
            return Err(IndexError::Format {
                message: "header and hasher parameters disagree".to_string(),
                expected: Some(format!("k={} token_num={}", k, token_num)),
                actual: Some(format!("k={} token_num={}", hasher_k, hasher_token_num)),
            });
        }
        if k < 0 || token_num < 0 {
            return Err(IndexError::Format {
                message: "negative header field".to_string(),
                expected: None,
                actual: Some(format!("k={} token_num={}", k, token_num)),
            });
        }
        let use_idf = truncated(reader.read_u8(), "use_idf flag")? != 0;
        let mode_code = truncated(reader.read_i32::<LittleEndian>(), "tf_mode")?;
        let tf_mode = TfMode::from_code(mode_code).ok_or_else(|| IndexError::Format {
            message: "unknown tf mode".to_string(),
            expected: Some("0..=4".to_string()),
            actual: Some(mode_code.to_string()),
        })?;
        Ok(Self {
            k: k as usize,
            token_num: token_num as usize,
            use_idf,
            tf_mode,
        })
    }
}

/// Read only the header of an index file.
pub fn read_header<P: AsRef<Path>>(path: P) -> IndexResult<IndexHeader> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IndexError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    IndexHeader::read_from(&mut BufReader::new(file))
}

/// Write a complete index to a stream.
pub fn write_index<W: Write, K: HashKernel>(
    writer: &mut W,
    hasher: &K,
    table: &WindowTable<K::Value>,
) -> IndexResult<()> {
    if table.k() != hasher.k() {
        return Err(IndexError::Format {
            message: "table and hasher disagree on k".to_string(),
            expected: Some(hasher.k().to_string()),
            actual: Some(table.k().to_string()),
        });
    }
    let stored = hasher.to_stored();

    writer.write_i32::<LittleEndian>(stored.k as i32)?;
    writer.write_i32::<LittleEndian>(stored.token_num as i32)?;

    // Hasher block, duplicated parameters included.
    writer.write_i32::<LittleEndian>(stored.k as i32)?;
    writer.write_i32::<LittleEndian>(stored.token_num as i32)?;
    writer.write_u8(stored.use_idf as u8)?;
    writer.write_i32::<LittleEndian>(stored.tf_mode.code())?;
    writer.write_u64::<LittleEndian>(stored.seed)?;
    if let Some(idf) = &stored.idf {
        for &v in idf {
            writer.write_f64::<LittleEndian>(v)?;
        }
    }

    for windows in &table.per_hash {
        writer.write_u64::<LittleEndian>(windows.len() as u64)?;
        for w in windows {
            w.write_to(writer)?;
        }
    }
    Ok(())
}

/// Read a complete index from a stream with the given kernel's layout.
pub fn read_index<R: Read, K: HashKernel>(reader: &mut R) -> IndexResult<(K, WindowTable<K::Value>)> {
    let header = IndexHeader::read_from(reader)?;
    let seed = truncated(reader.read_u64::<LittleEndian>(), "seed")?;
    let idf = if header.use_idf {
        let mut idf = vec![0.0f64; header.token_num];
        for slot in idf.iter_mut() {
            *slot = truncated(reader.read_f64::<LittleEndian>(), "idf entry")?;
        }
        Some(idf)
    } else {
        None
    };

    let hasher = K::from_stored(StoredHasher {
        k: header.k,
        token_num: header.token_num,
        use_idf: header.use_idf,
        tf_mode: header.tf_mode,
        seed,
        idf,
    })?;

    let mut table = WindowTable::new(header.k);
    for windows in table.per_hash.iter_mut() {
        let count = truncated(reader.read_u64::<LittleEndian>(), "window count")?;
        // Guard the allocation: a corrupt count should fail on read, not
        // abort on reserve.
        windows.reserve(count.min(1 << 20) as usize);
        for _ in 0..count {
            windows.push(truncated(Window::read_from(reader), "window record")?);
        }
    }
    Ok((hasher, table))
}

/// Save an index to a file.
pub fn save_index<P: AsRef<Path>, K: HashKernel>(
    path: P,
    hasher: &K,
    table: &WindowTable<K::Value>,
) -> IndexResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IndexError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_index(&mut writer, hasher, table)?;
    writer.flush()?;
    Ok(())
}

/// Load an index from a file. The caller picks the kernel after inspecting
/// [`read_header`].
pub fn load_index<P: AsRef<Path>, K: HashKernel>(path: P) -> IndexResult<(K, WindowTable<K::Value>)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IndexError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_index(&mut BufReader::new(file))
}
