//! Corpus and query-file I/O.
//!
//! Documents arrive as a flat binary stream of `[i32 length][length x i32]`
//! records in little-endian order; end of file between records ends the
//! corpus. Query tokens are whitespace-separated decimal ids in a text
//! file. IDF weights are one `"<tokenID>\t<idf>"` line per token.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::index::{IndexError, IndexResult};

fn open<P: AsRef<Path>>(path: P) -> IndexResult<File> {
    let path = path.as_ref();
    File::open(path).map_err(|source| IndexError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn format_err(message: impl Into<String>) -> IndexError {
    IndexError::Format {
        message: message.into(),
        expected: None,
        actual: None,
    }
}

/// Read a record length, distinguishing clean end-of-stream (`None`) from a
/// mid-field truncation.
fn read_len_opt<R: Read>(reader: &mut R) -> IndexResult<Option<i32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(i32::from_le_bytes(buf))),
        _ => Err(format_err("truncated document length")),
    }
}

fn read_record<R: Read>(reader: &mut R, len: i32) -> IndexResult<Vec<u32>> {
    if len < 0 {
        return Err(format_err(format!("negative document length {}", len)));
    }
    // Guard the allocation: a corrupt length should fail on read, not abort
    // on reserve.
    let mut doc = Vec::with_capacity((len as usize).min(1 << 20));
    for _ in 0..len {
        let token = reader
            .read_i32::<LittleEndian>()
            .map_err(|_| format_err("truncated document record"))?;
        if token < 0 {
            return Err(format_err(format!("negative token id {}", token)));
        }
        doc.push(token as u32);
    }
    Ok(doc)
}

/// Read every document in the stream.
pub fn read_docs<P: AsRef<Path>>(path: P) -> IndexResult<Vec<Vec<u32>>> {
    let mut reader = BufReader::new(open(&path)?);
    let mut docs = Vec::new();
    while let Some(len) = read_len_opt(&mut reader)? {
        docs.push(read_record(&mut reader, len)?);
    }
    log::info!(
        "read {} documents from {}",
        docs.len(),
        path.as_ref().display()
    );
    Ok(docs)
}

/// Read at most `limit` documents.
pub fn read_docs_limited<P: AsRef<Path>>(path: P, limit: usize) -> IndexResult<Vec<Vec<u32>>> {
    let mut reader = BufReader::new(open(&path)?);
    let mut docs = Vec::new();
    while docs.len() < limit {
        match read_len_opt(&mut reader)? {
            Some(len) => docs.push(read_record(&mut reader, len)?),
            None => break,
        }
    }
    log::info!(
        "read {} documents from {}",
        docs.len(),
        path.as_ref().display()
    );
    Ok(docs)
}

/// Re-chunk the token stream into exactly `doc_limit` documents of exactly
/// `len_limit` tokens each. Records are concatenated until a chunk fills;
/// the tail of a record that overflows a chunk is dropped. Fails when the
/// stream runs dry first.
pub fn read_docs_packed<P: AsRef<Path>>(
    path: P,
    doc_limit: usize,
    len_limit: usize,
) -> IndexResult<Vec<Vec<u32>>> {
    let mut reader = BufReader::new(open(&path)?);
    let mut docs = Vec::new();
    let mut current: Vec<u32> = Vec::with_capacity(len_limit);
    while let Some(len) = read_len_opt(&mut reader)? {
        if len < 0 {
            return Err(format_err(format!("negative document length {}", len)));
        }
        let take = (len as usize).min(len_limit - current.len());
        for _ in 0..take {
            let token = reader
                .read_i32::<LittleEndian>()
                .map_err(|_| format_err("truncated document record"))?;
            if token < 0 {
                return Err(format_err(format!("negative token id {}", token)));
            }
            current.push(token as u32);
        }
        // A record overflowing the chunk is cut: the excess is skipped, not
        // carried into the next chunk.
        for _ in take..len as usize {
            reader
                .read_i32::<LittleEndian>()
                .map_err(|_| format_err("truncated document record"))?;
        }
        if current.len() == len_limit {
            docs.push(std::mem::replace(&mut current, Vec::with_capacity(len_limit)));
            if docs.len() == doc_limit {
                break;
            }
        }
    }
    if docs.len() < doc_limit {
        return Err(IndexError::Format {
            message: "not enough documents in stream".to_string(),
            expected: Some(format!("{} documents of {} tokens", doc_limit, len_limit)),
            actual: Some(docs.len().to_string()),
        });
    }
    log::info!(
        "read {} packed documents from {}",
        docs.len(),
        path.as_ref().display()
    );
    Ok(docs)
}

/// Skip `start` records, then read up to `count` documents.
pub fn read_doc_sample<P: AsRef<Path>>(
    path: P,
    start: usize,
    count: usize,
) -> IndexResult<Vec<Vec<u32>>> {
    let mut reader = BufReader::new(open(&path)?);
    let mut skipped = 0;
    let mut docs = Vec::new();
    while docs.len() < count {
        match read_len_opt(&mut reader)? {
            Some(len) => {
                if skipped < start {
                    skipped += 1;
                    read_record(&mut reader, len)?;
                } else {
                    docs.push(read_record(&mut reader, len)?);
                }
            }
            None => break,
        }
    }
    Ok(docs)
}

/// Write documents in the binary record format; inverse of [`read_docs`].
pub fn write_docs<P: AsRef<Path>>(path: P, docs: &[Vec<u32>]) -> IndexResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IndexError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    for doc in docs {
        writer.write_i32::<LittleEndian>(doc.len() as i32)?;
        for &token in doc {
            writer.write_i32::<LittleEndian>(token as i32)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read whitespace-separated decimal token ids.
pub fn read_query_tokens<P: AsRef<Path>>(path: P) -> IndexResult<Vec<u32>> {
    let mut text = String::new();
    open(&path)?.read_to_string(&mut text)?;
    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        let token: i64 = word
            .parse()
            .map_err(|_| format_err(format!("not a token id: '{}'", word)))?;
        if !(0..=u32::MAX as i64).contains(&token) {
            return Err(format_err(format!("token id out of range: {}", token)));
        }
        tokens.push(token as u32);
    }
    Ok(tokens)
}

/// Parse an IDF file into a dense vector defaulting to 1.0.
///
/// Lines are `"<tokenID>\t<idf>"`. Malformed lines are reported and
/// skipped; ids outside the vocabulary are ignored.
pub fn read_idf_file<P: AsRef<Path>>(path: P, token_num: usize) -> IndexResult<Vec<f64>> {
    let reader = BufReader::new(open(&path)?);
    let mut idf = vec![1.0f64; token_num];
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let parsed = line.split_once('\t').and_then(|(token_str, idf_str)| {
            let token: usize = token_str.parse().ok()?;
            let value: f64 = idf_str.trim().parse().ok()?;
            Some((token, value))
        });
        match parsed {
            Some((token, value)) => {
                if token < token_num {
                    idf[token] = value;
                } else {
                    log::debug!("idf line {}: token {} outside vocabulary", line_no + 1, token);
                }
            }
            None => log::warn!("idf parse error on line {}: {}", line_no + 1, line),
        }
    }
    Ok(idf)
}
