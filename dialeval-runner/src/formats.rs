//! Readers for the on-disk resource formats.

use dialeval_core::{Embeddings, ResourceError};
use std::path::Path;

fn read_text(path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// One entry per line, each split on whitespace.
pub fn read_token_lists(path: &Path) -> Result<Vec<Vec<String>>, ResourceError> {
    Ok(read_text(path)?
        .lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect())
}

/// One entry per line, line terminators stripped.
pub fn read_lines(path: &Path) -> Result<Vec<String>, ResourceError> {
    Ok(read_text(path)?.lines().map(str::to_string).collect())
}

/// One set per line: TAB-separated items, each split on whitespace.
pub fn read_token_sets(path: &Path) -> Result<Vec<Vec<Vec<String>>>, ResourceError> {
    Ok(read_text(path)?
        .lines()
        .map(|line| {
            line.split('\t')
                .map(|item| item.split_whitespace().map(str::to_string).collect())
                .collect()
        })
        .collect())
}

/// A word2vec table; binary when the file name ends in `.bin`.
pub fn read_embeddings(path: &Path) -> Result<Embeddings, ResourceError> {
    let is_binary = path.extension().and_then(|e| e.to_str()) == Some("bin");
    if is_binary {
        let bytes = std::fs::read(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_word2vec_binary(&bytes).map_err(|message| malformed(path, message))
    } else {
        parse_word2vec_text(&read_text(path)?).map_err(|message| malformed(path, message))
    }
}

fn malformed(path: &Path, message: String) -> ResourceError {
    ResourceError::Malformed {
        path: path.to_path_buf(),
        message,
    }
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let vocab = parts.next()?.parse().ok()?;
    let dim = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((vocab, dim))
}

/// Text format: optional `<vocab> <dim>` header, then `<word> <floats...>` lines.
pub fn parse_word2vec_text(text: &str) -> Result<Embeddings, String> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()).peekable();

    let first = match lines.peek() {
        None => return Ok(Embeddings::new(0)),
        Some(&(_, first)) => first,
    };
    let dim = match parse_header(first) {
        Some((_, dim)) => {
            lines.next();
            dim
        }
        None => first.split_whitespace().count().saturating_sub(1),
    };

    let mut table = Embeddings::new(dim);
    for (number, line) in lines {
        let mut parts = line.split_whitespace();
        let word = parts.next().unwrap_or_default();
        let vector = parts
            .map(|x| x.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("line {}: {}", number + 1, e))?;
        if !table.insert(word, vector) {
            return Err(format!("line {}: expected {} values", number + 1, dim));
        }
    }
    Ok(table)
}

/// Binary format: `<vocab> <dim>\n` then `<word> <dim little-endian f32>` records.
pub fn parse_word2vec_binary(bytes: &[u8]) -> Result<Embeddings, String> {
    let header_end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| "missing header".to_string())?;
    let header = String::from_utf8_lossy(&bytes[..header_end]);
    let (vocab, dim) = parse_header(&header).ok_or_else(|| format!("bad header '{}'", header))?;

    let mut table = Embeddings::new(dim);
    let mut pos = header_end + 1;
    for index in 0..vocab {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let word_len = bytes[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| format!("record {}: truncated word", index))?;
        let word = String::from_utf8_lossy(&bytes[pos..pos + word_len]).into_owned();
        pos += word_len + 1;

        let truncated = || format!("record {}: truncated vector", index);
        let end = dim
            .checked_mul(4)
            .and_then(|len| pos.checked_add(len))
            .ok_or_else(truncated)?;
        let raw = bytes.get(pos..end).ok_or_else(truncated)?;
        let vector = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        table.insert(word, vector);
        pos = end;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8], suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_read_token_lists() {
        let file = write_temp(b"hello  world\n\nbye\n", ".txt");
        let lists = read_token_lists(file.path()).unwrap();
        assert_eq!(
            lists,
            vec![vec!["hello", "world"], vec![], vec!["bye"]]
        );
    }

    #[test]
    fn test_read_lines_keeps_spacing() {
        let file = write_temp(b"a  b\r\nc\n", ".txt");
        assert_eq!(read_lines(file.path()).unwrap(), vec!["a  b", "c"]);
    }

    #[test]
    fn test_read_token_sets() {
        let file = write_temp(b"a b\tc\nd\n", ".txt");
        let sets = read_token_sets(file.path()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0], vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(sets[1], vec![vec!["d"]]);
    }

    #[test]
    fn test_word2vec_text_with_header() {
        let table = parse_word2vec_text("2 3\ncat 1 0 0\ndog 0 1 0\n").unwrap();
        assert_eq!(table.dim(), 3);
        assert_eq!(table.get("dog"), Some(&[0.0f32, 1.0, 0.0][..]));
    }

    #[test]
    fn test_word2vec_text_without_header() {
        let table = parse_word2vec_text("cat 0.5 0.5\n").unwrap();
        assert_eq!(table.dim(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_word2vec_text_rejects_ragged_rows() {
        assert!(parse_word2vec_text("cat 1 0\ndog 1\n").is_err());
    }

    #[test]
    fn test_word2vec_binary() {
        let mut bytes = b"2 2\n".to_vec();
        for (word, vector) in [("cat", [1.0f32, 0.0]), ("dog", [0.0f32, -1.5])] {
            bytes.extend_from_slice(word.as_bytes());
            bytes.push(b' ');
            for x in vector {
                bytes.extend_from_slice(&x.to_le_bytes());
            }
            bytes.push(b'\n');
        }

        let file = write_temp(&bytes, ".bin");
        let table = read_embeddings(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("dog"), Some(&[0.0f32, -1.5][..]));
    }

    #[test]
    fn test_word2vec_binary_truncated() {
        let mut bytes = b"1 2\ncat ".to_vec();
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(parse_word2vec_binary(&bytes).is_err());
    }

    #[test]
    fn test_word2vec_binary_oversized_dim() {
        let err = parse_word2vec_binary(b"1 4611686018427387904\nw x").unwrap_err();
        assert_eq!(err, "record 0: truncated vector");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_lines(Path::new("/definitely/missing.txt")),
            Err(ResourceError::Io { .. })
        ));
    }
}
