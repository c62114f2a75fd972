//! Line encoding of the index
//!
//! Each group is one line: `identity,path1,path2,...,pathN`. There is no
//! escaping, so paths may not contain commas or line breaks.

use super::types::WorkIndex;

/// Encode an index as newline-separated lines (no trailing newline)
pub fn encode_lines(index: &WorkIndex) -> String {
    let mut out = String::new();
    for (i, (hash, paths)) in index.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(hash);
        for path in paths {
            out.push(',');
            out.push_str(path);
        }
    }
    out
}

/// Decode index lines
///
/// Blank lines, lines with an empty identity, and lines with no paths are
/// skipped silently. Empty path fields are dropped. Fields are kept byte for
/// byte, so paths with surrounding whitespace survive a round trip.
pub fn decode_lines(text: &str) -> WorkIndex {
    text.lines()
        .filter_map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                return None;
            }

            let mut fields = line.split(',');
            let hash = fields.next()?;
            if hash.is_empty() {
                return None;
            }

            let paths: Vec<String> = fields
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if paths.is_empty() {
                return None;
            }

            Some((hash.to_string(), paths))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_format() {
        let mut index = WorkIndex::new();
        index.insert_new("h2".into(), vec!["/c".into()]);
        index.insert_new("h1".into(), vec!["/a".into(), "/b".into()]);

        assert_eq!(encode_lines(&index), "h1,/a,/b\nh2,/c");
        assert_eq!(encode_lines(&WorkIndex::new()), "");
    }

    #[test]
    fn test_decode_skips_blank_and_malformed() {
        let text = "h1,/a,/b\n\n   \nh2\n,/orphan\nh3,/c\r\n";
        let index = decode_lines(text);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("h1").unwrap(), &["/a".to_string(), "/b".to_string()]);
        assert_eq!(index.get("h3").unwrap(), &["/c".to_string()]);
        assert!(!index.contains("h2"));
    }

    #[test]
    fn test_decode_reads_encoded() {
        let mut index = WorkIndex::new();
        index.insert_new("abc".into(), vec!["/data/1.pdf".into(), "/data/2.pdf".into()]);
        index.insert_new("def".into(), vec!["/data/3.pdf".into()]);

        assert_eq!(decode_lines(&encode_lines(&index)), index);
    }

    #[test]
    fn test_decode_keeps_surrounding_whitespace() {
        let mut index = WorkIndex::new();
        index.insert_new(
            "h1".into(),
            vec![" /data/lead.pdf".into(), "/data/trail.pdf\t".into(), "/data/a.pdf ".into()],
        );

        let decoded = decode_lines(&encode_lines(&index));
        assert_eq!(decoded, index);
        assert_eq!(decoded.get("h1").unwrap()[2], "/data/a.pdf ");

        // CRLF endings are still stripped
        let decoded = decode_lines("h2,/data/b.pdf \r\n");
        assert_eq!(decoded.get("h2").unwrap(), &["/data/b.pdf ".to_string()]);
    }
}
