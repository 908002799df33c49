//! Hex program files.
//!
//! A simple text format:
//! - One 16-bit word per line, in hexadecimal, with an optional `0x` prefix
//! - `;` starts a comment that runs to the end of the line
//! - Blank lines are ignored

use std::path::Path;
use thiserror::Error;

/// Parse program text into words.
pub fn parse_hex(source: &str) -> Result<Vec<u16>, ProgramError> {
    let mut words = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let code = line.split(';').next().unwrap_or_default().trim();
        if code.is_empty() {
            continue;
        }

        let digits = code
            .strip_prefix("0x")
            .or_else(|| code.strip_prefix("0X"))
            .unwrap_or(code);

        let word = u16::from_str_radix(digits, 16).map_err(|e| ProgramError::Parse {
            line: line_num + 1,
            message: format!("{:?}: {}", code, e),
        })?;
        words.push(word);
    }

    Ok(words)
}

/// Load a hex program file from disk.
pub fn load_hex_file<P: AsRef<Path>>(path: P) -> Result<Vec<u16>, ProgramError> {
    let source = std::fs::read_to_string(path.as_ref())?;
    parse_hex(&source)
}

/// Errors that can occur while reading a program.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_words() {
        let source = "7c01\n0030\n\n   \n0x89C1\n";
        assert_eq!(parse_hex(source).unwrap(), vec![0x7C01, 0x0030, 0x89C1]);
    }

    #[test]
    fn test_comments_and_whitespace() {
        let source = "; SET A, 0x30\n  7C01 ; first word\n\t0030\n";
        assert_eq!(parse_hex(source).unwrap(), vec![0x7C01, 0x0030]);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = parse_hex("7c01\n\nzz\n").unwrap_err();
        match err {
            ProgramError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_word_out_of_range() {
        assert!(parse_hex("10000").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_hex_file("/nonexistent/program.hex").unwrap_err();
        assert!(matches!(err, ProgramError::Io(_)));
    }
}
