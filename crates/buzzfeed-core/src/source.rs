//! Command sources
//!
//! Produces the significant characters of an inline string or a command
//! file: whitespace is dropped, letters are upper-cased and, for files,
//! `;` comments are skipped through the end of the line.

use std::fs::File;
use std::io::{BufReader, Bytes, Read};
use std::path::PathBuf;

use tracing::debug;

use crate::{FeedError, Result};

/// Starts a comment that runs to the end of the line
pub const COMMENT_MARKER: u8 = b';';

const VERTICAL_TAB: u8 = 0x0B;

/// Where command characters come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Data given directly, e.g. on the command line
    Inline(String),
    /// A command file
    File(PathBuf),
}

impl Source {
    /// Short name used in diagnostics
    pub fn name(&self) -> String {
        match self {
            Source::Inline(_) => "inline data".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }

    /// Open the source and return its character stream.
    ///
    /// Files are opened immediately so a missing file fails here, before
    /// anything is sent; the contents are read lazily.
    pub fn characters(&self) -> Result<Characters> {
        match self {
            Source::Inline(text) => {
                let chars: Vec<char> = text
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .flat_map(char::to_uppercase)
                    .collect();
                Ok(Characters::Inline(chars.into_iter()))
            }
            Source::File(path) => {
                let file = File::open(path).map_err(|source| FeedError::SourceOpen {
                    path: path.clone(),
                    source,
                })?;
                Ok(Characters::File(FileChars::new(file)))
            }
        }
    }
}

/// Lazy, single-pass stream of significant characters
pub enum Characters {
    /// Pre-filtered inline characters
    Inline(std::vec::IntoIter<char>),
    /// Characters read from a file one byte at a time
    File(FileChars),
}

impl Iterator for Characters {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Characters::Inline(chars) => chars.next(),
            Characters::File(file) => file.next(),
        }
    }
}

/// Filtering byte reader over any [`Read`]
pub struct FileChars<R = File> {
    bytes: Bytes<BufReader<R>>,
    done: bool,
}

impl<R: Read> FileChars<R> {
    /// Wrap an arbitrary reader
    pub fn new(reader: R) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
            done: false,
        }
    }

    /// Next raw byte. A read error ends the stream.
    fn next_byte(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        match self.bytes.next() {
            None => {
                self.done = true;
                None
            }
            Some(Ok(byte)) => Some(byte),
            Some(Err(e)) => {
                debug!("command file read stopped: {}", e);
                self.done = true;
                None
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(byte) = self.next_byte() {
            if byte == b'\n' {
                break;
            }
        }
    }
}

impl<R: Read> Iterator for FileChars<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            let byte = self.next_byte()?;
            if byte == COMMENT_MARKER {
                self.skip_line();
                continue;
            }
            // Vertical tab counts as whitespace, as it does for inline data
            if byte.is_ascii_whitespace() || byte == VERTICAL_TAB {
                continue;
            }
            return Some(char::from(byte.to_ascii_uppercase()));
        }
    }
}
