use std::{
    error, fmt,
    io::{self, BufRead},
    str,
};

#[derive(Debug)]
pub enum ParseErrorKind {
    Missing(&'static str),
    InvalidToken(Box<dyn error::Error + Send + Sync + 'static>),
    MissingNeighbours { expected: usize, found: usize },
    TrailingTokens { expected: usize, found: usize },
    IndexOutOfRange { index: i64, count: usize },
    DuplicateParticle(usize),
    SpeciesCount { atoms_count: usize, a_count: usize },
    IO(io::Error),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(what) => write!(f, "unexpected end of input, expected {what}"),
            Self::InvalidToken(err) => write!(f, "invalid token: {err}"),
            Self::MissingNeighbours { expected, found } => {
                write!(f, "expected {expected} neighbours, found {found}")
            }
            Self::TrailingTokens { expected, found } => {
                write!(f, "expected {expected} tokens, found {found}")
            }
            Self::IndexOutOfRange { index, count } => {
                write!(f, "particle index {index} is outside of 1..={count}")
            }
            Self::DuplicateParticle(index) => {
                write!(f, "particle {} is listed more than once", index + 1)
            }
            Self::SpeciesCount {
                atoms_count,
                a_count,
            } => write!(
                f,
                "species A count {a_count} exceeds total count {atoms_count}"
            ),
            Self::IO(err) => write!(f, "{err}"),
        }
    }
}

/// Error raised while reading one of the line-oriented input files.
#[derive(Debug)]
pub struct ParseError {
    pub line_number: usize,
    pub record: Option<usize>,
    pub content: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line_number: usize, content: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            line_number,
            record: None,
            content: content.into(),
            kind,
        }
    }

    #[must_use]
    pub fn with_record(mut self, record: usize) -> Self {
        self.record = Some(record);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(record) = self.record {
            write!(f, "record {record}, ")?;
        }
        write!(f, "line {}: {}", self.line_number, self.kind)?;
        if !self.content.is_empty() {
            write!(f, " in `{}`", self.content)?;
        }
        Ok(())
    }
}

// the inner cause is already part of the message
impl error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone)]
pub struct Line {
    pub number: usize,
    pub content: String,
}

impl Line {
    pub fn fields(&self) -> Fields<'_> {
        Fields {
            line: self,
            iter: self.content.split_whitespace(),
            consumed: 0,
        }
    }

    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.number, self.content.as_str(), kind)
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Whitespace tokenizer over a single line.
pub struct Fields<'a> {
    line: &'a Line,
    iter: str::SplitWhitespace<'a>,
    consumed: usize,
}

impl Fields<'_> {
    pub fn next<T>(&mut self, what: &'static str) -> ParseResult<T>
    where
        T: str::FromStr<Err: error::Error + Send + Sync + 'static>,
    {
        let token = self
            .iter
            .next()
            .ok_or_else(|| self.line.error(ParseErrorKind::Missing(what)))?;
        self.consumed += 1;
        token
            .parse::<T>()
            .map_err(|err| self.line.error(ParseErrorKind::InvalidToken(err.into())))
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of tokens left on the line.
    pub fn remaining(&self) -> usize {
        self.iter.clone().count()
    }
}

pub struct LineReader<R> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next line into `buf` as raw bytes, terminator included.
    /// Returns `false` at end of input.
    pub fn next_raw_line(&mut self, buf: &mut Vec<u8>) -> ParseResult<bool> {
        buf.clear();
        match self.reader.read_until(b'\n', buf) {
            Ok(0) => Ok(false),
            Ok(_) => {
                self.line_number += 1;
                Ok(true)
            }
            Err(err) => Err(ParseError::new(
                self.line_number + 1,
                "",
                ParseErrorKind::IO(err),
            )),
        }
    }

    pub fn expect_raw_line(&mut self, buf: &mut Vec<u8>, what: &'static str) -> ParseResult<()> {
        if self.next_raw_line(buf)? {
            Ok(())
        } else {
            Err(ParseError::new(
                self.line_number + 1,
                "",
                ParseErrorKind::Missing(what),
            ))
        }
    }

    pub fn next_line(&mut self) -> ParseResult<Option<Line>> {
        let mut buf = Vec::new();
        if !self.next_raw_line(&mut buf)? {
            return Ok(None);
        }
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        let content = String::from_utf8(buf).map_err(|err| {
            ParseError::new(
                self.line_number,
                String::from_utf8_lossy(err.as_bytes()),
                ParseErrorKind::IO(io::Error::new(io::ErrorKind::InvalidData, err.utf8_error())),
            )
        })?;
        Ok(Some(Line {
            number: self.line_number,
            content,
        }))
    }

    pub fn expect_line(&mut self, what: &'static str) -> ParseResult<Line> {
        self.next_line()?
            .ok_or_else(|| ParseError::new(self.line_number + 1, "", ParseErrorKind::Missing(what)))
    }

    /// Consumes `count` lines without decoding them.
    pub fn skip(&mut self, count: usize, what: &'static str) -> ParseResult<()> {
        let mut buf = Vec::new();
        for _ in 0..count {
            self.expect_raw_line(&mut buf, what)?;
        }
        Ok(())
    }
}
