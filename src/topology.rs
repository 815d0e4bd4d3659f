use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::parser::{LineReader, ParseErrorKind, ParseResult};

/// Particle counts from the first line of a topology file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub atoms_count: usize,
    pub a_count: usize,
}

impl Topology {
    pub fn new(atoms_count: usize, a_count: usize) -> Self {
        Self {
            atoms_count,
            a_count,
        }
    }

    #[inline]
    pub fn b_count(&self) -> usize {
        self.atoms_count - self.a_count
    }

    pub fn from_reader(reader: impl BufRead) -> ParseResult<Self> {
        let mut lines = LineReader::new(reader);
        let line = lines.expect_line("topology header")?;
        let mut fields = line.fields();
        let atoms_count = fields.next::<usize>("particle count")?;
        let a_count = fields.next::<usize>("species A count")?;
        if a_count > atoms_count {
            return Err(line.error(ParseErrorKind::SpeciesCount {
                atoms_count,
                a_count,
            }));
        }
        Ok(Self::new(atoms_count, a_count))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Opening topology {}", path.to_string_lossy()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing topology {}", path.to_string_lossy()))
    }

    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "{} {}", self.atoms_count, self.a_count)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Creating topology {}", path.to_string_lossy()))?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }
}
