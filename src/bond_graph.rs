use anyhow::{Context, Result};
use log::debug;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::parser::{Fields, Line, LineReader, ParseErrorKind, ParseResult};

const HEADER_LINES: usize = 2;

/// Neighbour lists of all particles, addressed by 0-based particle index.
#[derive(Debug, Clone, Default)]
pub struct BondGraph {
    neighbours: Vec<Vec<usize>>,
    load_order: Vec<usize>,
}

impl BondGraph {
    /// Builds a graph from `(index, neighbours)` pairs listed in load order.
    #[cfg(test)]
    pub(crate) fn from_records(records: Vec<(usize, Vec<usize>)>) -> Self {
        let mut neighbours = vec![Vec::new(); records.len()];
        let mut load_order = Vec::with_capacity(records.len());
        for (index, list) in records {
            neighbours[index] = list;
            load_order.push(index);
        }
        Self {
            neighbours,
            load_order,
        }
    }

    pub fn from_reader(reader: impl BufRead, atoms_count: usize) -> ParseResult<Self> {
        let mut lines = LineReader::new(reader);
        lines.skip(HEADER_LINES, "bond file header")?;
        lines.skip(atoms_count, "particle record")?;

        let mut neighbours: Vec<Option<Vec<usize>>> = vec![None; atoms_count];
        let mut load_order = Vec::with_capacity(atoms_count);
        for record in 1..=atoms_count {
            let line = loop {
                let line = lines
                    .expect_line("bond record")
                    .map_err(|err| err.with_record(record))?;
                if !line.is_blank() {
                    break line;
                }
            };
            let (index, list) =
                parse_bond_record(&line, atoms_count).map_err(|err| err.with_record(record))?;
            if neighbours[index].is_some() {
                return Err(line
                    .error(ParseErrorKind::DuplicateParticle(index))
                    .with_record(record));
            }
            neighbours[index] = Some(list);
            load_order.push(index);
        }
        debug!(
            "loaded {} bond records, {} bond ends",
            load_order.len(),
            neighbours.iter().flatten().map(Vec::len).sum::<usize>()
        );
        Ok(Self {
            neighbours: neighbours.into_iter().map(Option::unwrap_or_default).collect(),
            load_order,
        })
    }

    pub fn read(path: &Path, atoms_count: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Opening bond file {}", path.to_string_lossy()))?;
        Self::from_reader(BufReader::new(file), atoms_count)
            .with_context(|| format!("Parsing bond file {}", path.to_string_lossy()))
    }

    #[inline]
    pub fn atoms_count(&self) -> usize {
        self.neighbours.len()
    }

    #[inline]
    pub fn neighbours(&self, index: usize) -> &[usize] {
        &self.neighbours[index]
    }

    /// Particle indices in the order their records appeared in the bond file.
    pub fn load_order(&self) -> &[usize] {
        &self.load_order
    }
}

fn parse_index(
    fields: &mut Fields<'_>,
    line: &Line,
    count: usize,
    what: &'static str,
) -> ParseResult<usize> {
    let index = fields.next::<i64>(what)?;
    if index < 1 || index as u64 > count as u64 {
        return Err(line.error(ParseErrorKind::IndexOutOfRange { index, count }));
    }
    Ok(index as usize - 1)
}

fn parse_bond_record(line: &Line, atoms_count: usize) -> ParseResult<(usize, Vec<usize>)> {
    let mut fields = line.fields();
    let index = parse_index(&mut fields, line, atoms_count, "particle index")?;
    let neighbours_count = fields.next::<usize>("neighbour count")?;
    let found = fields.remaining();
    if found < neighbours_count {
        return Err(line.error(ParseErrorKind::MissingNeighbours {
            expected: neighbours_count,
            found,
        }));
    }
    if found > neighbours_count {
        return Err(line.error(ParseErrorKind::TrailingTokens {
            expected: fields.consumed() + neighbours_count,
            found: fields.consumed() + found,
        }));
    }
    let neighbours = (0..neighbours_count)
        .map(|_| parse_index(&mut fields, line, atoms_count, "neighbour index"))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok((index, neighbours))
}
