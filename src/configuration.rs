use anyhow::{Context, Result};
use log::{debug, warn};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    parser::LineReader,
    BondGraph, Clusters, Topology,
};

const METADATA_LINES: usize = 3;

pub const DEFAULT_BONDS_OUTPUT: &str = "largest_bonds.dat";
pub const DEFAULT_TOPOLOGY_OUTPUT: &str = "largest_topology.dat";

/// Reduces a configuration snapshot to the particles of a single cluster.
///
/// Snapshot records are matched to particles purely by position: the n-th
/// record after the metadata belongs to the n-th particle of the bond file.
/// Nothing in the snapshot allows checking this, so misaligned files produce
/// wrong output rather than an error.
pub struct ConfigurationExtractor<'a> {
    graph: &'a BondGraph,
    clusters: &'a Clusters,
    a_count: usize,
}

impl<'a> ConfigurationExtractor<'a> {
    pub fn new(graph: &'a BondGraph, clusters: &'a Clusters, topology: &Topology) -> Self {
        Self {
            graph,
            clusters,
            a_count: topology.a_count,
        }
    }

    /// Copies the metadata and the records of particles in `cluster_id` from
    /// `reader` to `writer`, returning the topology of the written subset.
    pub fn extract_to(
        &self,
        reader: impl BufRead,
        writer: &mut impl Write,
        cluster_id: usize,
    ) -> Result<Topology> {
        let mut lines = LineReader::new(reader);
        let mut buf = Vec::new();
        for _ in 0..METADATA_LINES {
            lines.expect_raw_line(&mut buf, "snapshot metadata")?;
            write_line(writer, &buf)?;
        }
        let mut new_a_count = 0;
        let mut new_b_count = 0;
        for (record, &atom_i) in (1..).zip(self.graph.load_order()) {
            lines
                .expect_raw_line(&mut buf, "snapshot record")
                .map_err(|err| err.with_record(record))?;
            if self.clusters.cluster_of(atom_i) != cluster_id {
                continue;
            }
            write_line(writer, &buf)?;
            if atom_i < self.a_count {
                new_a_count += 1;
            } else {
                new_b_count += 1;
            }
        }
        let mut ignored = 0;
        while lines.next_raw_line(&mut buf)? {
            ignored += 1;
        }
        if ignored > 0 {
            warn!("ignored {ignored} snapshot lines past the last particle record");
        }
        debug!("kept {new_a_count} A and {new_b_count} B particles of cluster {cluster_id}");
        Ok(Topology::new(new_a_count + new_b_count, new_a_count))
    }

    /// Writes the reduced snapshot and its topology into `output`.
    pub fn extract(
        &self,
        snapshot_path: &Path,
        cluster_id: usize,
        output: &ExtractionOutput,
    ) -> Result<Topology> {
        let reader = BufReader::new(File::open(snapshot_path).with_context(|| {
            format!("Opening configuration {}", snapshot_path.to_string_lossy())
        })?);
        let bonds_path = output.bonds_path();
        let mut writer = BufWriter::new(
            File::create(&bonds_path)
                .with_context(|| format!("Creating {}", bonds_path.to_string_lossy()))?,
        );
        let topology = self
            .extract_to(reader, &mut writer, cluster_id)
            .with_context(|| {
                format!(
                    "Filtering configuration {}",
                    snapshot_path.to_string_lossy()
                )
            })?;
        writer.flush()?;
        topology.write(&output.topology_path())?;
        Ok(topology)
    }
}

/// Writes a snapshot line unchanged, terminating an unterminated last line.
fn write_line(writer: &mut impl Write, line: &[u8]) -> io::Result<()> {
    writer.write_all(line)?;
    if !line.ends_with(b"\n") {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Destination of the reduced snapshot and topology files.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub dir: PathBuf,
    pub bonds_name: String,
    pub topology_name: String,
}

impl ExtractionOutput {
    pub fn bonds_path(&self) -> PathBuf {
        self.dir.join(&self.bonds_name)
    }

    pub fn topology_path(&self) -> PathBuf {
        self.dir.join(&self.topology_name)
    }
}

impl Default for ExtractionOutput {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            bonds_name: DEFAULT_BONDS_OUTPUT.to_string(),
            topology_name: DEFAULT_TOPOLOGY_OUTPUT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseError, ParseErrorKind};
    use std::{fs, io::Cursor};

    const SNAPSHOT: &str = "t = 0\nb = 10 10 10\nE = 0 0 0\np0\np1\np2\np3\np4\n";

    fn chain_and_pair() -> (BondGraph, Clusters) {
        let graph = BondGraph::from_records(vec![
            (0, vec![1]),
            (1, vec![0, 2]),
            (2, vec![1]),
            (3, vec![4]),
            (4, vec![3]),
        ]);
        let clusters = Clusters::resolve(&graph);
        (graph, clusters)
    }

    #[test]
    fn test_extract_largest() {
        let (graph, clusters) = chain_and_pair();
        let topology = Topology::new(5, 3);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        let mut out = Vec::new();
        let new_topology = extractor
            .extract_to(Cursor::new(SNAPSHOT), &mut out, 0)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "t = 0\nb = 10 10 10\nE = 0 0 0\np0\np1\np2\n"
        );
        assert_eq!(new_topology, Topology::new(3, 3));
    }

    #[test]
    fn test_species_split() {
        let (graph, clusters) = chain_and_pair();
        let topology = Topology::new(5, 4);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        let mut out = Vec::new();
        let new_topology = extractor
            .extract_to(Cursor::new(SNAPSHOT), &mut out, 3)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("E = 0 0 0\np3\np4\n"));
        assert_eq!(new_topology, Topology::new(2, 1));
    }

    #[test]
    fn test_follows_load_order() {
        let graph = BondGraph::from_records(vec![(2, vec![]), (0, vec![1]), (1, vec![0])]);
        let clusters = Clusters::resolve(&graph);
        let topology = Topology::new(3, 1);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        let mut out = Vec::new();
        let new_topology = extractor
            .extract_to(Cursor::new("a\nb\nc\nrow2\nrow0\nrow1\n"), &mut out, 0)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\nc\nrow0\nrow1\n");
        assert_eq!(new_topology, Topology::new(2, 1));
    }

    #[test]
    fn test_crlf_lines_copied_unchanged() {
        let (graph, clusters) = chain_and_pair();
        let topology = Topology::new(5, 3);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        let mut out = Vec::new();
        extractor
            .extract_to(
                Cursor::new("m1\r\nm2\r\nm3\r\np0\r\np1\r\np2\r\np3\r\np4\r\n"),
                &mut out,
                0,
            )
            .unwrap();
        assert_eq!(out, b"m1\r\nm2\r\nm3\r\np0\r\np1\r\np2\r\n");
    }

    #[test]
    fn test_non_utf8_lines_copied_unchanged() {
        let (graph, clusters) = chain_and_pair();
        let topology = Topology::new(5, 3);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        let snapshot = b"t = 0 \xe9\nb\nE\np0 \xff\np1\np2\np3 \xfe\np4".to_vec();
        let mut out = Vec::new();
        let new_topology = extractor
            .extract_to(Cursor::new(snapshot), &mut out, 3)
            .unwrap();
        assert_eq!(out, b"t = 0 \xe9\nb\nE\np3 \xfe\np4\n");
        assert_eq!(new_topology, Topology::new(2, 0));
    }

    #[test]
    fn test_truncated_snapshot() {
        let (graph, clusters) = chain_and_pair();
        let topology = Topology::new(5, 3);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        let mut out = Vec::new();
        let err = extractor
            .extract_to(Cursor::new("t\nb\nE\np0\np1\n"), &mut out, 0)
            .unwrap_err();
        let err = err.downcast::<ParseError>().unwrap();
        assert_eq!(err.record, Some(3));
        assert!(matches!(err.kind, ParseErrorKind::Missing(_)));

        let err = extractor
            .extract_to(Cursor::new("t\n"), &mut Vec::new(), 0)
            .unwrap_err();
        assert!(err.downcast_ref::<ParseError>().is_some());
    }

    #[test]
    fn test_extract_files() {
        let dir = std::env::temp_dir().join(format!("bond-cluster-util-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let snapshot_path = dir.join("last_conf.dat");
        fs::write(&snapshot_path, SNAPSHOT).unwrap();
        let output = ExtractionOutput {
            dir: dir.clone(),
            ..Default::default()
        };

        let (graph, clusters) = chain_and_pair();
        let topology = Topology::new(5, 3);
        let extractor = ConfigurationExtractor::new(&graph, &clusters, &topology);
        extractor.extract(&snapshot_path, 0, &output).unwrap();

        let bonds = fs::read_to_string(dir.join(DEFAULT_BONDS_OUTPUT)).unwrap();
        assert_eq!(bonds.lines().count(), 6);
        let topology = fs::read_to_string(dir.join(DEFAULT_TOPOLOGY_OUTPUT)).unwrap();
        assert_eq!(topology, "3 3\n");

        let missing = extractor.extract(&dir.join("missing.dat"), 0, &output);
        assert!(format!("{:#}", missing.unwrap_err()).contains("missing.dat"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
