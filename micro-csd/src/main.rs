use anyhow::Result;
use bond_cluster_util::{
    BondGraph, ClusterDistribution, Clusters, ConfigurationExtractor, DEFAULT_BONDS_OUTPUT,
    DEFAULT_TOPOLOGY_OUTPUT, ExtractionOutput, Topology,
};
use clap::{Parser, error::ErrorKind};
use log::info;
use std::{
    io::{self, Write},
    path::PathBuf,
    process,
};

/// Cluster size distribution of a bonded particle system
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Bond list file
    bond_file: PathBuf,

    /// Topology file, first line holds `N NA`
    topology_file: PathBuf,

    /// Configuration snapshot; when given, the largest cluster is extracted from it
    configuration_file: Option<PathBuf>,

    /// Directory receiving the extracted files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// File name of the extracted configuration
    #[arg(long, default_value = DEFAULT_BONDS_OUTPUT)]
    bonds_output: String,

    /// File name of the extracted topology
    #[arg(long, default_value = DEFAULT_TOPOLOGY_OUTPUT)]
    topology_output: String,
}

impl Cli {
    fn extraction_output(&self) -> ExtractionOutput {
        ExtractionOutput {
            dir: self.output_dir.clone(),
            bonds_name: self.bonds_output.clone(),
            topology_name: self.topology_output.clone(),
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let topology = Topology::read(&cli.topology_file)?;
    info!(
        "topology: {} particles, {} A, {} B",
        topology.atoms_count,
        topology.a_count,
        topology.b_count()
    );
    let graph = BondGraph::read(&cli.bond_file, topology.atoms_count)?;
    let clusters = Clusters::resolve(&graph);
    let distribution = ClusterDistribution::new(&clusters);

    let mut stdout = io::stdout().lock();
    write!(stdout, "{distribution}")?;
    stdout.flush()?;
    distribution.log_summary();

    if let Some(configuration_file) = &cli.configuration_file {
        let Some(largest) = distribution.largest() else {
            info!("no particles, skipping configuration extraction");
            return Ok(());
        };
        let output = cli.extraction_output();
        let extracted = ConfigurationExtractor::new(&graph, &clusters, &topology).extract(
            configuration_file,
            largest,
            &output,
        )?;
        info!(
            "wrote {} particles ({} A) to {}",
            extracted.atoms_count,
            extracted.a_count,
            output.bonds_path().to_string_lossy()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            err.print().ok();
            process::exit(1);
        }
    };
    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["micro-csd", "bonds.dat", "topology.dat"]).unwrap();
        assert_eq!(cli.bond_file, PathBuf::from("bonds.dat"));
        assert_eq!(cli.topology_file, PathBuf::from("topology.dat"));
        assert!(cli.configuration_file.is_none());
        let output = cli.extraction_output();
        assert_eq!(output.bonds_path(), PathBuf::from("./largest_bonds.dat"));
        assert_eq!(output.topology_path(), PathBuf::from("./largest_topology.dat"));

        let cli = Cli::try_parse_from([
            "micro-csd",
            "bonds.dat",
            "topology.dat",
            "last_conf.dat",
            "-o",
            "out",
        ])
        .unwrap();
        assert_eq!(cli.configuration_file, Some(PathBuf::from("last_conf.dat")));
        assert_eq!(
            cli.extraction_output().bonds_path(),
            PathBuf::from("out/largest_bonds.dat")
        );
    }

    #[test]
    fn test_missing_arguments() {
        let err = Cli::try_parse_from(["micro-csd", "bonds.dat"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(Cli::try_parse_from(["micro-csd"]).is_err());
    }

    #[test]
    fn test_run_with_extraction() {
        let dir = std::env::temp_dir().join(format!("micro-csd-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("topology.dat"), "5 3\n").unwrap();
        fs::write(
            dir.join("bonds.dat"),
            "h1\nh2\nr\nr\nr\nr\nr\n1 1 2\n2 2 1 3\n3 1 2\n4 1 5\n5 1 4\n",
        )
        .unwrap();
        fs::write(dir.join("conf.dat"), "m1\nm2\nm3\nc1\nc2\nc3\nc4\nc5\n").unwrap();
        let cli = Cli::try_parse_from([
            "micro-csd".into(),
            dir.join("bonds.dat"),
            dir.join("topology.dat"),
            dir.join("conf.dat"),
            "--output-dir".into(),
            dir.clone(),
        ])
        .unwrap();
        run(&cli).unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("largest_bonds.dat")).unwrap(),
            "m1\nm2\nm3\nc1\nc2\nc3\n"
        );
        assert_eq!(
            fs::read_to_string(dir.join("largest_topology.dat")).unwrap(),
            "3 3\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_missing_file() {
        let cli = Cli::try_parse_from([
            "micro-csd",
            "/nonexistent/bonds.dat",
            "/nonexistent/top.dat",
        ])
        .unwrap();
        let err = run(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/top.dat"));
    }
}
