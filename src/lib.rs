mod bond_graph;
mod clusters;
mod configuration;
mod distribution;
pub mod parser;
mod topology;

pub use bond_graph::BondGraph;
pub use clusters::Clusters;
pub use configuration::{
    ConfigurationExtractor, ExtractionOutput, DEFAULT_BONDS_OUTPUT, DEFAULT_TOPOLOGY_OUTPUT,
};
pub use distribution::ClusterDistribution;
pub use parser::{ParseError, ParseErrorKind};
pub use topology::Topology;
