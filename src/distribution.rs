use itertools::Itertools;
use log::info;
use std::fmt;

use crate::Clusters;

/// Cluster listing and cluster size distribution (CSD) of a converged
/// [`Clusters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDistribution {
    atoms_count: usize,
    clusters: Vec<(usize, usize)>,
    csd: Vec<(usize, usize)>,
    largest: Option<usize>,
}

impl ClusterDistribution {
    pub fn new(clusters: &Clusters) -> Self {
        let atoms_count = clusters.atoms_count();
        let sizes = clusters.sizes();
        let listing = sizes
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, size)| size > 0)
            .collect::<Vec<_>>();
        let mut counts = vec![0; atoms_count + 1];
        for &(_, size) in &listing {
            counts[size] += 1;
        }
        let csd = counts
            .into_iter()
            .enumerate()
            .skip(1)
            .filter(|&(_, count)| count > 0)
            .collect();
        // strict comparison keeps the lowest id among equally large clusters
        let largest = (0..atoms_count).reduce(|best, id| {
            if sizes[id] > sizes[best] {
                id
            } else {
                best
            }
        });
        Self {
            atoms_count,
            clusters: listing,
            csd,
            largest,
        }
    }

    /// `(cluster id, size)` for every non-empty cluster, ascending by id.
    pub fn clusters(&self) -> &[(usize, usize)] {
        &self.clusters
    }

    /// `(size, number of clusters)` for every occurring size, ascending by size.
    pub fn csd(&self) -> &[(usize, usize)] {
        &self.csd
    }

    /// Id of the largest cluster; `None` only when there are no particles.
    pub fn largest(&self) -> Option<usize> {
        self.largest
    }

    pub fn largest_size(&self) -> usize {
        self.largest
            .and_then(|id| self.clusters.iter().find(|(c, _)| *c == id))
            .map_or(0, |&(_, size)| size)
    }

    pub fn number_average_size(&self) -> Option<f64> {
        (!self.clusters.is_empty()).then(|| self.atoms_count as f64 / self.clusters.len() as f64)
    }

    /// Mass-weighted mean cluster size, `sum(s^2) / N`.
    pub fn weight_average_size(&self) -> Option<f64> {
        (self.atoms_count > 0).then(|| {
            let sum = self
                .clusters
                .iter()
                .map(|&(_, size)| (size * size) as f64)
                .sum::<f64>();
            sum / self.atoms_count as f64
        })
    }

    pub fn log_summary(&self) {
        info!("particles: {}", self.atoms_count);
        info!("clusters: {}", self.clusters.len());
        if let (Some(number_avg), Some(weight_avg)) =
            (self.number_average_size(), self.weight_average_size())
        {
            info!("<s>_n: {number_avg:.4}, <s>_w: {weight_avg:.4}");
        }
        if let Some(largest) = self.largest {
            let size = self.largest_size();
            info!(
                "largest cluster: {largest} with {size} particles ({:.4} of total)",
                size as f64 / self.atoms_count as f64
            );
        }
    }
}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    rows: &[(usize, usize)],
) -> fmt::Result {
    writeln!(f, "{title}:")?;
    if !rows.is_empty() {
        let table = rows.iter().map(|(a, b)| format!("{a} {b}")).join("\n");
        writeln!(f, "{table}")?;
    }
    Ok(())
}

impl fmt::Display for ClusterDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "Clusters", &self.clusters)?;
        writeln!(f)?;
        write_section(f, "CSD", &self.csd)
    }
}
