use log::debug;

use crate::BondGraph;

/// Cluster id of every particle together with the member count of every id.
///
/// Each particle starts as its own singleton cluster. [`Clusters::propagate`]
/// lowers ids along bonds until every particle carries the smallest index of
/// its connected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clusters {
    ids: Vec<usize>,
    sizes: Vec<usize>,
}

impl Clusters {
    pub fn new(atoms_count: usize) -> Self {
        Self {
            ids: (0..atoms_count).collect(),
            sizes: vec![1; atoms_count],
        }
    }

    /// Resolves the connected components of `graph`.
    pub fn resolve(graph: &BondGraph) -> Self {
        let mut clusters = Self::new(graph.atoms_count());
        let moves = clusters.propagate(graph);
        debug!("cluster propagation converged after {moves} reassignments");
        clusters
    }

    /// Sweeps every particle as a propagation root and pushes its id onto
    /// neighbours carrying a strictly larger one. Returns the number of
    /// reassignments, which is zero on an already converged set.
    ///
    /// # Panics
    ///
    /// Panics if `graph` does not hold exactly as many particles as `self`.
    pub fn propagate(&mut self, graph: &BondGraph) -> usize {
        assert_eq!(graph.atoms_count(), self.ids.len());
        let mut moves = 0;
        let mut stack = Vec::new();
        for root in 0..self.ids.len() {
            stack.push(root);
            while let Some(atom_i) = stack.pop() {
                let id = self.ids[atom_i];
                for &neighbour_i in graph.neighbours(atom_i) {
                    let old = self.ids[neighbour_i];
                    if old > id {
                        self.sizes[old] -= 1;
                        self.ids[neighbour_i] = id;
                        self.sizes[id] += 1;
                        stack.push(neighbour_i);
                        moves += 1;
                    }
                }
            }
        }
        moves
    }

    #[inline]
    pub fn atoms_count(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn cluster_of(&self, atom_i: usize) -> usize {
        self.ids[atom_i]
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Member count indexed by cluster id; zero for ids no particle carries.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}
