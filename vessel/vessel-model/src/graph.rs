//! Branch connectivity at bifurcations.
//!
//! Branch `j` is adjacent to branch `i` at one of `i`'s endpoints when that
//! endpoint is exactly one of `j`'s raw points. The relation is not
//! symmetric: `i`'s endpoint may lie in the middle of `j` while `j`'s
//! endpoints are nowhere on `i`.

use centerline_curves::{Point3, SampledBranch, resample_branch};
use tracing::{debug, warn};

use crate::{Branch, Stage, VesselError, VesselResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One end of a sampled branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Endpoint {
    /// First sampled point.
    Start,
    /// Last sampled point.
    End,
}

impl Endpoint {
    /// Both endpoints in `[Start, End]` order.
    pub const ALL: [Self; 2] = [Self::Start, Self::End];
}

/// Branches touching each endpoint of one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchAdjacency {
    /// Branches adjacent at the first sampled point, ascending.
    pub start: Vec<usize>,
    /// Branches adjacent at the last sampled point, ascending.
    pub end: Vec<usize>,
}

impl BranchAdjacency {
    /// Neighbors at one endpoint.
    #[must_use]
    pub fn at(&self, endpoint: Endpoint) -> &[usize] {
        match endpoint {
            Endpoint::Start => &self.start,
            Endpoint::End => &self.end,
        }
    }

    /// Whether `branch` appears at either endpoint.
    #[must_use]
    pub fn contains(&self, branch: usize) -> bool {
        self.start.contains(&branch) || self.end.contains(&branch)
    }

    /// No neighbors at either endpoint.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }

    fn at_mut(&mut self, endpoint: Endpoint) -> &mut Vec<usize> {
        match endpoint {
            Endpoint::Start => &mut self.start,
            Endpoint::End => &mut self.end,
        }
    }
}

/// Adjacency of every branch, indexed by branch index.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VesselGraph {
    adjacency: Vec<BranchAdjacency>,
    endpoints: Vec<[Point3<f64>; 2]>,
}

impl VesselGraph {
    /// Resample every branch and build the graph.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::Branch`] at [`Stage::Resampling`] for the first
    /// branch that cannot be resampled.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::Point3;
    /// use vessel_model::VesselGraph;
    ///
    /// let o = Point3::origin();
    /// let branches = vec![
    ///     vec![o, Point3::new(0.01, 0.0, 0.0), Point3::new(0.02, 0.0, 0.0)],
    ///     vec![o, Point3::new(0.0, 0.01, 0.0), Point3::new(0.0, 0.02, 0.0)],
    /// ];
    /// let graph = VesselGraph::build(&branches, 0.005).unwrap();
    /// assert_eq!(graph.adjacency(0).unwrap().start, vec![1]);
    /// ```
    pub fn build(branches: &[Branch], sampling_rate: f64) -> VesselResult<Self> {
        let sampled = branches
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                resample_branch(raw, sampling_rate)
                    .map_err(|e| VesselError::at_stage(i, Stage::Resampling, e))
            })
            .collect::<VesselResult<Vec<_>>>()?;
        Ok(Self::from_sampled(branches, &sampled))
    }

    /// Build the graph from raw branches and their resampled counterparts.
    ///
    /// `sampled[i]` must come from `branches[i]`; extra entries in either
    /// slice are ignored.
    #[must_use]
    pub fn from_sampled(branches: &[Branch], sampled: &[SampledBranch]) -> Self {
        let endpoints: Vec<[Point3<f64>; 2]> = sampled
            .iter()
            .take(branches.len())
            .map(SampledBranch::endpoints)
            .collect();

        let adjacency: Vec<BranchAdjacency> = branches
            .iter()
            .zip(&endpoints)
            .enumerate()
            .map(|(i, (own, [first, last]))| BranchAdjacency {
                start: touching(branches, i, own, first),
                end: touching(branches, i, own, last),
            })
            .collect();

        let graph = Self {
            adjacency,
            endpoints,
        };

        let asymmetric = graph.asymmetric_pairs();
        if !asymmetric.is_empty() {
            warn!(pairs = asymmetric.len(), "Branch adjacency is not symmetric");
        }
        debug!(
            branches = graph.len(),
            isolated = graph.adjacency.iter().filter(|a| a.is_isolated()).count(),
            "Built vessel graph"
        );

        graph
    }

    /// Number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Whether the graph has no branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Adjacency of one branch.
    #[must_use]
    pub fn adjacency(&self, branch: usize) -> Option<&BranchAdjacency> {
        self.adjacency.get(branch)
    }

    /// Neighbors of a branch at one endpoint; empty for an unknown branch.
    #[must_use]
    pub fn neighbors(&self, branch: usize, endpoint: Endpoint) -> &[usize] {
        self.adjacency.get(branch).map_or(&[], |a| a.at(endpoint))
    }

    /// Sampled endpoints of a branch.
    #[must_use]
    pub fn endpoints(&self, branch: usize) -> Option<[Point3<f64>; 2]> {
        self.endpoints.get(branch).copied()
    }

    /// Iterate `(branch, adjacency)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BranchAdjacency)> {
        self.adjacency.iter().enumerate()
    }

    /// Every `(branch, endpoint, neighbor)` triple in index order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, Endpoint, usize)> + '_ {
        self.iter().flat_map(|(i, adj)| {
            Endpoint::ALL
                .into_iter()
                .flat_map(move |e| adj.at(e).iter().map(move |&j| (i, e, j)))
        })
    }

    /// Whether every listed neighbor lists the branch back.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.asymmetric_pairs().is_empty()
    }

    /// `(i, j)` pairs where `j` is a neighbor of `i` but not the reverse.
    #[must_use]
    pub fn asymmetric_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, adj) in self.iter() {
            for j in adj.start.iter().chain(&adj.end) {
                let back = self.adjacency.get(*j).is_some_and(|a| a.contains(i));
                if !back && !pairs.contains(&(i, *j)) {
                    pairs.push((i, *j));
                }
            }
        }
        pairs
    }

    /// Copy of the graph with every missing reverse entry added.
    ///
    /// For a pair `(i, j)` where only `i` lists `j`, `i` is added to `j`'s
    /// endpoint closest to the shared vertex.
    #[must_use]
    pub fn symmetrized(&self) -> Self {
        let mut out = self.clone();

        for (i, j) in self.asymmetric_pairs() {
            let (Some(vertex), Some([first, last])) =
                (self.shared_vertex(i, j), self.endpoints(j))
            else {
                continue;
            };
            let endpoint = if (first - vertex).norm() <= (last - vertex).norm() {
                Endpoint::Start
            } else {
                Endpoint::End
            };

            let list = out.adjacency[j].at_mut(endpoint);
            if !list.contains(&i) {
                list.push(i);
                list.sort_unstable();
            }
        }

        out
    }

    /// Endpoint of `i` at which `j` is listed.
    fn shared_vertex(&self, i: usize, j: usize) -> Option<Point3<f64>> {
        let adj = self.adjacency.get(i)?;
        let [first, last] = *self.endpoints.get(i)?;
        if adj.start.contains(&j) {
            Some(first)
        } else if adj.end.contains(&j) {
            Some(last)
        } else {
            None
        }
    }
}

/// Branches other than `i` with `vertex` among their raw points.
///
/// A branch whose raw list is identical to `i`'s is a duplicate, not a
/// neighbor.
fn touching(branches: &[Branch], i: usize, own: &Branch, vertex: &Point3<f64>) -> Vec<usize> {
    branches
        .iter()
        .enumerate()
        .filter(|&(j, raw)| j != i && raw != own && raw.contains(vertex))
        .map(|(j, _)| j)
        .collect()
}
