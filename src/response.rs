//! Schema, validation and text rendering of the `api/clusters` reply.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MENTION_SEPARATOR: &str = ";\n";
pub const CLUSTER_SEPARATOR: &str = ";\n---\n";

/// Raw reply as sent by the server. Cluster members index into `mentions`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClusterPayload {
    pub mentions: Vec<String>,
    pub clusters: Vec<Vec<usize>>,
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response body is not a valid cluster payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(
        "cluster {cluster} references mention {index} at position {position}, \
         but only {mentions} mentions were returned"
    )]
    IndexOutOfRange {
        cluster: usize,
        position: usize,
        index: usize,
        mentions: usize,
    },
}

impl ClusterPayload {
    pub fn from_json(body: &[u8]) -> Result<Self, ResponseError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// A payload whose cluster indices have all been checked against the
/// mention list.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Resolution {
    mentions: Vec<String>,
    clusters: Vec<Vec<usize>>,
}

impl TryFrom<ClusterPayload> for Resolution {
    type Error = ResponseError;

    fn try_from(payload: ClusterPayload) -> Result<Self, Self::Error> {
        let mentions = payload.mentions.len();
        for (cluster, members) in payload.clusters.iter().enumerate() {
            if let Some((position, &index)) = members
                .iter()
                .enumerate()
                .find(|(_, index)| **index >= mentions)
            {
                return Err(ResponseError::IndexOutOfRange {
                    cluster,
                    position,
                    index,
                    mentions,
                });
            }
        }
        Ok(Self {
            mentions: payload.mentions,
            clusters: payload.clusters,
        })
    }
}

/// Text written into the two output areas.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct RenderedOutput {
    pub mentions: String,
    pub clusters: String,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct ResolutionSummary {
    pub mentions: usize,
    pub clusters: usize,
    /// Mentions that appear in no multi-member cluster.
    pub singletons: usize,
}

impl Resolution {
    pub fn from_json(body: &[u8]) -> Result<Self, ResponseError> {
        Self::try_from(ClusterPayload::from_json(body)?)
    }

    pub fn mentions(&self) -> &[String] {
        &self.mentions
    }

    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }

    /// Members of one cluster, resolved to their mention text.
    pub fn cluster_mentions(&self, cluster: usize) -> impl Iterator<Item = &str> + '_ {
        self.clusters
            .get(cluster)
            .into_iter()
            .flatten()
            .map(|&index| self.mentions[index].as_str())
    }

    pub fn render(&self) -> RenderedOutput {
        RenderedOutput {
            mentions: render_mentions(&self.mentions),
            clusters: render_clusters(self),
        }
    }

    pub fn summary(&self) -> ResolutionSummary {
        let mut grouped = vec![false; self.mentions.len()];
        for members in self.clusters.iter().filter(|members| members.len() > 1) {
            for &index in members {
                grouped[index] = true;
            }
        }
        ResolutionSummary {
            mentions: self.mentions.len(),
            clusters: self.clusters.len(),
            singletons: grouped.iter().filter(|grouped| !**grouped).count(),
        }
    }
}

/// `1: "<mention>"` per mention, joined by `;\n`.
pub fn render_mentions(mentions: &[String]) -> String {
    mentions
        .iter()
        .enumerate()
        .map(|(idx, mention)| format!("{}: \"{}\"", idx + 1, mention))
        .collect::<Vec<_>>()
        .join(MENTION_SEPARATOR)
}

/// `<n>: "<m>", "<m>"` per cluster in server order, joined by `;\n---\n`.
pub fn render_clusters(resolution: &Resolution) -> String {
    (0..resolution.clusters.len())
        .map(|idx| {
            let members = resolution
                .cluster_mentions(idx)
                .map(|mention| format!("\"{mention}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: {}", idx + 1, members)
        })
        .collect::<Vec<_>>()
        .join(CLUSTER_SEPARATOR)
}
