// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transport-layer library configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CollError, CollResult};

/// Environment variable for the no-progress poll budget
pub const ENV_N_POLLS: &str = "UCC_TL_UCP_NPOLLS";
/// Environment variable for the pairwise alltoallv window
pub const ENV_ALLTOALLV_PAIRWISE_NUM_POSTS: &str = "UCC_TL_UCP_ALLTOALLV_PAIRWISE_NUM_POSTS";
/// Environment variable selecting the alltoallv algorithm
pub const ENV_ALLTOALLV_ALGORITHM: &str = "UCC_TL_UCP_ALLTOALLV_ALGORITHM";

/// Alltoallv algorithm variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlltoallvAlgorithm {
    /// Opposite-direction rotation with a bounded window
    #[default]
    Pairwise,
    /// Peers in rank order, everything posted at once
    Linear,
}

impl fmt::Display for AlltoallvAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlltoallvAlgorithm::Pairwise => write!(f, "pairwise"),
            AlltoallvAlgorithm::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for AlltoallvAlgorithm {
    type Err = CollError;

    fn from_str(s: &str) -> CollResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pairwise" => Ok(AlltoallvAlgorithm::Pairwise),
            "linear" => Ok(AlltoallvAlgorithm::Linear),
            other => Err(CollError::InvalidParam(format!(
                "unknown alltoallv algorithm '{}'",
                other
            ))),
        }
    }
}

/// Library configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlUcpConfig {
    /// Consecutive polls without posting progress before a progress call
    /// yields back to the scheduler
    pub n_polls: u32,

    /// Maximum outstanding sends and receives of the pairwise alltoallv;
    /// 0 means the team size
    pub alltoallv_pairwise_num_posts: u32,

    /// Alltoallv algorithm used for new collectives
    pub alltoallv_algorithm: AlltoallvAlgorithm,
}

impl Default for TlUcpConfig {
    fn default() -> Self {
        Self {
            n_polls: 10,
            alltoallv_pairwise_num_posts: 1,
            alltoallv_algorithm: AlltoallvAlgorithm::Pairwise,
        }
    }
}

impl TlUcpConfig {
    /// Defaults overridden by any `UCC_TL_UCP_*` variables that are set
    pub fn from_env() -> CollResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by values returned from `lookup`
    pub fn from_lookup<F>(lookup: F) -> CollResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_N_POLLS) {
            config.n_polls = parse_u32(ENV_N_POLLS, &value)?;
        }
        if let Some(value) = lookup(ENV_ALLTOALLV_PAIRWISE_NUM_POSTS) {
            config.alltoallv_pairwise_num_posts =
                parse_u32(ENV_ALLTOALLV_PAIRWISE_NUM_POSTS, &value)?;
        }
        if let Some(value) = lookup(ENV_ALLTOALLV_ALGORITHM) {
            config.alltoallv_algorithm = value.parse().map_err(|_| {
                CollError::InvalidParam(format!(
                    "{}: unknown alltoallv algorithm '{}'",
                    ENV_ALLTOALLV_ALGORITHM, value
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Builder pattern: set the poll budget
    pub fn n_polls(mut self, n_polls: u32) -> Self {
        self.n_polls = n_polls;
        self
    }

    /// Builder pattern: set the pairwise window
    pub fn alltoallv_pairwise_num_posts(mut self, num_posts: u32) -> Self {
        self.alltoallv_pairwise_num_posts = num_posts;
        self
    }

    /// Builder pattern: select the alltoallv algorithm
    pub fn alltoallv_algorithm(mut self, algorithm: AlltoallvAlgorithm) -> Self {
        self.alltoallv_algorithm = algorithm;
        self
    }

    pub fn validate(&self) -> CollResult<()> {
        if self.n_polls == 0 {
            return Err(CollError::InvalidParam(
                "n_polls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_u32(name: &str, value: &str) -> CollResult<u32> {
    value.trim().parse::<u32>().map_err(|e| {
        CollError::InvalidParam(format!("{}: cannot parse '{}': {}", name, value, e))
    })
}
