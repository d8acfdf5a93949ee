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

//! Collective library context
//!
//! One context per process: it owns the configuration, the worker that all
//! teams post on, and the progress queue that drives their tasks.

use std::sync::Arc;

use crate::config::TlUcpConfig;
use crate::error::CollResult;
use crate::net::{Rank, Worker};
use crate::progress_queue::ProgressQueue;
use crate::tl_info;

/// The entry point to collective operations
pub struct CollContext {
    config: TlUcpConfig,
    worker: Arc<dyn Worker>,
    pq: Arc<ProgressQueue>,
}

impl CollContext {
    /// Create a context over an already initialized worker
    pub fn new(config: TlUcpConfig, worker: Arc<dyn Worker>) -> CollResult<Arc<Self>> {
        config.validate()?;
        tl_info!(
            "initialized context on worker rank {}: n_polls={} alltoallv={} num_posts={}",
            worker.rank(),
            config.n_polls,
            config.alltoallv_algorithm,
            config.alltoallv_pairwise_num_posts
        );
        Ok(Arc::new(Self {
            config,
            worker,
            pq: Arc::new(ProgressQueue::new()),
        }))
    }

    /// Create a context that shares `pq` with other contexts
    ///
    /// Useful when one driver thread progresses several simulated ranks.
    pub fn with_progress_queue(
        config: TlUcpConfig,
        worker: Arc<dyn Worker>,
        pq: Arc<ProgressQueue>,
    ) -> CollResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self { config, worker, pq }))
    }

    pub fn config(&self) -> &TlUcpConfig {
        &self.config
    }

    pub fn worker(&self) -> &Arc<dyn Worker> {
        &self.worker
    }

    pub fn progress_queue(&self) -> &Arc<ProgressQueue> {
        &self.pq
    }

    /// Rank of the worker within its fabric
    pub fn rank(&self) -> Rank {
        self.worker.rank()
    }

    /// One pass over the progress queue
    pub fn progress(&self) -> usize {
        self.pq.progress()
    }
}
