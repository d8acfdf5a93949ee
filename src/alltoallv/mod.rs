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

//! Alltoallv algorithms
//!
//! Every variant is a peer schedule plugged into one posting engine. The
//! engine posts receives and sends in schedule order, keeps at most
//! `max_outstanding` of each in flight, and hands over to
//! [`CollectiveTask::test`] once everything is posted.

use std::sync::Arc;

use crate::config::AlltoallvAlgorithm;
use crate::error::Status;
use crate::net::Rank;
use crate::task::{CollectiveTask, TaskState};

pub mod linear;
pub mod pairwise;

pub use linear::Linear;
pub use pairwise::Pairwise;

/// Order in which a rank contacts its peers
pub trait AlltoallvSchedule: Send + Sync {
    /// Peer whose data is received at `step`
    fn recv_peer(&self, rank: Rank, size: u32, step: u32) -> Rank;

    /// Peer that is sent to at `step`
    fn send_peer(&self, rank: Rank, size: u32, step: u32) -> Rank;

    /// Outstanding operations allowed per direction
    fn max_outstanding(&self, num_posts: u32, size: u32) -> u32;
}

impl AlltoallvAlgorithm {
    pub fn schedule(&self) -> &'static dyn AlltoallvSchedule {
        static PAIRWISE: Pairwise = Pairwise;
        static LINEAR: Linear = Linear;
        match self {
            AlltoallvAlgorithm::Pairwise => &PAIRWISE,
            AlltoallvAlgorithm::Linear => &LINEAR,
        }
    }
}

/// Posting phase of an alltoallv task
///
/// The poll counter restarts whenever something gets posted, so the budget
/// bounds consecutive polls that made no progress.
pub(crate) fn progress(task: &mut CollectiveTask) -> Status {
    let team = Arc::clone(&task.team);
    let worker = Arc::clone(team.worker());
    let rank = team.rank();
    let size = team.size();
    let schedule = task.algorithm.schedule();
    let nreqs = schedule.max_outstanding(
        team.context().config().alltoallv_pairwise_num_posts,
        size,
    );

    let mut polls = 0u32;
    while !task.all_posted() && polls < task.n_polls {
        polls += 1;
        worker.progress();
        while task.recv_posted < size && task.recv_outstanding() < nreqs {
            let peer = schedule.recv_peer(rank, size, task.recv_posted);
            if let Err(e) = task.post_recv(peer) {
                return task.fail(e);
            }
            polls = 0;
        }
        while task.send_posted < size && task.send_outstanding() < nreqs {
            let peer = schedule.send_peer(rank, size, task.send_posted);
            if let Err(e) = task.post_send(peer) {
                return task.fail(e);
            }
            polls = 0;
        }
    }

    if !task.all_posted() {
        return task.status();
    }
    debug_assert_eq!(task.state(), TaskState::Posting);
    task.test()
}
