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

//! Teams: fixed groups of ranks that run collectives together

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use hashbrown::HashSet;

use crate::args::CollArgs;
use crate::ctx::CollContext;
use crate::error::{CollError, CollResult};
use crate::net::{make_tag, Rank, Tag, Worker};
use crate::request::CollRequest;
use crate::task::CollectiveTask;
use crate::tl_info;

/// Parameters agreed by all members when a team is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamParams {
    /// This process's index in the team
    pub rank: Rank,
    /// Number of members
    pub size: u32,
    /// Identifier shared by all members, part of every tag
    pub id: u16,
}

/// A team as seen by one of its members
pub struct Team {
    rank: Rank,
    size: u32,
    id: u16,
    ctx: Arc<CollContext>,
    /// Worker rank of every team rank
    members: Vec<Rank>,
    seq_num: AtomicU32,
}

impl Team {
    /// Team whose ranks are the worker ranks `0..size`
    ///
    /// `params.rank` must be the rank of the context's worker.
    pub fn new(ctx: Arc<CollContext>, params: TeamParams) -> CollResult<Arc<Self>> {
        let members = (0..params.size).collect();
        Self::with_members(ctx, params, members)
    }

    /// Team over a subset of the worker's peers
    ///
    /// `members[r]` is the worker rank of team rank `r`. Every member lists
    /// the same ranks in the same order.
    pub fn with_members(
        ctx: Arc<CollContext>,
        params: TeamParams,
        members: Vec<Rank>,
    ) -> CollResult<Arc<Self>> {
        if params.size == 0 {
            return Err(CollError::InvalidParam("team size must be at least 1".to_string()));
        }
        if params.rank >= params.size {
            return Err(CollError::InvalidParam(format!(
                "rank {} outside team of size {}",
                params.rank, params.size
            )));
        }
        if members.len() != params.size as usize {
            return Err(CollError::InvalidParam(format!(
                "team of size {} given {} members",
                params.size,
                members.len()
            )));
        }
        let own = members[params.rank as usize];
        if own != ctx.rank() {
            return Err(CollError::InvalidParam(format!(
                "team rank {} maps to worker rank {}, context worker is rank {}",
                params.rank,
                own,
                ctx.rank()
            )));
        }
        let distinct: HashSet<Rank> = members.iter().copied().collect();
        if distinct.len() != members.len() {
            return Err(CollError::InvalidParam(
                "team members must be distinct worker ranks".to_string(),
            ));
        }
        tl_info!(
            "created team {}: rank {} of {} on worker rank {}",
            params.id,
            params.rank,
            params.size,
            own
        );
        Ok(Arc::new(Self {
            rank: params.rank,
            size: params.size,
            id: params.id,
            ctx,
            members,
            seq_num: AtomicU32::new(0),
        }))
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn context(&self) -> &Arc<CollContext> {
        &self.ctx
    }

    pub fn worker(&self) -> &Arc<dyn Worker> {
        self.ctx.worker()
    }

    /// Worker rank of team rank `peer`
    pub fn worker_rank(&self, peer: Rank) -> CollResult<Rank> {
        self.members.get(peer as usize).copied().ok_or_else(|| {
            CollError::InvalidParam(format!("peer {} outside team of size {}", peer, self.size))
        })
    }

    /// Tag for the next collective issued on this team
    pub fn next_tag(&self) -> Tag {
        make_tag(self.id, self.seq_num.fetch_add(1, Ordering::Relaxed))
    }

    /// Initialize an alltoallv with the configured algorithm
    ///
    /// The request is created but not started; call [`CollRequest::post`].
    pub fn alltoallv_init(self: &Arc<Self>, args: CollArgs) -> CollResult<CollRequest> {
        let algorithm = self.ctx.config().alltoallv_algorithm;
        let task = CollectiveTask::alltoallv(Arc::clone(self), args, algorithm)?;
        Ok(CollRequest::new(task, Arc::clone(self.ctx.progress_queue())))
    }
}
