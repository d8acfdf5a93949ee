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

//! Collective tasks
//!
//! A task is one in-flight collective. It moves through
//! `Created -> Posting -> Draining -> Completed`, or to `Failed` from any
//! non-terminal state. Terminal states are final.

use std::fmt;
use std::sync::Arc;

use crate::alltoallv;
use crate::args::CollArgs;
use crate::config::AlltoallvAlgorithm;
use crate::error::{Code, CollError, CollResult, Status};
use crate::net::{Completion, Rank, RecvOp, RecvRegion, SendOp, Tag};
use crate::team::Team;
use crate::{tl_debug, tl_error, tl_trace};

/// Called once with the terminal status of a task
pub type CompletionCallback = Box<dyn FnOnce(Status) + Send>;

/// Explicit task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Initialized, not started
    Created,
    /// Started, some sends or receives not yet posted
    Posting,
    /// Everything posted, waiting for completions
    Draining,
    Completed,
    Failed(Code),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed(_))
    }

    pub fn status(&self) -> Status {
        match self {
            TaskState::Created => Status::OperationInitialized,
            TaskState::Posting | TaskState::Draining => Status::InProgress,
            TaskState::Completed => Status::Ok,
            TaskState::Failed(code) => Status::Error(*code),
        }
    }
}

/// Posted and completed operation counts of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounters {
    pub send_posted: u32,
    pub send_completed: u32,
    pub recv_posted: u32,
    pub recv_completed: u32,
}

/// One in-flight collective operation
pub struct CollectiveTask {
    pub(crate) team: Arc<Team>,
    pub(crate) args: CollArgs,
    pub(crate) algorithm: AlltoallvAlgorithm,
    pub(crate) tag: Tag,
    pub(crate) send_posted: u32,
    pub(crate) recv_posted: u32,
    pub(crate) completion: Arc<Completion>,
    pub(crate) n_polls: u32,
    state: TaskState,
    error: Option<CollError>,
    callback: Option<CompletionCallback>,
}

impl fmt::Debug for CollectiveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectiveTask")
            .field("algorithm", &self.algorithm)
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("counters", &self.counters())
            .finish()
    }
}

impl CollectiveTask {
    /// Build an alltoallv task; arguments are validated against the team
    pub fn alltoallv(
        team: Arc<Team>,
        args: CollArgs,
        algorithm: AlltoallvAlgorithm,
    ) -> CollResult<Self> {
        args.validate(team.size())?;
        let n_polls = team.context().config().n_polls;
        let tag = team.next_tag();
        Ok(Self {
            team,
            args,
            algorithm,
            tag,
            send_posted: 0,
            recv_posted: 0,
            completion: Arc::new(Completion::new()),
            n_polls,
            state: TaskState::Created,
            error: None,
            callback: None,
        })
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Error that made the task fail
    pub fn error(&self) -> Option<&CollError> {
        self.error.as_ref()
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn algorithm(&self) -> AlltoallvAlgorithm {
        self.algorithm
    }

    pub fn team(&self) -> &Arc<Team> {
        &self.team
    }

    pub fn n_polls(&self) -> u32 {
        self.n_polls
    }

    pub fn counters(&self) -> TaskCounters {
        TaskCounters {
            send_posted: self.send_posted,
            send_completed: self.completion.send_completed(),
            recv_posted: self.recv_posted,
            recv_completed: self.completion.recv_completed(),
        }
    }

    pub fn set_callback(&mut self, callback: CompletionCallback) {
        self.callback = Some(callback);
    }

    /// Begin the collective with a single bounded progress attempt
    ///
    /// Returns the status after that attempt; the caller enqueues the task
    /// if it is still in progress.
    pub fn start(&mut self) -> CollResult<Status> {
        if self.state != TaskState::Created {
            return Err(CollError::InvalidParam(format!(
                "task {:#x} already started ({:?})",
                self.tag, self.state
            )));
        }
        self.state = TaskState::Posting;
        self.n_polls = self.n_polls.min(1);
        tl_debug!(
            "alltoallv {} start: tag {:#x} rank {} size {}",
            self.algorithm,
            self.tag,
            self.team.rank(),
            self.team.size()
        );
        Ok(self.progress())
    }

    /// Advance the task; never blocks beyond the poll budget
    pub fn progress(&mut self) -> Status {
        match self.state {
            TaskState::Created | TaskState::Completed | TaskState::Failed(_) => self.status(),
            TaskState::Posting => alltoallv::progress(self),
            TaskState::Draining => self.test(),
        }
    }

    /// Check transport completions once posting has finished
    ///
    /// Pumps the worker up to `n_polls` times while waiting.
    pub fn test(&mut self) -> Status {
        match self.state {
            TaskState::Draining => {}
            TaskState::Posting if self.all_posted() => self.state = TaskState::Draining,
            _ => return self.status(),
        }
        if let Some(status) = self.check_completion() {
            return status;
        }
        let worker = Arc::clone(self.team.worker());
        for _ in 0..self.n_polls {
            worker.progress();
            if let Some(status) = self.check_completion() {
                return status;
            }
        }
        self.status()
    }

    /// Take the completion callback once the task has terminated
    ///
    /// The caller invokes it after releasing the task, so the callback may
    /// inspect the request.
    pub fn take_terminal_callback(&mut self) -> Option<(CompletionCallback, Status)> {
        if !self.state.is_terminal() {
            return None;
        }
        let status = self.status();
        self.callback.take().map(|callback| (callback, status))
    }

    pub(crate) fn all_posted(&self) -> bool {
        let size = self.team.size();
        self.send_posted == size && self.recv_posted == size
    }

    pub(crate) fn recv_outstanding(&self) -> u32 {
        self.recv_posted
            .saturating_sub(self.completion.recv_completed())
    }

    pub(crate) fn send_outstanding(&self) -> u32 {
        self.send_posted
            .saturating_sub(self.completion.send_completed())
    }

    /// Post the receive from team rank `peer` into its destination segment
    pub(crate) fn post_recv(&mut self, peer: Rank) -> CollResult<()> {
        let dst = &self.args.dst;
        let (offset, len) = dst.segment(peer as usize)?;
        let worker_peer = self.team.worker_rank(peer)?;
        self.team.worker().post_recv(RecvOp {
            region: RecvRegion::new(dst.buffer.clone(), offset, len),
            mem_type: dst.mem_type,
            peer: worker_peer,
            tag: self.tag,
            completion: Arc::clone(&self.completion),
        })?;
        self.recv_posted += 1;
        tl_trace!(
            "tag {:#x}: rank {} posted recv {} from {} ({} bytes at {})",
            self.tag,
            self.team.rank(),
            self.recv_posted,
            peer,
            len,
            offset
        );
        Ok(())
    }

    /// Post the send of the source segment for team rank `peer`
    pub(crate) fn post_send(&mut self, peer: Rank) -> CollResult<()> {
        let src = &self.args.src;
        let (offset, len) = src.segment(peer as usize)?;
        let worker_peer = self.team.worker_rank(peer)?;
        {
            let data = src.buffer.lock()?;
            let bytes = data.get(offset..offset + len).ok_or_else(|| {
                CollError::InvalidParam(format!(
                    "source segment for peer {} outside buffer of {} bytes",
                    peer,
                    data.len()
                ))
            })?;
            self.team.worker().post_send(SendOp {
                data: bytes,
                mem_type: src.mem_type,
                peer: worker_peer,
                tag: self.tag,
                completion: Arc::clone(&self.completion),
            })?;
        }
        self.send_posted += 1;
        tl_trace!(
            "tag {:#x}: rank {} posted send {} to {} ({} bytes at {})",
            self.tag,
            self.team.rank(),
            self.send_posted,
            peer,
            len,
            offset
        );
        Ok(())
    }

    /// Move to `Failed` unless already terminal; returns the resulting status
    pub(crate) fn fail(&mut self, error: CollError) -> Status {
        if !self.state.is_terminal() {
            tl_error!(
                "tag {:#x}: rank {} failed: {}",
                self.tag,
                self.team.rank(),
                error
            );
            self.state = TaskState::Failed(error.code());
            self.error = Some(error);
        }
        self.status()
    }

    fn check_completion(&mut self) -> Option<Status> {
        if let Some(error) = self.completion.error() {
            return Some(self.fail(error));
        }
        let size = self.team.size();
        if self.completion.send_completed() >= size && self.completion.recv_completed() >= size {
            self.state = TaskState::Completed;
            tl_debug!(
                "tag {:#x}: rank {} completed",
                self.tag,
                self.team.rank()
            );
            return Some(Status::Ok);
        }
        None
    }
}
