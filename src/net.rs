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

//! Transport boundary consumed by the collective engine
//!
//! The engine only needs non-blocking tagged send/receive posts and a
//! progress pump. Completions are reported through a shared [`Completion`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::data_types::MemoryType;
use crate::error::CollResult;

pub mod buffer;
pub mod completion;
pub mod loopback;

pub use buffer::{RecvRegion, SharedBuffer};
pub use completion::Completion;
pub use loopback::{LoopbackFabric, LoopbackStats, LoopbackWorker};

/// Index of a process within a team
pub type Rank = u32;

/// Operation-scoped matching key
pub type Tag = u64;

/// Build the tag of a collective from its team id and sequence number
pub fn make_tag(team_id: u16, seq_num: u32) -> Tag {
    ((team_id as u64) << 32) | seq_num as u64
}

/// A send to be posted on a worker
pub struct SendOp<'a> {
    pub data: &'a [u8],
    pub mem_type: MemoryType,
    /// Worker rank, not team rank
    pub peer: Rank,
    pub tag: Tag,
    pub completion: Arc<Completion>,
}

/// A receive to be posted on a worker
pub struct RecvOp {
    pub region: RecvRegion,
    pub mem_type: MemoryType,
    /// Worker rank of the sender
    pub peer: Rank,
    pub tag: Tag,
    pub completion: Arc<Completion>,
}

/// Non-blocking point-to-point worker
///
/// Posts return as soon as the operation is queued. Nothing advances until
/// `progress` is called; it may also finish operations that belong to other
/// collectives sharing the same worker.
pub trait Worker: Send + Sync {
    /// Rank of this worker within its fabric
    fn rank(&self) -> Rank;

    fn post_send(&self, op: SendOp<'_>) -> CollResult<()>;

    fn post_recv(&self, op: RecvOp) -> CollResult<()>;

    /// Drive outstanding operations; returns the number of events processed
    fn progress(&self) -> usize;
}

/// Request trait for non-blocking operations
#[async_trait]
pub trait Request: Send + Sync {
    async fn wait(&mut self) -> CollResult<()>;
    fn test(&mut self) -> CollResult<bool>;
}
