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

//! In-process loopback fabric
//!
//! Every rank of a simulated job gets a [`LoopbackWorker`] on one shared
//! [`LoopbackFabric`]. Sends are eager: the payload is copied into the
//! destination inbox when posted. A worker's `progress` matches the receives
//! it has posted against its inbox by `(source, tag)` in posting order and
//! finishes both sides of every match.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;

use crate::data_types::MemoryType;
use crate::error::{Code, CollError, CollResult};
use crate::{tl_error, tl_trace};

use super::{Completion, Rank, RecvOp, RecvRegion, SendOp, Tag, Worker};

struct Envelope {
    data: Vec<u8>,
    completion: Arc<Completion>,
}

struct PostedRecv {
    peer: Rank,
    tag: Tag,
    region: RecvRegion,
    completion: Arc<Completion>,
}

#[derive(Default)]
struct Inbox {
    unexpected: HashMap<(Rank, Tag), VecDeque<Envelope>>,
    posted: VecDeque<PostedRecv>,
}

/// Shared message store of a simulated job
pub struct LoopbackFabric {
    size: u32,
    inboxes: Mutex<Vec<Inbox>>,
}

impl LoopbackFabric {
    /// Create a fabric for `size` ranks
    pub fn new(size: u32) -> Arc<Self> {
        let inboxes = (0..size).map(|_| Inbox::default()).collect();
        Arc::new(Self {
            size,
            inboxes: Mutex::new(inboxes),
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Worker endpoint for `rank`
    pub fn worker(self: &Arc<Self>, rank: Rank) -> CollResult<LoopbackWorker> {
        if rank >= self.size {
            return Err(CollError::InvalidParam(format!(
                "rank {} outside fabric of size {}",
                rank, self.size
            )));
        }
        Ok(LoopbackWorker {
            rank,
            fabric: Arc::clone(self),
            faults: Mutex::new(FaultPlan::default()),
            stats: Counters::default(),
        })
    }

    /// Messages delivered to `rank` that no receive has claimed yet
    pub fn unexpected_count(&self, rank: Rank) -> usize {
        self.lock()
            .ok()
            .and_then(|inboxes| {
                inboxes
                    .get(rank as usize)
                    .map(|inbox| inbox.unexpected.values().map(VecDeque::len).sum::<usize>())
            })
            .unwrap_or(0)
    }

    fn lock(&self) -> CollResult<MutexGuard<'_, Vec<Inbox>>> {
        self.inboxes
            .lock()
            .map_err(|_| CollError::NoResource("loopback fabric lock poisoned".to_string()))
    }
}

#[derive(Default)]
struct FaultPlan {
    post: Option<Code>,
    completion: Option<Code>,
}

#[derive(Default)]
struct Counters {
    sends_posted: AtomicUsize,
    recvs_posted: AtomicUsize,
    matched: AtomicUsize,
}

/// Snapshot of a worker's activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopbackStats {
    pub sends_posted: usize,
    pub recvs_posted: usize,
    pub messages_matched: usize,
}

/// One rank's endpoint on a [`LoopbackFabric`]
pub struct LoopbackWorker {
    rank: Rank,
    fabric: Arc<LoopbackFabric>,
    faults: Mutex<FaultPlan>,
    stats: Counters,
}

impl LoopbackWorker {
    /// Reject the next post on this worker with `code`
    pub fn inject_post_failure(&self, code: Code) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.post = Some(code);
        }
    }

    /// Fail the next receive this worker completes with `code`
    pub fn inject_completion_failure(&self, code: Code) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.completion = Some(code);
        }
    }

    pub fn stats(&self) -> LoopbackStats {
        LoopbackStats {
            sends_posted: self.stats.sends_posted.load(Ordering::Relaxed),
            recvs_posted: self.stats.recvs_posted.load(Ordering::Relaxed),
            messages_matched: self.stats.matched.load(Ordering::Relaxed),
        }
    }

    fn check_post(&self, peer: Rank, mem_type: MemoryType) -> CollResult<()> {
        if let Some(code) = self.faults.lock().ok().and_then(|mut f| f.post.take()) {
            return Err(CollError::transport(
                code,
                format!("injected post failure on rank {}", self.rank),
            ));
        }
        if peer >= self.fabric.size {
            return Err(CollError::InvalidParam(format!(
                "peer {} outside fabric of size {}",
                peer, self.fabric.size
            )));
        }
        if mem_type != MemoryType::Host {
            return Err(CollError::NotSupported(format!(
                "loopback fabric cannot access {:?} memory",
                mem_type
            )));
        }
        Ok(())
    }

    fn take_completion_fault(&self) -> Option<Code> {
        self.faults.lock().ok().and_then(|mut f| f.completion.take())
    }
}

impl Worker for LoopbackWorker {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn post_send(&self, op: SendOp<'_>) -> CollResult<()> {
        self.check_post(op.peer, op.mem_type)?;
        let mut inboxes = self.fabric.lock()?;
        inboxes[op.peer as usize]
            .unexpected
            .entry((self.rank, op.tag))
            .or_default()
            .push_back(Envelope {
                data: op.data.to_vec(),
                completion: op.completion,
            });
        self.stats.sends_posted.fetch_add(1, Ordering::Relaxed);
        tl_trace!(
            "loopback: rank {} queued {} bytes for rank {} tag {:#x}",
            self.rank,
            op.data.len(),
            op.peer,
            op.tag
        );
        Ok(())
    }

    fn post_recv(&self, op: RecvOp) -> CollResult<()> {
        self.check_post(op.peer, op.mem_type)?;
        let mut inboxes = self.fabric.lock()?;
        inboxes[self.rank as usize].posted.push_back(PostedRecv {
            peer: op.peer,
            tag: op.tag,
            region: op.region,
            completion: op.completion,
        });
        self.stats.recvs_posted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn progress(&self) -> usize {
        // Matches are collected under the fabric lock and delivered after it
        // is released: senders lock their buffer before the fabric.
        let matches: Vec<(PostedRecv, Envelope)> = {
            let mut inboxes = match self.fabric.lock() {
                Ok(inboxes) => inboxes,
                Err(_) => return 0,
            };
            let inbox = &mut inboxes[self.rank as usize];
            let mut matched = Vec::new();
            let mut waiting = VecDeque::with_capacity(inbox.posted.len());
            while let Some(recv) = inbox.posted.pop_front() {
                let key = (recv.peer, recv.tag);
                match inbox.unexpected.get_mut(&key).and_then(VecDeque::pop_front) {
                    Some(envelope) => {
                        if inbox.unexpected.get(&key).map_or(false, VecDeque::is_empty) {
                            inbox.unexpected.remove(&key);
                        }
                        matched.push((recv, envelope));
                    }
                    None => waiting.push_back(recv),
                }
            }
            inbox.posted = waiting;
            matched
        };

        let events = matches.len();
        for (recv, envelope) in matches {
            deliver(self, recv, envelope);
        }
        self.stats.matched.fetch_add(events, Ordering::Relaxed);
        events
    }
}

fn deliver(worker: &LoopbackWorker, recv: PostedRecv, envelope: Envelope) {
    let len = envelope.data.len();
    // The sender's buffer was copied at post time; its side is done.
    envelope.completion.complete_send();

    if let Some(code) = worker.take_completion_fault() {
        tl_error!(
            "loopback: injected completion failure on rank {} from peer {}",
            worker.rank,
            recv.peer
        );
        recv.completion.fail_recv(CollError::transport(
            code,
            format!("injected completion failure from peer {}", recv.peer),
        ));
        return;
    }

    if len > recv.region.len {
        tl_error!(
            "loopback: message of {} bytes from peer {} truncated to {}",
            len,
            recv.peer,
            recv.region.len
        );
        recv.completion.fail_recv(CollError::transport(
            Code::NoMessage,
            format!(
                "message truncated: {} bytes from peer {} into {} byte region",
                len, recv.peer, recv.region.len
            ),
        ));
        return;
    }

    match recv.region.buffer.write(recv.region.offset, &envelope.data) {
        Ok(()) => recv.completion.complete_recv(),
        Err(e) => recv.completion.fail_recv(e),
    }
}
