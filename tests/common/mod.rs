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

//! Shared helpers: a simulated job of N ranks on one loopback fabric,
//! all driven from the calling thread through one progress queue.

#![allow(dead_code)]

use std::sync::Arc;

use cylon_coll::net::{LoopbackFabric, LoopbackWorker};
use cylon_coll::{
    BufferInfoV, CollArgs, CollContext, CollRequest, CountArray, DataType, ProgressQueue,
    SharedBuffer, Team, TeamParams, TlUcpConfig, Worker,
};

pub const TEAM_ID: u16 = 7;
pub const SENTINEL: u8 = 0xEE;
pub const DT: DataType = DataType::Int32;
pub const MAX_PASSES: usize = 10_000;

pub struct Job {
    pub fabric: Arc<LoopbackFabric>,
    pub workers: Vec<Arc<LoopbackWorker>>,
    pub teams: Vec<Arc<Team>>,
    pub pq: Arc<ProgressQueue>,
}

pub fn job(size: u32, config: TlUcpConfig) -> Job {
    cylon_coll::util::logging::init_logging();
    let fabric = LoopbackFabric::new(size);
    let pq = Arc::new(ProgressQueue::new());
    let mut workers = Vec::new();
    let mut teams = Vec::new();
    for rank in 0..size {
        let worker = Arc::new(fabric.worker(rank).unwrap());
        let dyn_worker: Arc<dyn Worker> = worker.clone();
        teams.push(team_on(dyn_worker, rank, size, config.clone(), &pq));
        workers.push(worker);
    }
    Job {
        fabric,
        workers,
        teams,
        pq,
    }
}

/// Team member posting on an arbitrary worker, sharing `pq`
pub fn team_on(
    worker: Arc<dyn Worker>,
    rank: u32,
    size: u32,
    config: TlUcpConfig,
    pq: &Arc<ProgressQueue>,
) -> Arc<Team> {
    let ctx = CollContext::with_progress_queue(config, worker, Arc::clone(pq)).unwrap();
    Team::new(
        ctx,
        TeamParams {
            rank,
            size,
            id: TEAM_ID,
        },
    )
    .unwrap()
}

/// Elements rank `src` sends to rank `dst`; some pairs exchange nothing
pub fn count(src: u32, dst: u32) -> u32 {
    (src * 3 + dst * 5) % 4
}

/// Every exchanged element is unique to its (src, dst, index)
pub fn element(src: u32, dst: u32, idx: u32) -> [u8; 4] {
    ((src << 20) | (dst << 10) | idx).to_le_bytes()
}

pub struct Exchange {
    pub args: CollArgs,
    pub dst: SharedBuffer,
    pub expected: Vec<u8>,
}

impl Exchange {
    pub fn assert_delivered(&self, rank: u32) {
        assert_eq!(
            self.dst.to_vec().unwrap(),
            self.expected,
            "rank {} received unexpected data",
            rank
        );
    }
}

/// Alltoallv arguments of `rank` in a team of `size`
///
/// Source segments are stored in reverse peer order. Destination segments
/// are in peer order with one untouched element after each.
pub fn exchange<F>(rank: u32, size: u32, counts: F, wide: bool) -> Exchange
where
    F: Fn(u32, u32) -> u32,
{
    let dt = DT.size();
    let n = size as usize;

    let mut src_counts = vec![0u64; n];
    let mut src_displs = vec![0u64; n];
    let mut src_bytes = Vec::new();
    for peer in (0..size).rev() {
        let c = counts(rank, peer);
        src_counts[peer as usize] = c as u64;
        src_displs[peer as usize] = (src_bytes.len() / dt) as u64;
        for i in 0..c {
            src_bytes.extend_from_slice(&element(rank, peer, i));
        }
    }

    let mut dst_counts = vec![0u64; n];
    let mut dst_displs = vec![0u64; n];
    let mut expected = Vec::new();
    for peer in 0..size {
        let c = counts(peer, rank);
        dst_counts[peer as usize] = c as u64;
        dst_displs[peer as usize] = (expected.len() / dt) as u64;
        for i in 0..c {
            expected.extend_from_slice(&element(peer, rank, i));
        }
        expected.extend_from_slice(&[SENTINEL; 4]);
    }

    let dst = SharedBuffer::with_data(vec![SENTINEL; expected.len()]);
    let src = BufferInfoV::new(
        SharedBuffer::with_data(src_bytes),
        array(src_counts, wide),
        array(src_displs, wide),
        DT,
    );
    let dst_info = BufferInfoV::new(
        dst.clone(),
        array(dst_counts, wide),
        array(dst_displs, wide),
        DT,
    );
    Exchange {
        args: CollArgs::alltoallv(src, dst_info),
        dst,
        expected,
    }
}

pub fn array(values: Vec<u64>, wide: bool) -> CountArray {
    if wide {
        CountArray::U64(values)
    } else {
        CountArray::U32(values.into_iter().map(|v| v as u32).collect())
    }
}

/// Initialize and post one alltoallv per rank; returns the requests and
/// the exchanges holding the destination buffers
pub fn post_all(job: &Job, wide: bool) -> (Vec<CollRequest>, Vec<Exchange>) {
    let size = job.teams.len() as u32;
    let mut requests = Vec::new();
    let mut exchanges = Vec::new();
    for (rank, team) in job.teams.iter().enumerate() {
        let ex = exchange(rank as u32, size, count, wide);
        let request = team.alltoallv_init(ex.args.clone()).unwrap();
        request.post().unwrap();
        requests.push(request);
        exchanges.push(ex);
    }
    (requests, exchanges)
}
