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

//! Tests for the pairwise alltoallv over the loopback fabric

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cylon_coll::alltoallv::pairwise::{get_recv_peer, get_send_peer};
use cylon_coll::net::{LoopbackWorker, RecvOp, SendOp};
use cylon_coll::{
    AlltoallvAlgorithm, CollResult, ProgressQueue, Status, TaskCounters, TlUcpConfig, Worker,
};

use common::*;

fn full(size: u32) -> TaskCounters {
    TaskCounters {
        send_posted: size,
        send_completed: size,
        recv_posted: size,
        recv_completed: size,
    }
}

#[test]
fn test_pairwise_peers_meet_at_same_step() {
    for size in 1..=9u32 {
        for rank in 0..size {
            for step in 0..size {
                let from = get_recv_peer(rank, size, step);
                assert_eq!(get_send_peer(from, size, step), rank);
            }
            let mut recv_peers: Vec<u32> = (0..size).map(|s| get_recv_peer(rank, size, s)).collect();
            let mut send_peers: Vec<u32> = (0..size).map(|s| get_send_peer(rank, size, s)).collect();
            assert_eq!(recv_peers[0], rank);
            assert_eq!(send_peers[0], rank);
            recv_peers.sort_unstable();
            send_peers.sort_unstable();
            let all: Vec<u32> = (0..size).collect();
            assert_eq!(recv_peers, all);
            assert_eq!(send_peers, all);
        }
    }
}

#[test]
fn test_counters_reach_team_size() {
    for size in 1..=8u32 {
        let job = job(size, TlUcpConfig::default());
        let (requests, exchanges) = post_all(&job, false);
        job.pq.run(MAX_PASSES).unwrap();

        for (rank, (request, ex)) in requests.into_iter().zip(exchanges).enumerate() {
            assert_eq!(request.status(), Status::Ok);
            ex.assert_delivered(rank as u32);
            assert_eq!(request.finalize().unwrap(), full(size));
        }
        for rank in 0..size {
            assert_eq!(job.fabric.unexpected_count(rank), 0);
        }
    }
}

#[test]
fn test_four_ranks_deliver_every_pair() {
    let job = job(4, TlUcpConfig::default());
    let (requests, exchanges) = post_all(&job, false);
    job.pq.run(MAX_PASSES).unwrap();

    for (rank, ex) in exchanges.iter().enumerate() {
        let rank = rank as u32;
        let data = ex.dst.to_vec().unwrap();
        let mut offset = 0;
        for peer in 0..4 {
            for i in 0..count(peer, rank) {
                assert_eq!(
                    &data[offset..offset + 4],
                    &element(peer, rank, i),
                    "element {} from {} at rank {}",
                    i,
                    peer,
                    rank
                );
                offset += 4;
            }
            assert_eq!(&data[offset..offset + 4], &[SENTINEL; 4]);
            offset += 4;
        }
    }
    assert!(requests.iter().all(|r| r.status() == Status::Ok));
}

#[test]
fn test_widths_deliver_same_bytes() {
    let narrow = job(5, TlUcpConfig::default());
    let (_, narrow_ex) = post_all(&narrow, false);
    narrow.pq.run(MAX_PASSES).unwrap();

    let wide = job(5, TlUcpConfig::default());
    let (wide_requests, wide_ex) = post_all(&wide, true);
    wide.pq.run(MAX_PASSES).unwrap();

    assert!(wide_ex[0].args.is_count_64bit());
    assert!(wide_ex[0].args.is_displacements_64bit());
    assert!(!narrow_ex[0].args.is_count_64bit());
    for (rank, (n, w)) in narrow_ex.iter().zip(&wide_ex).enumerate() {
        w.assert_delivered(rank as u32);
        assert_eq!(n.dst.to_vec().unwrap(), w.dst.to_vec().unwrap());
    }
    for request in wide_requests {
        assert_eq!(request.finalize().unwrap(), full(5));
    }
}

#[test]
fn test_mixed_widths_counts_and_displacements() {
    let size = 3;
    let job = job(size, TlUcpConfig::default());
    let mut requests = Vec::new();
    let mut exchanges = Vec::new();
    for (rank, team) in job.teams.iter().enumerate() {
        let mut ex = exchange(rank as u32, size, count, false);
        for side in [&mut ex.args.src, &mut ex.args.dst] {
            let displs: Vec<u64> = (0..size as usize)
                .map(|p| side.displacements.get(p).unwrap())
                .collect();
            side.displacements = array(displs, true);
        }
        let args = cylon_coll::CollArgs::alltoallv(ex.args.src.clone(), ex.args.dst.clone());
        assert!(!args.is_count_64bit());
        assert!(args.is_displacements_64bit());
        let request = team.alltoallv_init(args).unwrap();
        request.post().unwrap();
        requests.push(request);
        exchanges.push(ex);
    }
    job.pq.run(MAX_PASSES).unwrap();
    for (rank, ex) in exchanges.iter().enumerate() {
        ex.assert_delivered(rank as u32);
    }
}

#[test]
fn test_single_rank_completes_at_post() {
    let job = job(1, TlUcpConfig::default());
    let (requests, exchanges) = post_all(&job, false);

    assert!(job.pq.is_empty());
    assert_eq!(requests[0].status(), Status::Ok);
    exchanges[0].assert_delivered(0);
    let request = requests.into_iter().next().unwrap();
    assert_eq!(request.finalize().unwrap(), full(1));
}

#[test]
fn test_zero_sized_segments_complete() {
    let size = 4;
    let job = job(size, TlUcpConfig::default());
    let mut requests = Vec::new();
    let mut exchanges = Vec::new();
    for (rank, team) in job.teams.iter().enumerate() {
        let ex = exchange(rank as u32, size, |_, _| 0, false);
        assert_eq!(ex.args.src.buffer.len().unwrap(), 0);
        let request = team.alltoallv_init(ex.args.clone()).unwrap();
        request.post().unwrap();
        requests.push(request);
        exchanges.push(ex);
    }
    job.pq.run(MAX_PASSES).unwrap();
    for (rank, (request, ex)) in requests.into_iter().zip(exchanges).enumerate() {
        ex.assert_delivered(rank as u32);
        assert_eq!(request.finalize().unwrap(), full(size));
    }
}

#[test]
fn test_linear_algorithm_delivers_data() {
    let config = TlUcpConfig::default().alltoallv_algorithm(AlltoallvAlgorithm::Linear);
    let job = job(6, config);
    let (requests, exchanges) = post_all(&job, true);
    job.pq.run(MAX_PASSES).unwrap();
    for (rank, (request, ex)) in requests.into_iter().zip(exchanges).enumerate() {
        ex.assert_delivered(rank as u32);
        assert_eq!(request.finalize().unwrap(), full(6));
    }
}

#[test]
fn test_back_to_back_collectives_on_same_teams() {
    let size = 3;
    let job = job(size, TlUcpConfig::default());
    let other = |src: u32, dst: u32| (src + 2 * dst) % 3 + 1;

    let mut requests = Vec::new();
    let mut exchanges = Vec::new();
    for (rank, team) in job.teams.iter().enumerate() {
        for ex in [
            exchange(rank as u32, size, count, false),
            exchange(rank as u32, size, other, false),
        ] {
            let request = team.alltoallv_init(ex.args.clone()).unwrap();
            request.post().unwrap();
            requests.push(request);
            exchanges.push((rank as u32, ex));
        }
    }
    job.pq.run(MAX_PASSES).unwrap();
    for (rank, ex) in &exchanges {
        ex.assert_delivered(*rank);
    }
    assert!(requests.iter().all(|r| r.status() == Status::Ok));
}

/// Forwards to a loopback worker and records the largest number of
/// operations a task had outstanding right after each post
struct WindowRecorder {
    inner: Arc<LoopbackWorker>,
    sends: AtomicU32,
    recvs: AtomicU32,
    max_sends: AtomicU32,
    max_recvs: AtomicU32,
}

impl WindowRecorder {
    fn new(inner: Arc<LoopbackWorker>) -> Self {
        Self {
            inner,
            sends: AtomicU32::new(0),
            recvs: AtomicU32::new(0),
            max_sends: AtomicU32::new(0),
            max_recvs: AtomicU32::new(0),
        }
    }
}

impl Worker for WindowRecorder {
    fn rank(&self) -> u32 {
        self.inner.rank()
    }

    fn post_send(&self, op: SendOp<'_>) -> CollResult<()> {
        let posted = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        let outstanding = posted - op.completion.send_completed();
        self.max_sends.fetch_max(outstanding, Ordering::SeqCst);
        self.inner.post_send(op)
    }

    fn post_recv(&self, op: RecvOp) -> CollResult<()> {
        let posted = self.recvs.fetch_add(1, Ordering::SeqCst) + 1;
        let outstanding = posted - op.completion.recv_completed();
        self.max_recvs.fetch_max(outstanding, Ordering::SeqCst);
        self.inner.post_recv(op)
    }

    fn progress(&self) -> usize {
        self.inner.progress()
    }
}

fn recorded_run(size: u32, config: TlUcpConfig) -> Vec<Arc<WindowRecorder>> {
    let fabric = cylon_coll::net::LoopbackFabric::new(size);
    let pq = Arc::new(ProgressQueue::new());
    let mut recorders = Vec::new();
    let mut requests = Vec::new();
    let mut exchanges = Vec::new();
    for rank in 0..size {
        let recorder = Arc::new(WindowRecorder::new(Arc::new(fabric.worker(rank).unwrap())));
        let worker: Arc<dyn Worker> = recorder.clone();
        let team = team_on(worker, rank, size, config.clone(), &pq);
        let ex = exchange(rank, size, count, false);
        let request = team.alltoallv_init(ex.args.clone()).unwrap();
        request.post().unwrap();
        recorders.push(recorder);
        requests.push(request);
        exchanges.push(ex);
    }
    pq.run(MAX_PASSES).unwrap();
    for (rank, (request, ex)) in requests.into_iter().zip(exchanges).enumerate() {
        ex.assert_delivered(rank as u32);
        assert_eq!(request.finalize().unwrap(), full(size));
    }
    recorders
}

#[test]
fn test_window_bounds_outstanding_operations() {
    let size = 6;
    for (num_posts, window) in [(1, 1), (2, 2), (4, 4), (0, size), (size + 3, size)] {
        let config = TlUcpConfig::default().alltoallv_pairwise_num_posts(num_posts);
        for recorder in recorded_run(size, config) {
            let max_sends = recorder.max_sends.load(Ordering::SeqCst);
            let max_recvs = recorder.max_recvs.load(Ordering::SeqCst);
            assert!(max_sends <= window, "sends {} > window {}", max_sends, window);
            assert_eq!(max_recvs, window, "num_posts {}", num_posts);
        }
    }
}

#[test]
fn test_linear_posts_everything_at_once() {
    let size = 5;
    let config = TlUcpConfig::default()
        .alltoallv_algorithm(AlltoallvAlgorithm::Linear)
        .alltoallv_pairwise_num_posts(1);
    for recorder in recorded_run(size, config) {
        assert_eq!(recorder.max_recvs.load(Ordering::SeqCst), size);
        assert_eq!(recorder.max_sends.load(Ordering::SeqCst), size);
    }
}
