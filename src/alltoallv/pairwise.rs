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

//! Pairwise alltoallv
//!
//! At step `s` a rank receives from `rank + s` and sends to `rank - s`, so
//! the two ends of every pair reach each other at the same step. Step 0 is
//! the exchange with itself.

use crate::net::Rank;
use crate::util::math::clamp_window;

use super::AlltoallvSchedule;

pub fn get_recv_peer(rank: Rank, size: u32, step: u32) -> Rank {
    (rank + step) % size
}

pub fn get_send_peer(rank: Rank, size: u32, step: u32) -> Rank {
    (rank + size - step) % size
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pairwise;

impl AlltoallvSchedule for Pairwise {
    fn recv_peer(&self, rank: Rank, size: u32, step: u32) -> Rank {
        get_recv_peer(rank, size, step)
    }

    fn send_peer(&self, rank: Rank, size: u32, step: u32) -> Rank {
        get_send_peer(rank, size, step)
    }

    fn max_outstanding(&self, num_posts: u32, size: u32) -> u32 {
        clamp_window(num_posts, size)
    }
}
