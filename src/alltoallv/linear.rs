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

//! Linear alltoallv: peers in rank order, no window

use crate::net::Rank;

use super::AlltoallvSchedule;

#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl AlltoallvSchedule for Linear {
    fn recv_peer(&self, _rank: Rank, _size: u32, step: u32) -> Rank {
        step
    }

    fn send_peer(&self, _rank: Rank, _size: u32, step: u32) -> Rank {
        step
    }

    fn max_outstanding(&self, _num_posts: u32, size: u32) -> u32 {
        size
    }
}
