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

//! Completion counters shared between a task and the transport

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::error::CollError;

/// Counts finished sends and receives of one collective
///
/// The transport bumps the counters from its progress call; a failed
/// operation still counts as finished and records the first error seen.
#[derive(Debug, Default)]
pub struct Completion {
    send_completed: AtomicU32,
    recv_completed: AtomicU32,
    error: Mutex<Option<CollError>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_completed(&self) -> u32 {
        self.send_completed.load(Ordering::Acquire)
    }

    pub fn recv_completed(&self) -> u32 {
        self.recv_completed.load(Ordering::Acquire)
    }

    pub fn complete_send(&self) {
        self.send_completed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn complete_recv(&self) {
        self.recv_completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Finish a send with an error
    pub fn fail_send(&self, error: CollError) {
        self.record(error);
        self.complete_send();
    }

    /// Finish a receive with an error
    pub fn fail_recv(&self, error: CollError) {
        self.record(error);
        self.complete_recv();
    }

    /// First error recorded by the transport, if any
    pub fn error(&self) -> Option<CollError> {
        match self.error.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, error: CollError) {
        let mut slot = match self.error.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}
