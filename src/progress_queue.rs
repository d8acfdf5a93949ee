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

//! Cooperative progress queue
//!
//! Holds tasks that are still in progress. Each call to
//! [`ProgressQueue::progress`] visits every queued task once; tasks that
//! reach a terminal status leave the queue and have their callback fired.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CollError, CollResult};
use crate::task::CollectiveTask;
use crate::tl_warn;

/// Shared handle to a task; the queue and the request both hold one
pub type TaskHandle = Arc<Mutex<CollectiveTask>>;

#[derive(Default)]
pub struct ProgressQueue {
    queue: Mutex<VecDeque<TaskHandle>>,
}

impl ProgressQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a started task over to the queue
    pub fn enqueue(&self, task: TaskHandle) {
        self.lock().push_back(task);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// One pass over the tasks queued when the pass begins
    ///
    /// Returns the number of tasks that terminated during the pass.
    pub fn progress(&self) -> usize {
        let pending = self.len();
        let mut finished = 0;
        for _ in 0..pending {
            // The queue lock is released while a task runs so callbacks may
            // enqueue new work.
            let Some(handle) = self.lock().pop_front() else {
                break;
            };
            let (terminal, callback) = {
                let mut task = lock_task(&handle);
                let status = task.progress();
                (status.is_terminal(), task.take_terminal_callback())
            };
            if terminal {
                finished += 1;
                if let Some((callback, status)) = callback {
                    callback(status);
                }
            } else {
                self.enqueue(handle);
            }
        }
        finished
    }

    /// Progress until the queue drains or `max_passes` passes have run
    pub fn run(&self, max_passes: usize) -> CollResult<()> {
        for _ in 0..max_passes {
            if self.is_empty() {
                return Ok(());
            }
            self.progress();
        }
        if self.is_empty() {
            return Ok(());
        }
        let remaining = self.len();
        tl_warn!(
            "progress queue still holds {} tasks after {} passes",
            remaining,
            max_passes
        );
        Err(CollError::TimedOut(format!(
            "{} tasks still in progress after {} passes",
            remaining, max_passes
        )))
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskHandle>> {
        match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub(crate) fn lock_task(handle: &TaskHandle) -> MutexGuard<'_, CollectiveTask> {
    match handle.lock() {
        Ok(task) => task,
        Err(poisoned) => poisoned.into_inner(),
    }
}
