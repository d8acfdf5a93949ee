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

//! Caller-facing collective requests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Code, CollError, CollResult, Status};
use crate::net::Request;
use crate::progress_queue::{lock_task, ProgressQueue, TaskHandle};
use crate::task::{CollectiveTask, CompletionCallback, TaskCounters, TaskState};

/// Handle to an initialized collective
///
/// `post` starts it; after that the progress queue drives it. The handle
/// can be polled with `status`/`test` or awaited with `wait`.
pub struct CollRequest {
    task: TaskHandle,
    pq: Arc<ProgressQueue>,
}

impl CollRequest {
    pub fn new(task: CollectiveTask, pq: Arc<ProgressQueue>) -> Self {
        Self {
            task: Arc::new(Mutex::new(task)),
            pq,
        }
    }

    /// Register a callback fired once with the terminal status
    ///
    /// Runs immediately when the collective has already terminated.
    pub fn on_complete(&self, callback: CompletionCallback) {
        let ready = {
            let mut task = lock_task(&self.task);
            task.set_callback(callback);
            task.take_terminal_callback()
        };
        if let Some((callback, status)) = ready {
            callback(status);
        }
    }

    /// Start the collective
    ///
    /// Makes one bounded attempt inline. A task that is still running is
    /// handed to the progress queue; an error is returned immediately.
    pub fn post(&self) -> CollResult<()> {
        let (status, callback, error) = {
            let mut task = lock_task(&self.task);
            let status = task.start()?;
            let error = match status {
                Status::Error(_) => Some(task_error(&task)),
                _ => None,
            };
            (status, task.take_terminal_callback(), error)
        };
        if let Some((callback, terminal)) = callback {
            callback(terminal);
        }
        if let Some(error) = error {
            return Err(error);
        }
        if status == Status::InProgress {
            self.pq.enqueue(Arc::clone(&self.task));
        }
        Ok(())
    }

    /// Current status without driving progress
    pub fn status(&self) -> Status {
        lock_task(&self.task).status()
    }

    pub fn state(&self) -> TaskState {
        lock_task(&self.task).state()
    }

    pub fn counters(&self) -> TaskCounters {
        lock_task(&self.task).counters()
    }

    /// Error that terminated the collective, if it failed
    pub fn error(&self) -> Option<CollError> {
        lock_task(&self.task).error().cloned()
    }

    /// Drive the task directly, bypassing the queue
    pub fn progress(&self) -> Status {
        lock_task(&self.task).progress()
    }

    /// Release a finished request and return its final counters
    ///
    /// Fails with `InProgress` while the collective is still running.
    pub fn finalize(self) -> CollResult<TaskCounters> {
        let task = lock_task(&self.task);
        match task.state() {
            TaskState::Completed | TaskState::Failed(_) => Ok(task.counters()),
            state => Err(CollError::InProgress(format!(
                "cannot finalize task {:#x} in state {:?}",
                task.tag(),
                state
            ))),
        }
    }
}

fn task_error(task: &CollectiveTask) -> CollError {
    task.error().cloned().unwrap_or_else(|| {
        let code = match task.status() {
            Status::Error(code) => code,
            _ => Code::Unknown,
        };
        CollError::new(code, "collective failed")
    })
}

#[async_trait]
impl Request for CollRequest {
    async fn wait(&mut self) -> CollResult<()> {
        loop {
            if self.test()? {
                return Ok(());
            }
            self.pq.progress();
            tokio::task::yield_now().await;
        }
    }

    fn test(&mut self) -> CollResult<bool> {
        let task = lock_task(&self.task);
        match task.status() {
            Status::Ok => Ok(true),
            Status::InProgress => Ok(false),
            Status::OperationInitialized => Err(CollError::InvalidParam(format!(
                "task {:#x} was never posted",
                task.tag()
            ))),
            Status::Error(_) => Err(task_error(&task)),
        }
    }
}
