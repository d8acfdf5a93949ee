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

//! cylon-coll: cooperative collective task engine
//!
//! Collectives are non-blocking tasks. Posting a task makes one bounded
//! attempt inline; a task that is still running moves to the context's
//! progress queue, which is driven by repeated `progress` calls until every
//! queued task completes or fails. The transport below is reached only
//! through the [`net::Worker`] trait.
//!
//! The alltoallv implementation uses a pairwise peer schedule with a
//! configurable window of outstanding sends and receives.

pub mod util;

pub mod alltoallv;
pub mod args;
pub mod config;
pub mod ctx;
pub mod data_types;
pub mod error;
pub mod net;
pub mod progress_queue;
pub mod request;
pub mod task;
pub mod team;

// Re-export commonly used types
pub use crate::args::{BufferInfoV, CollArgs, CollArgsFlags, CollArgsMask, CountArray};
pub use crate::config::{AlltoallvAlgorithm, TlUcpConfig};
pub use crate::ctx::CollContext;
pub use crate::data_types::{DataType, MemoryType};
pub use crate::error::{Code, CollError, CollResult, Status};
pub use crate::net::{Request, SharedBuffer, Worker};
pub use crate::progress_queue::ProgressQueue;
pub use crate::request::CollRequest;
pub use crate::task::{CollectiveTask, TaskCounters, TaskState};
pub use crate::team::{Team, TeamParams};

/// The main entry point and version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
