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

//! Logging utilities
//!
//! Thin wrappers over the `log` facade with an `env_logger` backend.
//! Set `RUST_LOG=cylon_coll=trace` to see every post.

/// Initialize logging with default configuration
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Initialize logging with specific level
pub fn init_logging_with_level(level: log::LevelFilter) {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

#[macro_export]
macro_rules! tl_info {
    ($($arg:tt)*) => {
        log::info!(target: "cylon_coll::tl", $($arg)*)
    };
}

#[macro_export]
macro_rules! tl_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "cylon_coll::tl", $($arg)*)
    };
}

#[macro_export]
macro_rules! tl_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "cylon_coll::tl", $($arg)*)
    };
}

#[macro_export]
macro_rules! tl_error {
    ($($arg:tt)*) => {
        log::error!(target: "cylon_coll::tl", $($arg)*)
    };
}

#[macro_export]
macro_rules! tl_trace {
    ($($arg:tt)*) => {
        log::trace!(target: "cylon_coll::tl", $($arg)*)
    };
}
