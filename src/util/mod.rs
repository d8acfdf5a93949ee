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

//! Utility functions and helpers

pub mod logging;

/// Small integer helpers used by the collective algorithms
pub mod math {
    /// Clamp a configured window to `[1, size]`; `0` selects `size`
    pub fn clamp_window(window: u32, size: u32) -> u32 {
        if window == 0 || window > size {
            size
        } else {
            window
        }
    }
}
