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

//! Buffer implementations for collective communication

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CollError, CollResult};

/// Vector-backed buffer shared between a collective and the transport
///
/// Receives land in the buffer while the collective is still running, so
/// the caller and the worker both hold a handle to it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Zero-filled buffer of `len` bytes
    pub fn new(len: usize) -> Self {
        Self::with_data(vec![0u8; len])
    }

    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        Self::with_data(slice.to_vec())
    }

    /// Length in bytes; fails if the lock is poisoned
    pub fn len(&self) -> CollResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> CollResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Lock the underlying bytes
    pub fn lock(&self) -> CollResult<MutexGuard<'_, Vec<u8>>> {
        self.data
            .lock()
            .map_err(|_| CollError::NoResource("buffer lock poisoned".to_string()))
    }

    /// Copy of the current contents
    pub fn to_vec(&self) -> CollResult<Vec<u8>> {
        Ok(self.lock()?.clone())
    }

    /// Copy `len` bytes starting at `offset`
    pub fn read(&self, offset: usize, len: usize) -> CollResult<Vec<u8>> {
        let data = self.lock()?;
        let end = checked_end(offset, len, data.len())?;
        Ok(data[offset..end].to_vec())
    }

    /// Overwrite bytes starting at `offset`
    pub fn write(&self, offset: usize, bytes: &[u8]) -> CollResult<()> {
        let mut data = self.lock()?;
        let end = checked_end(offset, bytes.len(), data.len())?;
        data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Both handles refer to the same storage
    pub fn ptr_eq(&self, other: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

fn checked_end(offset: usize, len: usize, capacity: usize) -> CollResult<usize> {
    offset
        .checked_add(len)
        .filter(|end| *end <= capacity)
        .ok_or_else(|| {
            CollError::InvalidParam(format!(
                "range {}+{} exceeds buffer of {} bytes",
                offset, len, capacity
            ))
        })
}

/// A byte range of a shared buffer that a receive writes into
#[derive(Debug, Clone)]
pub struct RecvRegion {
    pub buffer: SharedBuffer,
    pub offset: usize,
    pub len: usize,
}

impl RecvRegion {
    pub fn new(buffer: SharedBuffer, offset: usize, len: usize) -> Self {
        Self {
            buffer,
            offset,
            len,
        }
    }
}
