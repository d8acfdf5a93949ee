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

//! Collective arguments
//!
//! Vector collectives describe each side with a buffer plus per-peer counts
//! and displacements in elements of that side's datatype. The arrays come in
//! two element widths; [`CountArray`] carries the width with the data.

use std::ops::BitOr;

use crate::data_types::{DataType, MemoryType};
use crate::error::{CollError, CollResult};
use crate::net::SharedBuffer;

/// Collective kinds understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollType {
    Alltoallv,
}

/// Per-peer counts or displacements with their element width
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountArray {
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl CountArray {
    /// Value at `idx` widened to `u64`
    pub fn get(&self, idx: usize) -> Option<u64> {
        match self {
            CountArray::U32(values) => values.get(idx).map(|v| *v as u64),
            CountArray::U64(values) => values.get(idx).copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CountArray::U32(values) => values.len(),
            CountArray::U64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_64bit(&self) -> bool {
        matches!(self, CountArray::U64(_))
    }
}

impl From<Vec<u32>> for CountArray {
    fn from(values: Vec<u32>) -> Self {
        CountArray::U32(values)
    }
}

impl From<Vec<u64>> for CountArray {
    fn from(values: Vec<u64>) -> Self {
        CountArray::U64(values)
    }
}

/// Which optional fields of [`CollArgs`] are valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollArgsMask(u64);

impl CollArgsMask {
    pub const NONE: CollArgsMask = CollArgsMask(0);
    /// `flags` carries meaning
    pub const FLAGS: CollArgsMask = CollArgsMask(1 << 0);

    pub fn contains(&self, other: CollArgsMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CollArgsMask {
    type Output = CollArgsMask;

    fn bitor(self, rhs: CollArgsMask) -> CollArgsMask {
        CollArgsMask(self.0 | rhs.0)
    }
}

/// Collective argument flags, bit-compatible with `UCC_COLL_ARGS_FLAG_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollArgsFlags(u64);

impl CollArgsFlags {
    pub const NONE: CollArgsFlags = CollArgsFlags(0);
    /// Count arrays hold 64-bit elements
    pub const COUNT_64BIT: CollArgsFlags = CollArgsFlags(1 << 2);
    /// Displacement arrays hold 64-bit elements
    pub const DISPLACEMENTS_64BIT: CollArgsFlags = CollArgsFlags(1 << 3);

    pub fn contains(&self, other: CollArgsFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(&self) -> u64 {
        self.0
    }
}

impl BitOr for CollArgsFlags {
    type Output = CollArgsFlags;

    fn bitor(self, rhs: CollArgsFlags) -> CollArgsFlags {
        CollArgsFlags(self.0 | rhs.0)
    }
}

/// One side of a vector collective
#[derive(Debug, Clone)]
pub struct BufferInfoV {
    pub buffer: SharedBuffer,
    pub counts: CountArray,
    pub displacements: CountArray,
    pub datatype: DataType,
    pub mem_type: MemoryType,
}

impl BufferInfoV {
    pub fn new(
        buffer: SharedBuffer,
        counts: impl Into<CountArray>,
        displacements: impl Into<CountArray>,
        datatype: DataType,
    ) -> Self {
        Self {
            buffer,
            counts: counts.into(),
            displacements: displacements.into(),
            datatype,
            mem_type: MemoryType::Host,
        }
    }

    pub fn with_mem_type(mut self, mem_type: MemoryType) -> Self {
        self.mem_type = mem_type;
        self
    }

    /// Byte offset and byte length of the segment exchanged with `peer`
    pub fn segment(&self, peer: usize) -> CollResult<(usize, usize)> {
        let dt_size = self.datatype.size();
        let count = element_count(&self.counts, "count", peer)?;
        let displ = element_count(&self.displacements, "displacement", peer)?;
        let len = count.checked_mul(dt_size).ok_or_else(|| overflow(peer))?;
        let offset = displ.checked_mul(dt_size).ok_or_else(|| overflow(peer))?;
        Ok((offset, len))
    }

    fn validate(&self, side: &str, size: usize, count_64: bool, displ_64: bool) -> CollResult<()> {
        if self.counts.is_64bit() != count_64 {
            return Err(CollError::InvalidParam(format!(
                "{} counts are {}-bit but flags select {}-bit",
                side,
                width(self.counts.is_64bit()),
                width(count_64)
            )));
        }
        if self.displacements.is_64bit() != displ_64 {
            return Err(CollError::InvalidParam(format!(
                "{} displacements are {}-bit but flags select {}-bit",
                side,
                width(self.displacements.is_64bit()),
                width(displ_64)
            )));
        }
        if self.counts.len() < size || self.displacements.len() < size {
            return Err(CollError::InvalidParam(format!(
                "{} counts/displacements cover {}/{} peers, team has {}",
                side,
                self.counts.len(),
                self.displacements.len(),
                size
            )));
        }
        let capacity = self.buffer.len()?;
        for peer in 0..size {
            let (offset, len) = self.segment(peer)?;
            let end = offset.checked_add(len).ok_or_else(|| overflow(peer))?;
            if end > capacity {
                return Err(CollError::InvalidParam(format!(
                    "{} segment for peer {} ends at byte {}, buffer holds {}",
                    side, peer, end, capacity
                )));
            }
        }
        Ok(())
    }
}

fn width(is_64: bool) -> u32 {
    if is_64 {
        64
    } else {
        32
    }
}

fn element_count(values: &CountArray, what: &str, peer: usize) -> CollResult<usize> {
    let value = values
        .get(peer)
        .ok_or_else(|| CollError::InvalidParam(format!("no {} for peer {}", what, peer)))?;
    usize::try_from(value).map_err(|_| {
        CollError::InvalidParam(format!(
            "{} {} for peer {} exceeds the address space",
            what, value, peer
        ))
    })
}

fn overflow(peer: usize) -> CollError {
    CollError::InvalidParam(format!("segment size overflow for peer {}", peer))
}

/// Arguments of one collective call
#[derive(Debug, Clone)]
pub struct CollArgs {
    pub coll_type: CollType,
    pub mask: CollArgsMask,
    pub flags: CollArgsFlags,
    pub src: BufferInfoV,
    pub dst: BufferInfoV,
}

impl CollArgs {
    /// Alltoallv arguments with width flags derived from the arrays given
    pub fn alltoallv(src: BufferInfoV, dst: BufferInfoV) -> Self {
        let mut flags = CollArgsFlags::NONE;
        if src.counts.is_64bit() || dst.counts.is_64bit() {
            flags = flags | CollArgsFlags::COUNT_64BIT;
        }
        if src.displacements.is_64bit() || dst.displacements.is_64bit() {
            flags = flags | CollArgsFlags::DISPLACEMENTS_64BIT;
        }
        Self {
            coll_type: CollType::Alltoallv,
            mask: CollArgsMask::FLAGS,
            flags,
            src,
            dst,
        }
    }

    /// Replace the flags; marks them valid in the mask
    pub fn with_flags(mut self, flags: CollArgsFlags) -> Self {
        self.mask = self.mask | CollArgsMask::FLAGS;
        self.flags = flags;
        self
    }

    /// Drop the flags field; both widths fall back to 32-bit
    pub fn without_flags(mut self) -> Self {
        self.mask = CollArgsMask::NONE;
        self.flags = CollArgsFlags::NONE;
        self
    }

    /// Counts are 64-bit only when flags are valid and say so
    pub fn is_count_64bit(&self) -> bool {
        self.mask.contains(CollArgsMask::FLAGS) && self.flags.contains(CollArgsFlags::COUNT_64BIT)
    }

    pub fn is_displacements_64bit(&self) -> bool {
        self.mask.contains(CollArgsMask::FLAGS)
            && self.flags.contains(CollArgsFlags::DISPLACEMENTS_64BIT)
    }

    /// Check the arguments against a team of `size` ranks
    pub fn validate(&self, size: u32) -> CollResult<()> {
        let size = size as usize;
        let count_64 = self.is_count_64bit();
        let displ_64 = self.is_displacements_64bit();
        self.src.validate("source", size, count_64, displ_64)?;
        self.dst.validate("destination", size, count_64, displ_64)?;
        Ok(())
    }
}
