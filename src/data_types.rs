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

//! Collective datatypes and memory types
//!
//! The engine only needs the byte size of an element; the variants mirror
//! the predefined `ucc_datatype_t` set.

use serde::{Deserialize, Serialize};

/// Element datatype of a collective buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Signed 128-bit integer
    Int128,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Unsigned 128-bit integer
    UInt128,
    /// IEEE half precision
    Float16,
    /// IEEE single precision
    Float32,
    /// IEEE double precision
    Float64,
    /// IEEE quad precision
    Float128,
    /// Brain floating point
    BFloat16,
    /// Pair of single precision values
    Float32Complex,
    /// Pair of double precision values
    Float64Complex,
    /// Pair of quad precision values
    Float128Complex,
    /// Contiguous user type of the given byte size
    Generic(usize),
}

impl DataType {
    /// Size of one element in bytes
    pub fn size(&self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 | DataType::Float16 | DataType::BFloat16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 | DataType::Float32Complex => 8,
            DataType::Int128 | DataType::UInt128 | DataType::Float128 | DataType::Float64Complex => 16,
            DataType::Float128Complex => 32,
            DataType::Generic(size) => *size,
        }
    }
}

/// Where a buffer lives; forwarded untouched to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    #[default]
    Host,
    Cuda,
    CudaManaged,
    Rocm,
    RocmManaged,
    Unknown,
}
