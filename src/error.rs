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

//! Error and status handling for collective operations
//!
//! Status values follow the UCC numbering: `0` is success, positive values
//! are non-terminal and negative values are errors.

use std::fmt;

/// Error codes, numerically identical to `ucc_status_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok = 0,
    InProgress = 1,
    OperationInitialized = 2,
    NotSupported = -1,
    NotImplemented = -2,
    InvalidParam = -3,
    NoMemory = -4,
    NoResource = -5,
    NoMessage = -6,
    NotFound = -7,
    TimedOut = -8,
    Unknown = -100,
}

impl Code {
    /// Raw integer value of the code
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Map a raw status integer back to a code; unrecognised negative values
    /// become `Unknown`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Code::Ok,
            1 => Code::InProgress,
            2 => Code::OperationInitialized,
            -1 => Code::NotSupported,
            -2 => Code::NotImplemented,
            -3 => Code::InvalidParam,
            -4 => Code::NoMemory,
            -5 => Code::NoResource,
            -6 => Code::NoMessage,
            -7 => Code::NotFound,
            -8 => Code::TimedOut,
            _ => Code::Unknown,
        }
    }

    pub fn is_error(self) -> bool {
        self.as_raw() < 0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Ok => write!(f, "Success"),
            Code::InProgress => write!(f, "Operation in progress"),
            Code::OperationInitialized => write!(f, "Operation initialized"),
            Code::NotSupported => write!(f, "Operation is not supported"),
            Code::NotImplemented => write!(f, "Not implemented"),
            Code::InvalidParam => write!(f, "Invalid parameter"),
            Code::NoMemory => write!(f, "Out of memory"),
            Code::NoResource => write!(f, "Resources are not available for the operation"),
            Code::NoMessage => write!(f, "No pending message"),
            Code::NotFound => write!(f, "No such element"),
            Code::TimedOut => write!(f, "Timeout expired"),
            Code::Unknown => write!(f, "Unknown error"),
        }
    }
}

/// Main error type for collective operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CollError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("No resource: {0}")]
    NoResource(String),

    #[error("Transport error ({code}): {message}")]
    Transport { code: Code, message: String },

    #[error("Timed out: {0}")]
    TimedOut(String),

    #[error("Operation still in progress: {0}")]
    InProgress(String),

    #[error("Error with code {code}: {message}")]
    Generic { code: Code, message: String },
}

impl CollError {
    /// Create a new error with a specific code and message
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        CollError::Generic {
            code,
            message: message.into(),
        }
    }

    /// Error reported by a transport for a failed post or completion
    pub fn transport(code: Code, message: impl Into<String>) -> Self {
        CollError::Transport {
            code,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> Code {
        match self {
            CollError::InvalidParam(_) => Code::InvalidParam,
            CollError::NotSupported(_) => Code::NotSupported,
            CollError::NoResource(_) => Code::NoResource,
            CollError::Transport { code, .. } => *code,
            CollError::TimedOut(_) => Code::TimedOut,
            CollError::InProgress(_) => Code::InProgress,
            CollError::Generic { code, .. } => *code,
        }
    }
}

/// Type alias for Results using CollError
pub type CollResult<T> = Result<T, CollError>;

/// Tri-state result of a collective: still running, done, or failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    InProgress,
    /// Task exists but has not been started
    OperationInitialized,
    Error(Code),
}

impl Status {
    /// Raw `ucc_status_t`-compatible value
    pub fn as_raw(&self) -> i32 {
        match self {
            Status::Ok => Code::Ok.as_raw(),
            Status::InProgress => Code::InProgress.as_raw(),
            Status::OperationInitialized => Code::OperationInitialized.as_raw(),
            Status::Error(code) => code.as_raw(),
        }
    }

    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Ok | Status::Error(_))
    }

    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "{}", Code::Ok),
            Status::InProgress => write!(f, "{}", Code::InProgress),
            Status::OperationInitialized => write!(f, "{}", Code::OperationInitialized),
            Status::Error(code) => write!(f, "{}", code),
        }
    }
}

impl From<&CollError> for Status {
    fn from(error: &CollError) -> Self {
        Status::Error(error.code())
    }
}
