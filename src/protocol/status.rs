//! Engine result codes
//!
//! Every call into the engine reports one of these statuses. The numeric
//! values match the ones memcached client libraries expose, so a code read
//! back through `Client::result_code()` can be compared against them.

use std::fmt;

/// Status reported by an engine call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    Failure = 1,
    HostLookupFailure = 2,
    WriteFailure = 5,
    UnknownReadFailure = 7,
    ProtocolError = 8,
    ClientError = 9,
    ServerError = 10,
    ConnectionSocketCreateFailure = 11,
    DataExists = 12,
    NotStored = 14,
    Stored = 15,
    NotFound = 16,
    PartialRead = 18,
    SomeErrors = 19,
    NoServers = 20,
    End = 21,
    Deleted = 22,
    Stat = 24,
    Errno = 26,
    Timeout = 31,
    Buffered = 32,
    BadKeyProvided = 33,

    /// Client-side code: a value could not be encoded or decoded
    PayloadFailure = -1001,
}

impl ResultCode {
    /// All known codes, in numeric order of the engine codes
    pub const ALL: [ResultCode; 24] = [
        ResultCode::Success,
        ResultCode::Failure,
        ResultCode::HostLookupFailure,
        ResultCode::WriteFailure,
        ResultCode::UnknownReadFailure,
        ResultCode::ProtocolError,
        ResultCode::ClientError,
        ResultCode::ServerError,
        ResultCode::ConnectionSocketCreateFailure,
        ResultCode::DataExists,
        ResultCode::NotStored,
        ResultCode::Stored,
        ResultCode::NotFound,
        ResultCode::PartialRead,
        ResultCode::SomeErrors,
        ResultCode::NoServers,
        ResultCode::End,
        ResultCode::Deleted,
        ResultCode::Stat,
        ResultCode::Errno,
        ResultCode::Timeout,
        ResultCode::Buffered,
        ResultCode::BadKeyProvided,
        ResultCode::PayloadFailure,
    ];

    /// Numeric value of the code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Upper-case name, as printed in logs
    pub fn name(self) -> &'static str {
        match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::Failure => "FAILURE",
            ResultCode::HostLookupFailure => "HOST_LOOKUP_FAILURE",
            ResultCode::WriteFailure => "WRITE_FAILURE",
            ResultCode::UnknownReadFailure => "UNKNOWN_READ_FAILURE",
            ResultCode::ProtocolError => "PROTOCOL_ERROR",
            ResultCode::ClientError => "CLIENT_ERROR",
            ResultCode::ServerError => "SERVER_ERROR",
            ResultCode::ConnectionSocketCreateFailure => "CONNECTION_SOCKET_CREATE_FAILURE",
            ResultCode::DataExists => "DATA_EXISTS",
            ResultCode::NotStored => "NOTSTORED",
            ResultCode::Stored => "STORED",
            ResultCode::NotFound => "NOTFOUND",
            ResultCode::PartialRead => "PARTIAL_READ",
            ResultCode::SomeErrors => "SOME_ERRORS",
            ResultCode::NoServers => "NO_SERVERS",
            ResultCode::End => "END",
            ResultCode::Deleted => "DELETED",
            ResultCode::Stat => "STAT",
            ResultCode::Errno => "ERRNO",
            ResultCode::Timeout => "TIMEOUT",
            ResultCode::Buffered => "BUFFERED",
            ResultCode::BadKeyProvided => "BAD_KEY_PROVIDED",
            ResultCode::PayloadFailure => "PAYLOAD_FAILURE",
        }
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
