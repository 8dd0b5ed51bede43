//! Client and engine options
//!
//! `ClientOption` is what callers pass to `get_option`/`set_option`. Two
//! options belong to the client itself (compression, prefix key); the rest
//! are forwarded to the engine as behaviors.

/// Engine behavior ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Behavior {
    NoBlock = 0,
    TcpNoDelay = 1,
    Hash = 2,
    SocketSendSize = 4,
    SocketRecvSize = 5,
    CacheLookups = 6,
    SupportCas = 7,
    PollTimeout = 8,
    Distribution = 9,
    BufferRequests = 10,
    ConnectTimeout = 14,
    RetryTimeout = 15,
    BinaryProtocol = 18,
    SendTimeout = 19,
    RecvTimeout = 20,
    ServerFailureLimit = 21,
}

impl Behavior {
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Socket buffer sizes are per server and need at least one
    pub fn needs_servers(self) -> bool {
        matches!(self, Behavior::SocketSendSize | Behavior::SocketRecvSize)
    }
}

/// Option addressed by `get_option`/`set_option`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOption {
    /// Compress string payloads on store (client-side)
    Compression,

    /// Prefix prepended by the engine to every key
    PrefixKey,

    /// Forwarded to the engine
    Behavior(Behavior),
}

impl ClientOption {
    pub const COMPRESSION_ID: i32 = -1001;
    pub const PREFIX_KEY_ID: i32 = -1002;

    /// Numeric option id
    pub fn id(self) -> i32 {
        match self {
            ClientOption::Compression => Self::COMPRESSION_ID,
            ClientOption::PrefixKey => Self::PREFIX_KEY_ID,
            ClientOption::Behavior(b) => b.id(),
        }
    }
}

/// Value of an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
    Int(u64),
}

impl OptionValue {
    /// Loose boolean view: non-zero ints and non-empty strings other than "0" are true
    pub fn as_bool(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Int(n) => *n != 0,
            OptionValue::Str(s) => !s.is_empty() && s != "0",
        }
    }

    /// Integer view, if the value has one
    pub fn as_int(&self) -> Option<u64> {
        match self {
            OptionValue::Bool(b) => Some(u64::from(*b)),
            OptionValue::Int(n) => Some(*n),
            OptionValue::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<u64> for OptionValue {
    fn from(n: u64) -> Self {
        OptionValue::Int(n)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}
