use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by the graph contract and by backends implementing it
#[derive(Error, Debug)]
pub enum GraphError {
    /// Malformed or incomplete transfer payload
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid plugin configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Plugin method called before a successful `initialize`
    #[error("Plugin '{plugin}' is not initialized")]
    NotInitialized { plugin: String },

    /// Id collision on insert
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: RecordKind, id: String },

    /// Bad rendering or query option
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// A DTO was constructed with values that break its invariants
    #[error("Invalid {kind}: {reason}")]
    InvalidRecord { kind: RecordKind, reason: String },

    /// Edge endpoint refers to a node the backend does not hold
    #[error("Edge {edge_id} references unknown node {node_id}")]
    UnknownNode { edge_id: String, node_id: String },

    /// IO error while reading or writing a transfer file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend specific failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Record type named in id and invariant errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Node,
    Edge,
    Source,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Source => "source",
        })
    }
}

/// Stable error classification.
///
/// Callers branch on the kind; messages are for humans only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Deserialization,
    Configuration,
    NotInitialized,
    DuplicateId,
    InvalidOption,
    InvalidRecord,
    UnknownNode,
    Io,
    Backend,
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Deserialization(_) => ErrorKind::Deserialization,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NotInitialized { .. } => ErrorKind::NotInitialized,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::InvalidOption(_) => ErrorKind::InvalidOption,
            Self::InvalidRecord { .. } => ErrorKind::InvalidRecord,
            Self::UnknownNode { .. } => ErrorKind::UnknownNode,
            Self::Io(_) => ErrorKind::Io,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Create a deserialization error
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a not-initialized error for the named plugin
    pub fn not_initialized(plugin: impl Into<String>) -> Self {
        Self::NotInitialized {
            plugin: plugin.into(),
        }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            kind,
            id: id.into(),
        }
    }

    /// Create an invalid option error
    pub fn invalid_option(msg: impl Into<String>) -> Self {
        Self::InvalidOption(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(kind: RecordKind, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return Self::Io(std::io::Error::other(err));
        }
        Self::Deserialization(err.to_string())
    }
}
