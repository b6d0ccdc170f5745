use ulid::Ulid;

/// Which resource a conflict or lookup failure is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Court,
    Equipment,
    Coach,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Court => "court",
            ResourceKind::Equipment => "equipment",
            ResourceKind::Coach => "coach",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Rejected before any resource check; never partially applied.
    Validation(String),
    /// A referenced catalog id does not resolve — distinct from a conflict.
    ResourceNotFound { kind: ResourceKind, id: Ulid },
    /// The expected, recoverable case: resource occupied, insufficient, or
    /// outside operating hours. Callers offer waitlisting on this error.
    Conflict { resource: ResourceKind, reason: String },
    /// Unknown booking or waitlist entry id.
    NotFound(Ulid),
    /// Durability failure; nothing was committed.
    Wal(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn conflict(resource: ResourceKind, reason: impl Into<String>) -> Self {
        EngineError::Conflict {
            resource,
            reason: reason.into(),
        }
    }

    pub fn court_not_found(id: Ulid) -> Self {
        EngineError::ResourceNotFound {
            kind: ResourceKind::Court,
            id,
        }
    }

    /// True for the retriable conflict case.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation: {msg}"),
            EngineError::ResourceNotFound { kind, id } => {
                write!(f, "{} not found: {id}", kind.as_str())
            }
            EngineError::Conflict { resource, reason } => {
                write!(f, "{} conflict: {reason}", resource.as_str())
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Wal(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<crate::model::MalformedTimeError> for EngineError {
    fn from(e: crate::model::MalformedTimeError) -> Self {
        EngineError::Validation(e.to_string())
    }
}
