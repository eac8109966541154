use snitchdiff_core_types::RequestId;
use thiserror::Error;

/// Result type alias using DiffError
pub type Result<T> = std::result::Result<T, DiffError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// status display and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Loading
    StructureFetchFailed,
    NodeFetchFailed,
    /// A response that no longer matches the loader cursor; never user visible
    StaleResponseDiscarded,

    // Structure integrity
    InvalidStructure,
    MissingMapping,
    IndexOutOfRange,
    DuplicateNode,

    // Node store
    PageOverflow,
    SlotAlreadyFilled,

    // Lookup
    NotFound,

    // Configuration
    InvalidConfig,

    // Integration/IO
    Transport,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::StructureFetchFailed => "ERR_STRUCTURE_FETCH_FAILED",
            ExErrorKind::NodeFetchFailed => "ERR_NODE_FETCH_FAILED",
            ExErrorKind::StaleResponseDiscarded => "ERR_STALE_RESPONSE_DISCARDED",
            ExErrorKind::InvalidStructure => "ERR_INVALID_STRUCTURE",
            ExErrorKind::MissingMapping => "ERR_MISSING_MAPPING",
            ExErrorKind::IndexOutOfRange => "ERR_INDEX_OUT_OF_RANGE",
            ExErrorKind::DuplicateNode => "ERR_DUPLICATE_NODE",
            ExErrorKind::PageOverflow => "ERR_PAGE_OVERFLOW",
            ExErrorKind::SlotAlreadyFilled => "ERR_SLOT_ALREADY_FILLED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Transport => "ERR_TRANSPORT",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification kind plus whatever context was known where the
/// error was raised. Built with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    offset: Option<usize>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            offset: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context, rendered as `type:id`
    pub fn with_entity(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity = Some(format!("{}:{}", entity_type, entity_id));
        self
    }

    /// Add node-page offset context
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (offset: {})", offset)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for diff loading, tree building and rendering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffError {
    // ===== Loading =====
    /// The structure request failed at the transport level
    #[error("Structure fetch failed: {message}")]
    StructureFetchFailed { message: String },

    /// A node-page request failed at the transport level
    #[error("Node fetch failed at offset {offset}: {message}")]
    NodeFetchFailed { offset: usize, message: String },

    /// A node page arrived for an offset the cursor already moved past,
    /// or for a superseded request
    #[error("Stale node page discarded: offset {offset}, cursor {cursor}")]
    StaleResponseDiscarded { offset: usize, cursor: usize },

    // ===== Structure integrity =====
    /// The structure response is internally inconsistent
    #[error("Invalid structure: {reason}")]
    InvalidStructure { reason: String },

    /// A frame node has no node-map entry
    #[error("No node-map entry for {entity_type}:{entity_id}")]
    MissingNodeMapping {
        entity_type: String,
        entity_id: String,
    },

    /// A node-map entry points past the declared node count
    #[error("Node index {index} for {entity_type}:{entity_id} exceeds node count {node_count}")]
    NodeIndexOutOfRange {
        entity_type: String,
        entity_id: String,
        index: usize,
        node_count: usize,
    },

    /// The same entity appears twice in one structure frame
    #[error("Duplicate node in structure: {entity_type}:{entity_id}")]
    DuplicateNode {
        entity_type: String,
        entity_id: String,
    },

    // ===== Node store =====
    /// A page would write past the pre-sized store
    #[error("Page at offset {offset} with {len} records overflows store capacity {capacity}")]
    PageOverflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// A store slot was written twice
    #[error("Node store slot {index} already filled")]
    SlotAlreadyFilled { index: usize },

    // ===== Lookup =====
    /// A node key does not exist in the current tree
    #[error("Unknown node: {entity_type}:{entity_id}")]
    UnknownNode {
        entity_type: String,
        entity_id: String,
    },

    /// A view operation arrived before the structure loaded
    #[error("Diff tree not loaded")]
    TreeNotLoaded,

    // ===== Configuration =====
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    // ===== Integration =====
    /// Raised by a data source for a failed request
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<DiffError> for ExError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::StructureFetchFailed { message } => {
                ExError::new(ExErrorKind::StructureFetchFailed)
                    .with_op("load_structure")
                    .with_message(message)
            }

            DiffError::NodeFetchFailed { offset, message } => {
                ExError::new(ExErrorKind::NodeFetchFailed)
                    .with_op("load_nodes_page")
                    .with_offset(offset)
                    .with_message(message)
            }

            DiffError::StaleResponseDiscarded { offset, cursor } => {
                ExError::new(ExErrorKind::StaleResponseDiscarded)
                    .with_op("load_nodes_page")
                    .with_offset(offset)
                    .with_message(format!("cursor already at {}", cursor))
            }

            DiffError::InvalidStructure { reason } => {
                ExError::new(ExErrorKind::InvalidStructure).with_message(reason)
            }

            DiffError::MissingNodeMapping {
                entity_type,
                entity_id,
            } => ExError::new(ExErrorKind::MissingMapping)
                .with_op("build_tree")
                .with_entity(&entity_type, &entity_id)
                .with_message("No node-map entry"),

            DiffError::NodeIndexOutOfRange {
                entity_type,
                entity_id,
                index,
                node_count,
            } => ExError::new(ExErrorKind::IndexOutOfRange)
                .with_op("build_tree")
                .with_entity(&entity_type, &entity_id)
                .with_message(format!("index {} >= node count {}", index, node_count)),

            DiffError::DuplicateNode {
                entity_type,
                entity_id,
            } => ExError::new(ExErrorKind::DuplicateNode)
                .with_op("build_tree")
                .with_entity(&entity_type, &entity_id)
                .with_message("Entity appears more than once"),

            DiffError::PageOverflow {
                offset,
                len,
                capacity,
            } => ExError::new(ExErrorKind::PageOverflow)
                .with_offset(offset)
                .with_message(format!("{} records, capacity {}", len, capacity)),

            DiffError::SlotAlreadyFilled { index } => {
                ExError::new(ExErrorKind::SlotAlreadyFilled).with_offset(index)
            }

            DiffError::UnknownNode {
                entity_type,
                entity_id,
            } => ExError::new(ExErrorKind::NotFound)
                .with_entity(&entity_type, &entity_id)
                .with_message("Node not in tree"),

            DiffError::TreeNotLoaded => {
                ExError::new(ExErrorKind::NotFound).with_message("Diff tree not loaded")
            }

            DiffError::InvalidConfig { reason } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(reason)
            }

            DiffError::Transport { message } => {
                ExError::new(ExErrorKind::Transport).with_message(message)
            }

            DiffError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            DiffError::Io { message } => ExError::new(ExErrorKind::Io).with_message(message),

            DiffError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for DiffError {
    fn from(err: serde_json::Error) -> Self {
        DiffError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DiffError {
    fn from(err: toml::de::Error) -> Self {
        DiffError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for DiffError {
    fn from(err: std::io::Error) -> Self {
        DiffError::Io {
            message: err.to_string(),
        }
    }
}
