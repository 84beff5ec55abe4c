use thiserror::Error;

/// A snapshot whose rows break a relational invariant. Raised while the
/// snapshot is being built, never during scoring or aggregation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SnapshotIntegrityError {
    #[error("duplicate {entity} id `{id}`")]
    DuplicateId { entity: &'static str, id: u64 },
    #[error("{entity} `{id}` references missing {target} `{target_id}`")]
    DanglingReference { entity: &'static str, id: u64, target: &'static str, target_id: u64 },
    #[error("order `{order_id}` breaks timestamp rule {rule}")]
    OrderTimeline { order_id: u64, rule: &'static str },
    #[error("session `{session_id}` message sequence is not gapless from 1 (found {sequence_number})")]
    MessageSequence { session_id: u64, sequence_number: u32 },
    #[error("message `{message_id}` is stored in session `{session_id}` but points at session `{claimed}`")]
    MessageSessionMismatch { message_id: u64, session_id: u64, claimed: u64 },
    #[error(
        "order item `{order_item_id}` sells inventory item `{inventory_item_id}` of product \
         `{inventory_product_id}` as product `{product_id}`"
    )]
    InventoryProductMismatch {
        order_item_id: u64,
        inventory_item_id: u64,
        inventory_product_id: u64,
        product_id: u64,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{entity} `{id}` not found in snapshot")]
    NotFound { entity: &'static str, id: u64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    SnapshotIntegrity(#[from] SnapshotIntegrityError),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Error shape handed to the API layer that fronts the engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::NotFound { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl EngineError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<EngineError> for InterfaceError {
    fn from(value: EngineError) -> Self {
        let message = value.to_string();
        match value {
            EngineError::NotFound { .. } => {
                Self::NotFound { message, correlation_id: "unassigned".to_owned() }
            }
            EngineError::InvalidArgument(_) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            EngineError::SnapshotIntegrity(_) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
