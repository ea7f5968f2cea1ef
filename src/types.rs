//! Convenience types shared by the provider and its resources.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The identifier and state tree of one resource instance.
///
/// Lifecycle operations receive the caller's `ResourceData` and mutate it in
/// place: create sets the identifier, read replaces the state, and both read
/// and delete may clear the identifier. A cleared identifier tells the host
/// the instance is gone from local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    id: Option<String>,
    state: Value,
}

impl ResourceData {
    /// A new instance built from user configuration, not yet created.
    pub fn new(state: Value) -> Self {
        Self { id: None, state }
    }

    /// An existing instance with a known identifier.
    pub fn with_id(id: impl Into<String>, state: Value) -> Self {
        Self {
            id: Some(id.into()),
            state,
        }
    }

    /// The identifier, if the instance exists.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Record the identifier after a successful create.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Forget the identifier so the host drops (or recreates) the instance.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// The current state tree.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Replace the state tree.
    pub fn set_state(&mut self, state: Value) {
        self.state = state;
    }

    /// Consume into the state tree.
    pub fn into_state(self) -> Value {
        self.state
    }
}

/// Provider metadata: the resource types it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
}
