use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::exam::AccessTier;

/// The teacher or admin a request is evaluated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub is_admin: bool,
    /// Class code to the tier this teacher holds on it.
    #[serde(default)]
    pub class_assignments: HashMap<String, AccessTier>,
}

impl Requester {
    pub fn teacher(id: Uuid) -> Self {
        Self {
            id,
            is_admin: false,
            class_assignments: HashMap::new(),
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            is_admin: true,
            class_assignments: HashMap::new(),
        }
    }

    pub fn with_class(mut self, class_code: impl Into<String>, tier: AccessTier) -> Self {
        self.class_assignments.insert(class_code.into(), tier);
        self
    }
}
