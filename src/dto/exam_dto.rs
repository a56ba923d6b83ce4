use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

use crate::models::exam::AccessTier;
use crate::services::visibility_service::{VisibilityScope, VisibleExam};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub class_codes: BTreeSet<String>,
    #[serde(default = "default_admin_visible")]
    pub is_admin_visible: bool,
}

fn default_admin_visible() -> bool {
    true
}

impl CreateExamPayload {
    pub fn invalid_class_code(&self) -> Option<&str> {
        self.class_codes
            .iter()
            .find(|code| code.trim().is_empty() || code.len() > 50)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignAccessPayload {
    pub teacher_id: Uuid,
    pub tier: AccessTier,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListExamsQuery {
    pub assigned_only: Option<bool>,
}

impl ListExamsQuery {
    pub fn scope(&self) -> VisibilityScope {
        if self.assigned_only.unwrap_or(false) {
            VisibilityScope::AssignedOnly
        } else {
            VisibilityScope::All
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamListResponse {
    pub items: Vec<VisibleExam>,
    pub total: usize,
    pub scope: VisibilityScope,
}
