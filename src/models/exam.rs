use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessTier {
    Full,
    CoTeacher,
    View,
}

impl AccessTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Full => "FULL",
            AccessTier::CoTeacher => "CO_TEACHER",
            AccessTier::View => "VIEW",
        }
    }

    /// FULL and CO_TEACHER carry the same rights; both outrank VIEW.
    pub fn rank(&self) -> u8 {
        match self {
            AccessTier::Full | AccessTier::CoTeacher => 2,
            AccessTier::View => 1,
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Ok(AccessTier::Full),
            "CO_TEACHER" => Ok(AccessTier::CoTeacher),
            "VIEW" => Ok(AccessTier::View),
            other => Err(format!("unknown access tier: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessBadge {
    #[serde(rename = "OWNER")]
    Owner,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "FULL ACCESS")]
    FullAccess,
    #[serde(rename = "VIEW ONLY")]
    ViewOnly,
}

impl AccessBadge {
    pub fn label(&self) -> &'static str {
        match self {
            AccessBadge::Owner => "OWNER",
            AccessBadge::Admin => "ADMIN",
            AccessBadge::FullAccess => "FULL ACCESS",
            AccessBadge::ViewOnly => "VIEW ONLY",
        }
    }

    pub fn can_edit(&self) -> bool {
        !matches!(self, AccessBadge::ViewOnly)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, AccessBadge::Owner | AccessBadge::Admin)
    }
}

impl fmt::Display for AccessBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub class_codes: BTreeSet<String>,
    /// Direct per-teacher grants on this exam.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub access_assignments: HashMap<Uuid, AccessTier>,
    pub is_admin_visible: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub is_admin_visible: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExamClassCodeRow {
    pub exam_id: Uuid,
    pub class_code: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExamAccessRow {
    pub exam_id: Uuid,
    pub teacher_id: Uuid,
    pub tier: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClassAccessRow {
    pub class_code: String,
    pub tier: String,
}
