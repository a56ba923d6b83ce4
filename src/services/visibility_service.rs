use serde::{Deserialize, Serialize};

use crate::models::exam::{AccessBadge, AccessTier, Exam};
use crate::models::user::Requester;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityScope {
    #[default]
    All,
    /// Only exams the requester owns or reaches through a class assignment.
    AssignedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExamAccess {
    pub badge: AccessBadge,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl ExamAccess {
    fn from_badge(badge: AccessBadge) -> Self {
        Self {
            badge,
            can_edit: badge.can_edit(),
            can_delete: badge.can_delete(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VisibleExam {
    #[serde(flatten)]
    pub exam: Exam,
    #[serde(flatten)]
    pub access: ExamAccess,
}

pub struct VisibilityService;

impl VisibilityService {
    pub fn filter(exams: Vec<Exam>, requester: &Requester, scope: VisibilityScope) -> Vec<VisibleExam> {
        exams
            .into_iter()
            .filter_map(|mut exam| {
                let access = Self::evaluate(&exam, requester, scope)?;
                // other teachers' grants are only shown to those who may change them
                if !access.can_delete {
                    exam.access_assignments.clear();
                }
                Some(VisibleExam { exam, access })
            })
            .collect()
    }

    /// Access decision for a single exam; `None` means the exam is hidden.
    pub fn evaluate(exam: &Exam, requester: &Requester, scope: VisibilityScope) -> Option<ExamAccess> {
        let is_owner = exam.owner_id == requester.id;
        let tier = Self::best_tier(exam, requester);

        if requester.is_admin {
            if scope == VisibilityScope::AssignedOnly && !is_owner && tier.is_none() {
                return None;
            }
            return Some(ExamAccess::from_badge(AccessBadge::Admin));
        }
        if is_owner {
            return Some(ExamAccess::from_badge(AccessBadge::Owner));
        }

        // VIEW-tier exams stay listed in both scopes
        let badge = match tier? {
            AccessTier::Full | AccessTier::CoTeacher => AccessBadge::FullAccess,
            AccessTier::View => AccessBadge::ViewOnly,
        };
        Some(ExamAccess::from_badge(badge))
    }

    /// Highest tier the requester holds through the exam's class codes or a
    /// direct grant on the exam.
    pub fn best_tier(exam: &Exam, requester: &Requester) -> Option<AccessTier> {
        let via_classes = exam
            .class_codes
            .iter()
            .filter_map(|code| requester.class_assignments.get(code).copied());
        let direct = exam.access_assignments.get(&requester.id).copied();

        via_classes.chain(direct).max_by_key(AccessTier::rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use uuid::Uuid;

    fn exam(owner: Uuid, classes: &[&str]) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: "Routine test".to_string(),
            class_codes: classes.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
            access_assignments: HashMap::new(),
            is_admin_visible: true,
            created_at: None,
        }
    }

    fn badges(visible: &[VisibleExam]) -> Vec<AccessBadge> {
        visible.iter().map(|v| v.access.badge).collect()
    }

    #[test]
    fn view_tier_visible_in_both_scopes() {
        let x = Uuid::new_v4();
        let y = Requester::teacher(Uuid::new_v4()).with_class("C", AccessTier::View);
        for scope in [VisibilityScope::All, VisibilityScope::AssignedOnly] {
            let visible = VisibilityService::filter(vec![exam(x, &["C"])], &y, scope);
            assert_eq!(badges(&visible), vec![AccessBadge::ViewOnly]);
            assert!(!visible[0].access.can_edit);
            assert!(!visible[0].access.can_delete);
        }
    }

    #[test]
    fn unassigned_teacher_sees_nothing() {
        let stranger = Requester::teacher(Uuid::new_v4()).with_class("OTHER", AccessTier::Full);
        let exams = vec![exam(Uuid::new_v4(), &["C"]), exam(Uuid::new_v4(), &[])];
        for scope in [VisibilityScope::All, VisibilityScope::AssignedOnly] {
            assert!(VisibilityService::filter(exams.clone(), &stranger, scope).is_empty());
        }
    }

    #[test]
    fn best_tier_wins_across_class_codes() {
        let owner = Uuid::new_v4();
        let teacher = Requester::teacher(Uuid::new_v4())
            .with_class("A", AccessTier::View)
            .with_class("B", AccessTier::CoTeacher);
        let visible =
            VisibilityService::filter(vec![exam(owner, &["A", "B"])], &teacher, VisibilityScope::All);
        assert_eq!(badges(&visible), vec![AccessBadge::FullAccess]);
        assert!(visible[0].access.can_edit);
        assert!(!visible[0].access.can_delete);
    }

    #[test]
    fn direct_grant_counts_as_assignment() {
        let teacher = Requester::teacher(Uuid::new_v4());
        let mut e = exam(Uuid::new_v4(), &[]);
        e.access_assignments.insert(teacher.id, AccessTier::Full);
        let visible = VisibilityService::filter(vec![e], &teacher, VisibilityScope::AssignedOnly);
        assert_eq!(badges(&visible), vec![AccessBadge::FullAccess]);
    }

    #[test]
    fn grants_hidden_from_teachers_who_cannot_manage_them() {
        let owner = Uuid::new_v4();
        let viewer = Requester::teacher(Uuid::new_v4()).with_class("C", AccessTier::View);
        let mut e = exam(owner, &["C"]);
        e.access_assignments.insert(Uuid::new_v4(), AccessTier::Full);
        e.access_assignments.insert(viewer.id, AccessTier::View);

        let seen_by_viewer = VisibilityService::filter(vec![e.clone()], &viewer, VisibilityScope::All);
        assert!(seen_by_viewer[0].exam.access_assignments.is_empty());
        let body = serde_json::to_value(&seen_by_viewer[0]).unwrap();
        assert!(body.get("access_assignments").is_none());

        let seen_by_owner =
            VisibilityService::filter(vec![e], &Requester::teacher(owner), VisibilityScope::All);
        assert_eq!(seen_by_owner[0].exam.access_assignments.len(), 2);
    }

    #[test]
    fn owner_beats_assignment() {
        let me = Uuid::new_v4();
        let requester = Requester::teacher(me).with_class("C", AccessTier::View);
        let visible = VisibilityService::filter(vec![exam(me, &["C"])], &requester, VisibilityScope::All);
        assert_eq!(badges(&visible), vec![AccessBadge::Owner]);
        assert!(visible[0].access.can_delete);
    }

    #[test]
    fn admin_scope_handling() {
        let admin = Requester::admin(Uuid::new_v4()).with_class("C", AccessTier::Full);
        let exams = vec![
            exam(Uuid::new_v4(), &["C"]),
            exam(Uuid::new_v4(), &[]),
            exam(Uuid::new_v4(), &["D"]),
            exam(admin.id, &[]),
        ];
        let all = VisibilityService::filter(exams.clone(), &admin, VisibilityScope::All);
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|v| v.access.badge == AccessBadge::Admin));

        let assigned = VisibilityService::filter(exams.clone(), &admin, VisibilityScope::AssignedOnly);
        let ids: Vec<Uuid> = assigned.iter().map(|v| v.exam.id).collect();
        assert_eq!(ids, vec![exams[0].id, exams[3].id]);
    }

    #[test]
    fn owner_with_no_class_codes_kept_in_assigned_scope() {
        let me = Uuid::new_v4();
        let visible = VisibilityService::filter(
            vec![exam(me, &[])],
            &Requester::teacher(me),
            VisibilityScope::AssignedOnly,
        );
        assert_eq!(badges(&visible), vec![AccessBadge::Owner]);
    }
}
