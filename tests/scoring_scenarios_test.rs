use std::collections::{BTreeSet, HashMap};

use primepath_backend::{
    dto::question_dto::{CreateQuestionPayload, UpdateQuestionPayload},
    models::{
        exam::{AccessBadge, AccessTier, Exam},
        question::{Question, QuestionType},
        submission::{StudentSubmission, SubmittedAnswer},
        user::Requester,
    },
    services::{
        answer_key_codec::{AnswerKey, AnswerKeyCodec, MixedComponent},
        grading_service::{GradingService, ScoringPolicy},
        options_count_resolver::OptionsCountResolver,
        question_schema::{QuestionSchema, WidgetSpec},
        question_service::QuestionService,
        visibility_service::{VisibilityScope, VisibilityService},
    },
};
use serde_json::json;
use uuid::Uuid;

fn exam(owner: Uuid, classes: &[&str]) -> Exam {
    Exam {
        id: Uuid::new_v4(),
        owner_id: owner,
        title: "Midterm".to_string(),
        class_codes: classes.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
        access_assignments: HashMap::new(),
        is_admin_visible: true,
        created_at: None,
    }
}

#[test]
fn short_answer_drives_inputs_end_to_end() {
    let prepared = QuestionService::prepare_new(
        Uuid::new_v4(),
        CreateQuestionPayload {
            question_number: 1,
            question_type: QuestionType::Short,
            options_count: None,
            correct_answer: "111|111|2222".to_string(),
            points: 3,
        },
    )
    .expect("prepare");
    let question = prepared.question;
    assert_eq!(question.options_count, 3);

    let WidgetSpec::TextInputs { inputs } = QuestionSchema::render_spec(&question) else {
        panic!("SHORT must render text inputs");
    };
    let labels: String = inputs.iter().map(|i| i.label).collect();
    assert_eq!(labels, "ABC");

    let result = GradingService::score(
        &question,
        Some(&json!(["111", "111", "2222"])),
        &ScoringPolicy::default(),
    );
    assert!(result.is_correct);
    assert_eq!(result.points_awarded, 3.0);
}

#[test]
fn mixed_three_wide_component_choices() {
    let question = Question {
        id: Uuid::new_v4(),
        exam_id: Uuid::new_v4(),
        question_number: 4,
        question_type: QuestionType::Mixed,
        options_count: 3,
        correct_answer: r#"[{"type":"MCQ","answer":"B"}]"#.to_string(),
        points: 2,
    };
    let WidgetSpec::Composite { components } = QuestionSchema::render_spec(&question) else {
        panic!("MIXED must render a composite");
    };
    assert_eq!(
        components[0].widget,
        WidgetSpec::Choice {
            multiple: false,
            choices: vec!['A', 'B', 'C']
        }
    );
}

#[test]
fn mixed_width_is_kept_across_save_all_then_single_edit() {
    let created = QuestionService::prepare_new(
        Uuid::new_v4(),
        CreateQuestionPayload {
            question_number: 2,
            question_type: QuestionType::Mixed,
            options_count: Some(5),
            correct_answer: r#"[{"type":"MCQ","answer":"E"},{"type":"SHORT","answer":"H2O"}]"#
                .to_string(),
            points: 4,
        },
    )
    .expect("create")
    .question;

    let widened = UpdateQuestionPayload {
        options_count: Some(8),
        ..Default::default()
    };
    let after_save_all = QuestionService::prepare_update(&created, widened.clone())
        .expect("save all")
        .question;
    let after_edit = QuestionService::prepare_update(&after_save_all, widened)
        .expect("individual edit")
        .question;
    assert_eq!(after_edit.options_count, 8);

    let WidgetSpec::Composite { components } = QuestionSchema::render_spec(&after_edit) else {
        panic!("MIXED must render a composite");
    };
    match &components[0].widget {
        WidgetSpec::Choice { choices, .. } => {
            assert_eq!(choices.iter().collect::<String>(), "ABCDEFGH")
        }
        other => panic!("unexpected widget {:?}", other),
    }
}

#[test]
fn mixed_never_derives_width_from_content() {
    let raw = AnswerKeyCodec::encode(&AnswerKey::Mixed(vec![
        MixedComponent::mcq(0, vec!['A'], false, 2),
        MixedComponent::short(1, "a|b|c|d"),
    ]));
    for n in 2..=10 {
        assert_eq!(OptionsCountResolver::resolve(QuestionType::Mixed, &raw, n), n);
    }
}

#[test]
fn codec_round_trips_well_formed_keys() {
    let keys = [
        (QuestionType::Short, AnswerKey::Short(vec!["cat".into(), "dog".into()])),
        (QuestionType::Short, AnswerKey::Short(Vec::new())),
        (QuestionType::Long, AnswerKey::Long(Vec::new())),
        (
            QuestionType::Long,
            AnswerKey::Long(vec!["Because | it rains".into(), "Winter".into(), "".into()]),
        ),
        (
            QuestionType::Mixed,
            AnswerKey::Mixed(vec![
                MixedComponent::short(0, "Seoul"),
                MixedComponent::mcq(1, vec!['B', 'F'], true, 6),
            ]),
        ),
    ];
    for (question_type, key) in keys {
        let raw = AnswerKeyCodec::encode(&key);
        let decoded = AnswerKeyCodec::decode(question_type, &raw, 6);
        assert!(decoded.issues.is_empty(), "{:?}", decoded.issues);
        assert_eq!(decoded.key, key);
    }
}

#[test]
fn malformed_mixed_key_degrades() {
    let decoded = AnswerKeyCodec::decode(QuestionType::Mixed, "{not valid", 4);
    assert_eq!(decoded.key, AnswerKey::Mixed(vec![]));
    assert!(decoded.is_malformed());
}

#[test]
fn view_only_teacher_sees_exam_in_assigned_scope() {
    let x = Uuid::new_v4();
    let y = Requester::teacher(Uuid::new_v4()).with_class("C", AccessTier::View);
    let e = exam(x, &["C"]);

    let visible = VisibilityService::filter(vec![e.clone()], &y, VisibilityScope::AssignedOnly);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].exam.id, e.id);
    assert_eq!(visible[0].access.badge, AccessBadge::ViewOnly);

    let body = serde_json::to_value(&visible[0]).expect("serialize");
    assert_eq!(body["badge"], "VIEW ONLY");
    assert_eq!(body["can_edit"], false);
}

#[test]
fn strangers_never_see_exams() {
    let exams = vec![
        exam(Uuid::new_v4(), &["A"]),
        exam(Uuid::new_v4(), &["B", "C"]),
        exam(Uuid::new_v4(), &[]),
    ];
    let stranger = Requester::teacher(Uuid::new_v4());
    for scope in [VisibilityScope::All, VisibilityScope::AssignedOnly] {
        assert!(VisibilityService::filter(exams.clone(), &stranger, scope).is_empty());
    }
}

#[test]
fn exam_submission_is_graded_without_raising() {
    let exam_id = Uuid::new_v4();
    let make = |number: i32, question_type: QuestionType, count: i32, answer: &str, points: i32| Question {
        id: Uuid::new_v4(),
        exam_id,
        question_number: number,
        question_type,
        options_count: count,
        correct_answer: answer.to_string(),
        points,
    };
    let questions = vec![
        make(1, QuestionType::Mcq, 4, "D", 1),
        make(2, QuestionType::Checkbox, 5, "A,E", 2),
        make(3, QuestionType::Short, 2, "7|8", 2),
        make(
            4,
            QuestionType::Mixed,
            4,
            r#"[{"type":"MCQ","answer":"C"},{"type":"SHORT","answer":"iron"}]"#,
            2,
        ),
    ];
    let submission = StudentSubmission {
        exam_id,
        student_id: Uuid::new_v4(),
        answers: vec![
            SubmittedAnswer { question_id: questions[0].id, answer: json!("D") },
            SubmittedAnswer { question_id: questions[1].id, answer: json!(["E", "A"]) },
            // one value for a two-blank question
            SubmittedAnswer { question_id: questions[2].id, answer: json!(["7"]) },
            SubmittedAnswer { question_id: questions[3].id, answer: json!(["C", "copper"]) },
        ],
    };

    let score = GradingService::grade_submission(&questions, &submission, &ScoringPolicy::default());
    let awarded: Vec<f64> = score.results.iter().map(|r| r.points_awarded).collect();
    assert_eq!(awarded, vec![1.0, 2.0, 0.0, 1.0]);
    assert!(score.results[2].shape_mismatch().is_some());
    assert_eq!(score.total_awarded, 4.0);
    assert_eq!(score.max_points, 7);
}
