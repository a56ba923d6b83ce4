pub mod answer_key_codec;
pub mod audit_service;
pub mod exam_service;
pub mod grading_service;
pub mod options_count_resolver;
pub mod question_schema;
pub mod question_service;
pub mod submission_service;
pub mod visibility_service;
