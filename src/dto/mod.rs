pub mod exam_dto;
pub mod question_dto;
pub mod submission_dto;
