use serde::{Deserialize, Serialize};

use crate::models::question::{Question, QuestionType};
use crate::services::answer_key_codec::{AnswerKey, AnswerKeyCodec, ComponentAnswer};
use crate::utils::letters::option_letters;

/// Renderer-agnostic description of the inputs a question needs. The view
/// layer turns this into markup; nothing here knows about HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetSpec {
    TextInputs { inputs: Vec<TextInput> },
    Choice { multiple: bool, choices: Vec<char> },
    Composite { components: Vec<ComponentWidget> },
}

impl WidgetSpec {
    /// Number of independent answers a submission must provide.
    pub fn expected_answers(&self) -> usize {
        match self {
            WidgetSpec::TextInputs { inputs } => inputs.len(),
            WidgetSpec::Choice { .. } => 1,
            WidgetSpec::Composite { components } => components.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub label: char,
    pub multiline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentWidget {
    pub index: usize,
    pub widget: WidgetSpec,
}

pub struct QuestionSchema;

impl QuestionSchema {
    pub fn render_spec(question: &Question) -> WidgetSpec {
        match question.question_type {
            QuestionType::Short => text_inputs(question.options_count, false),
            QuestionType::Long => text_inputs(question.options_count, true),
            QuestionType::Mcq => WidgetSpec::Choice {
                multiple: false,
                choices: option_letters(question.options_count),
            },
            QuestionType::Checkbox => WidgetSpec::Choice {
                multiple: true,
                choices: option_letters(question.options_count),
            },
            QuestionType::Mixed => {
                let decoded = AnswerKeyCodec::decode(
                    question.question_type,
                    &question.correct_answer,
                    question.options_count,
                );
                if decoded.is_malformed() {
                    tracing::warn!(
                        question_id = %question.id,
                        "Rendering MIXED question without a usable answer key"
                    );
                }
                let components = match decoded.key {
                    AnswerKey::Mixed(components) => components,
                    _ => Vec::new(),
                };
                WidgetSpec::Composite {
                    components: components
                        .into_iter()
                        .map(|component| ComponentWidget {
                            index: component.index,
                            widget: match component.correct {
                                // choice width follows the question, not the
                                // number of correct letters
                                ComponentAnswer::Choice { multiple, .. } => WidgetSpec::Choice {
                                    multiple,
                                    choices: component.options,
                                },
                                ComponentAnswer::Text { .. } => text_inputs(1, false),
                            },
                        })
                        .collect(),
                }
            }
        }
    }
}

fn text_inputs(count: i32, multiline: bool) -> WidgetSpec {
    WidgetSpec::TextInputs {
        inputs: option_letters(count.max(1))
            .into_iter()
            .map(|label| TextInput { label, multiline })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn question(question_type: QuestionType, options_count: i32, answer: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            question_number: 1,
            question_type,
            options_count,
            correct_answer: answer.to_string(),
            points: 1,
        }
    }

    #[test]
    fn short_renders_one_input_per_blank() {
        let spec = QuestionSchema::render_spec(&question(QuestionType::Short, 3, "111|111|2222"));
        let WidgetSpec::TextInputs { inputs } = spec else {
            panic!("expected text inputs");
        };
        let labels: Vec<char> = inputs.iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!['A', 'B', 'C']);
        assert!(inputs.iter().all(|i| !i.multiline));
    }

    #[test]
    fn long_renders_multiline_inputs() {
        let spec = QuestionSchema::render_spec(&question(QuestionType::Long, 2, "a|||b"));
        let WidgetSpec::TextInputs { inputs } = spec else {
            panic!("expected text inputs");
        };
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().all(|i| i.multiline));
    }

    #[test]
    fn mcq_and_checkbox_follow_options_count() {
        assert_eq!(
            QuestionSchema::render_spec(&question(QuestionType::Mcq, 4, "B")),
            WidgetSpec::Choice {
                multiple: false,
                choices: vec!['A', 'B', 'C', 'D']
            }
        );
        assert_eq!(
            QuestionSchema::render_spec(&question(QuestionType::Checkbox, 2, "A,B")),
            WidgetSpec::Choice {
                multiple: true,
                choices: vec!['A', 'B']
            }
        );
    }

    #[test]
    fn mixed_mcq_component_uses_question_width() {
        let q = question(
            QuestionType::Mixed,
            8,
            r#"[{"type":"MCQ","answer":"A"},{"type":"SHORT","answer":"x"}]"#,
        );
        let WidgetSpec::Composite { components } = QuestionSchema::render_spec(&q) else {
            panic!("expected composite");
        };
        assert_eq!(components.len(), 2);
        assert_eq!(
            components[0].widget,
            WidgetSpec::Choice {
                multiple: false,
                choices: "ABCDEFGH".chars().collect()
            }
        );
        assert_eq!(components[1].widget.expected_answers(), 1);
    }

    #[test]
    fn malformed_mixed_renders_no_components() {
        let spec = QuestionSchema::render_spec(&question(QuestionType::Mixed, 5, "{not valid"));
        assert_eq!(spec, WidgetSpec::Composite { components: vec![] });
    }
}
