//! Modal form descriptors and submitted instances.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use crate::core::InteractionError;
use crate::interaction::SubmittedField;

/// Rendering style of a modal text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputStyle {
    Short = 1,
    Paragraph = 2,
}

/// One text-input field of a modal, keyed by its own custom id.
#[derive(Debug, Clone)]
pub struct ModalFieldDescriptor {
    /// Field name the handler reads the value back under.
    pub name: String,
    /// Custom id the platform submits the value under.
    pub custom_id: String,
    pub style: TextInputStyle,
    pub required: bool,
}

/// Shape of a modal form: an ordered set of text-input fields.
///
/// Stands in for the annotated modal struct of attribute-driven platforms;
/// the pipeline materialises a [`ModalInstance`] from a submission against
/// this descriptor.
#[derive(Debug, Clone)]
pub struct ModalDescriptor {
    pub title: String,
    pub fields: Vec<ModalFieldDescriptor>,
}

impl ModalDescriptor {
    /// Build an instance from the submitted fields, matching each submission
    /// to a field by custom id.
    pub fn materialize(&self, submitted: &[SubmittedField]) -> Result<ModalInstance, InteractionError> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let found = submitted.iter().find(|s| s.custom_id == field.custom_id);
            match found {
                Some(s) => values.push((field.name.clone(), s.value.clone())),
                None if field.required => {
                    return Err(InteractionError::bad_args(format!(
                        "modal field '{}' was not submitted",
                        field.custom_id
                    )))
                }
                None => values.push((field.name.clone(), String::new())),
            }
        }
        Ok(ModalInstance { values })
    }
}

/// A filled-in modal, passed to the handler as its first argument.
///
/// Field values keep declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalInstance {
    values: Vec<(String, String)>,
}

impl ModalInstance {
    pub fn get(&self, field_name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field_name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback_modal() -> ModalDescriptor {
        ModalDescriptor {
            title: "Feedback".into(),
            fields: vec![
                ModalFieldDescriptor {
                    name: "subject".into(),
                    custom_id: "feedback_subject".into(),
                    style: TextInputStyle::Short,
                    required: true,
                },
                ModalFieldDescriptor {
                    name: "body".into(),
                    custom_id: "feedback_body".into(),
                    style: TextInputStyle::Paragraph,
                    required: false,
                },
            ],
        }
    }

    #[test]
    fn test_materialize_matches_by_custom_id() {
        let modal = feedback_modal();
        let submitted = vec![
            SubmittedField::new("feedback_body", "long text"),
            SubmittedField::new("feedback_subject", "bug"),
        ];
        let instance = modal.materialize(&submitted).unwrap();
        assert_eq!(instance.get("subject"), Some("bug"));
        assert_eq!(instance.get("body"), Some("long text"));
    }

    #[test]
    fn test_materialize_missing_required_field() {
        let modal = feedback_modal();
        let submitted = vec![SubmittedField::new("feedback_body", "text")];
        assert!(modal.materialize(&submitted).is_err());
    }

    #[test]
    fn test_materialize_missing_optional_is_empty() {
        let modal = feedback_modal();
        let submitted = vec![SubmittedField::new("feedback_subject", "bug")];
        let instance = modal.materialize(&submitted).unwrap();
        assert_eq!(instance.get("body"), Some(""));
    }
}
