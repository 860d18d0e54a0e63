use crate::field::{FieldRecord, Validity};

/// A field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name.
    pub field: String,
    /// Display label of the field.
    pub display: String,
    /// Rendered error message.
    pub message: String,
}

impl FieldError {
    /// The error of an invalid record, `None` for any other record.
    pub fn from_record(record: &FieldRecord) -> Option<Self> {
        if record.valid != Validity::Invalid {
            return None;
        }
        Some(Self {
            field: record.name.clone(),
            display: record.display.clone(),
            message: record.error.clone().unwrap_or_default(),
        })
    }
}

/// Result of validating one or more fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationResult {
    /// All fields passed validation.
    #[default]
    Valid,
    /// One or more fields failed validation.
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    /// Check if all fields passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Check if any field failed validation.
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Get all validation errors.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// Get the first validation error (if any).
    pub fn first_error(&self) -> Option<&FieldError> {
        self.errors().first()
    }

    /// Names of the invalid fields, in form order.
    pub fn invalid_fields(&self) -> Vec<&str> {
        self.errors().iter().map(|e| e.field.as_str()).collect()
    }
}

impl FromIterator<FieldError> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        let errors: Vec<_> = iter.into_iter().collect();
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }
}
