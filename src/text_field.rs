use crate::procedure_db::ProcDbError;
use ecow::EcoString;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum FieldError {
    #[error("invalid value `{value}`: {reason}")]
    Invalid {
        value: EcoString,
        reason: &'static str,
    },
    #[error(transparent)]
    Registry(#[from] ProcDbError),
}

pub(crate) type FieldResult<T> = Result<T, FieldError>;

/// Normalizes a raw value or rejects it.
pub(crate) type Validator = fn(&str) -> FieldResult<EcoString>;

/// Runs after a value has been stored, with the previous and the committed
/// value. Failing restores the previous value.
pub(crate) trait PostCommit {
    fn after_commit(&mut self, old: &str, new: &str) -> FieldResult<()>;
}

/// Editable text value with an ordered chain of validators.
#[derive(Clone)]
pub(crate) struct TextField {
    value: EcoString,
    validators: Vec<Validator>,
}

impl TextField {
    pub fn new(text: impl Into<EcoString>) -> Self {
        Self {
            value: text.into(),
            validators: Vec::new(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, raw: &str) -> FieldResult<()> {
        self.value = self.validate(raw)?;
        Ok(())
    }

    pub fn commit_with<H: PostCommit>(
        &mut self,
        raw: &str,
        hook: &mut H,
    ) -> FieldResult<()> {
        let old = self.value.clone();
        self.set_value(raw)?;
        if let Err(err) = hook.after_commit(&old, &self.value) {
            self.value = old;
            return Err(err);
        }
        Ok(())
    }

    fn validate(&self, raw: &str) -> FieldResult<EcoString> {
        self.validators
            .iter()
            .try_fold(EcoString::from(raw), |value, validate| validate(&value))
    }
}

impl fmt::Debug for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextField")
            .field("value", &self.value)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Makes a procedure name legal: surrounding whitespace is trimmed and
/// inner whitespace runs become a single `_`.
pub(crate) fn legal_name(raw: &str) -> FieldResult<EcoString> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join("_");
    match name.chars().next() {
        None => Err(FieldError::Invalid {
            value: raw.into(),
            reason: "procedure names cannot be empty",
        }),
        Some(c) if c.is_ascii_digit() => Err(FieldError::Invalid {
            value: raw.into(),
            reason: "procedure names cannot start with a digit",
        }),
        Some(_) => Ok(name.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<(String, String)>);

    impl PostCommit for Recorder {
        fn after_commit(&mut self, old: &str, new: &str) -> FieldResult<()> {
            self.0.push((old.to_owned(), new.to_owned()));
            Ok(())
        }
    }

    struct Refuse;

    impl PostCommit for Refuse {
        fn after_commit(&mut self, _: &str, new: &str) -> FieldResult<()> {
            Err(FieldError::Registry(ProcDbError::UnknownProcedure(
                new.into(),
            )))
        }
    }

    #[test]
    fn plain_field_accepts_anything() {
        let mut field = TextField::new("start");
        field.set_value("").unwrap();
        assert_eq!(field.value(), "");
        field.set_value("  spaced  ").unwrap();
        assert_eq!(field.value(), "  spaced  ");
    }

    #[test]
    fn hook_sees_normalized_value() {
        let mut field = TextField::new("old").with_validator(legal_name);
        let mut hook = Recorder(Vec::new());
        field.commit_with("  two words ", &mut hook).unwrap();
        assert_eq!(field.value(), "two_words");
        assert_eq!(hook.0, [("old".to_owned(), "two_words".to_owned())]);
    }

    #[test]
    fn rejected_value_skips_hook() {
        let mut field = TextField::new("old").with_validator(legal_name);
        let mut hook = Recorder(Vec::new());
        let err = field.commit_with("   ", &mut hook).unwrap_err();
        assert!(matches!(err, FieldError::Invalid { .. }));
        assert_eq!(field.value(), "old");
        assert!(hook.0.is_empty());
    }

    #[test]
    fn failing_hook_restores_old_value() {
        let mut field = TextField::new("old");
        let err = field.commit_with("new", &mut Refuse).unwrap_err();
        assert_eq!(
            err,
            FieldError::Registry(ProcDbError::UnknownProcedure("new".into()))
        );
        assert_eq!(field.value(), "old");
    }

    #[test]
    fn legal_name_rules() {
        assert_eq!(legal_name("foo").unwrap().as_str(), "foo");
        assert_eq!(legal_name(" a \t b ").unwrap().as_str(), "a_b");
        assert!(legal_name("").is_err());
        assert!(legal_name("1st").is_err());
    }

    #[test]
    fn validators_run_in_order() {
        fn shout(raw: &str) -> FieldResult<EcoString> {
            Ok(raw.to_uppercase().into())
        }
        let mut field = TextField::new("")
            .with_validator(legal_name)
            .with_validator(shout);
        field.set_value("make  it").unwrap();
        assert_eq!(field.value(), "MAKE_IT");
    }
}
