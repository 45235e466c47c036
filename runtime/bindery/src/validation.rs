//! Check a fully populated record before handing it over.
//!
//! Validation is the last stage of the binding pipeline: it sees the record after
//! decoding and after defaults have been applied.
//! Plug in your own logic by implementing [`Validator`], by passing a closure,
//! or by implementing [`Validate`] on the record itself and using [`SelfValidating`].
pub use crate::errors::ValidationError;

/// Check a record of type `R`.
///
/// It's implemented for every `Fn(&R) -> Result<(), ValidationError>`:
///
/// ```rust
/// use bindery::binding::JsonBinding;
/// use bindery::validation::ValidationError;
///
/// #[derive(bindery::Record, serde::Deserialize, Default)]
/// pub struct Signup {
///     #[bind(default = "18")]
///     age: i32,
/// }
///
/// let binding = JsonBinding::new().validator(|signup: &Signup| {
///     if signup.age < 18 {
///         return Err(ValidationError::new("must be at least 18").field("age"));
///     }
///     Ok(())
/// });
/// ```
pub trait Validator<R: ?Sized> {
    /// Returns an error if `record` isn't valid.
    fn validate(&self, record: &R) -> Result<(), ValidationError>;
}

impl<R, F> Validator<R> for F
where
    R: ?Sized,
    F: Fn(&R) -> Result<(), ValidationError>,
{
    fn validate(&self, record: &R) -> Result<(), ValidationError> {
        self(record)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// A validator that accepts every record.
pub struct NoValidation;

impl<R: ?Sized> Validator<R> for NoValidation {
    fn validate(&self, _record: &R) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// A record that knows how to check itself.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// A validator that defers to the record's own [`Validate`] implementation.
pub struct SelfValidating;

impl<R: Validate + ?Sized> Validator<R> for SelfValidating {
    fn validate(&self, record: &R) -> Result<(), ValidationError> {
        record.validate()
    }
}
