//! Errors that can occur while binding incoming data to a record.
use std::borrow::Cow;
use std::num::ParseIntError;

use ubyte::ByteUnit;

/// The error returned by [`Binding::bind_from_stream`] and [`Binding::bind_from_bytes`].
///
/// Each variant maps to one stage of the binding pipeline.
/// The first stage to fail determines the variant: later stages never run.
///
/// [`Binding::bind_from_stream`]: crate::binding::Binding::bind_from_stream
/// [`Binding::bind_from_bytes`]: crate::binding::Binding::bind_from_bytes
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BindError {
    #[error(transparent)]
    /// See [`InvalidRequest`] for details.
    InvalidRequest(#[from] InvalidRequest),
    #[error(transparent)]
    /// See [`DecodeError`] for details.
    Decode(#[from] DecodeError),
    #[error(transparent)]
    /// See [`DefaultError`] for details.
    Default(#[from] DefaultError),
    #[error(transparent)]
    /// See [`ValidationError`] for details.
    Validation(#[from] ValidationError),
}

impl BindError {
    /// A short, stable label for the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            BindError::InvalidRequest(_) => "request",
            BindError::Decode(_) => "decode",
            BindError::Default(_) => "default",
            BindError::Validation(_) => "validation",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
/// There is nothing to bind from.
///
/// This is a caller-side misuse signal: retrying won't help.
pub enum InvalidRequest {
    #[error("Invalid request: there is no request to bind from.")]
    /// The request context was absent.
    MissingRequest,
    #[error("Invalid request: the request has no body.")]
    /// The request context was present, but it carries no body.
    MissingBody,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
/// The error returned by [`JsonDecoder::decode`] when the input can't be turned into a record.
///
/// [`JsonDecoder::decode`]: crate::decode::JsonDecoder::decode
pub enum DecodeError {
    #[error(transparent)]
    /// See [`JsonDeserializationError`] for details.
    Deserialization(#[from] JsonDeserializationError),
    #[error(transparent)]
    /// See [`UnknownFieldError`] for details.
    UnknownField(#[from] UnknownFieldError),
    #[error(transparent)]
    /// See [`FlattenedFieldError`] for details.
    FlattenedField(#[from] FlattenedFieldError),
    #[error(transparent)]
    /// See [`SizeLimitExceeded`] for details.
    SizeLimitExceeded(#[from] SizeLimitExceeded),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to deserialize the body as a JSON document.\n{source}")]
#[non_exhaustive]
/// The body is not a valid JSON document, is truncated, or doesn't match the shape
/// of the destination record.
pub struct JsonDeserializationError {
    #[source]
    pub(crate) source: serde_path_to_error::Error<serde_json::Error>,
}

impl JsonDeserializationError {
    /// The path to the value that couldn't be deserialized, e.g. `address.zip_code`.
    pub fn path(&self) -> &serde_path_to_error::Path {
        self.source.path()
    }

    /// The underlying error reported by `serde_json`.
    pub fn inner(&self) -> &serde_json::Error {
        self.source.inner()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("The body contains a field that the destination doesn't know about: `{path}`.")]
#[non_exhaustive]
/// The body contains a key that doesn't match any field of the destination record.
///
/// Only returned when [`DecoderConfig::reject_unknown_input_keys`] is enabled.
///
/// [`DecoderConfig::reject_unknown_input_keys`]: crate::config::DecoderConfig::reject_unknown_input_keys
pub struct UnknownFieldError {
    /// The dotted path of the unknown key, e.g. `owner.nickname`.
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
#[error(
    "The body contains a field that can't be checked against the destination: `{path}` is collected by a `#[serde(flatten)]` field."
)]
#[non_exhaustive]
/// The body contains a key that the destination hands over to a `#[serde(flatten)]` field.
///
/// Only returned when [`DecoderConfig::reject_unknown_input_keys`] is enabled.
/// Flattened fields pick their keys out of a buffer that the decoder can't observe,
/// so it can't tell a key they consume from one they drop.
/// Keys that match a regular field of the destination are unaffected.
///
/// [`DecoderConfig::reject_unknown_input_keys`]: crate::config::DecoderConfig::reject_unknown_input_keys
pub struct FlattenedFieldError {
    /// The dotted path of the key, e.g. `tenant.region`.
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
#[error("The body is larger than the maximum size limit enforced by this binder.")]
#[non_exhaustive]
/// The body is larger than the configured [`BodySizeLimit`](crate::decode::BodySizeLimit).
pub struct SizeLimitExceeded {
    /// The maximum size limit that was breached.
    pub max_size: ByteUnit,
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to apply the default value `{literal}` to `{field}`: it isn't a valid 32-bit integer.")]
#[non_exhaustive]
/// A default annotation can't be parsed into the kind of the field it's attached to.
///
/// This points at a defect in the record definition, not in the incoming data.
pub struct DefaultError {
    /// The dotted path of the field, e.g. `base.age`.
    pub field: String,
    /// The literal carried by the default annotation.
    pub literal: String,
    #[source]
    pub(crate) source: ParseIntError,
}

/// A record didn't pass validation.
///
/// Returned verbatim by the binding pipeline, without any wrapping.
#[derive(Debug)]
pub struct ValidationError {
    field: Option<Cow<'static, str>>,
    message: Cow<'static, str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ValidationError {
    /// A validation failure described by `message`.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            field: None,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap the error returned by a third-party validator.
    ///
    /// Its `Display` representation becomes the message.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            field: None,
            message: source.to_string().into(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach the name of the offending field.
    pub fn field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// The name of the offending field, if one was attached.
    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The human-readable description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "Validation failed for `{field}`: {}", self.message),
            None => write!(f, "Validation failed: {}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_mentions_the_field() {
        let err = ValidationError::new("must be at least 18").field("age");
        insta::assert_snapshot!(err, @"Validation failed for `age`: must be at least 18");
        assert_eq!(err.field_name(), Some("age"));
    }

    #[test]
    fn validation_error_without_field() {
        let err = ValidationError::new("passwords don't match");
        insta::assert_snapshot!(err, @"Validation failed: passwords don't match");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn validation_error_keeps_its_source() {
        let source = std::io::Error::other("upstream validator exploded");
        let err = ValidationError::from_source(source);
        assert_eq!(err.message(), "upstream validator exploded");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn bind_error_is_transparent() {
        let err: BindError = InvalidRequest::MissingBody.into();
        insta::assert_snapshot!(err, @"Invalid request: the request has no body.");
        assert_eq!(err.stage(), "request");
    }
}
