//! Populate a record from incoming data, in one call.
//!
//! # Overview
//!
//! A [`Binding`] runs the full pipeline against a record:
//!
//! 1. **Decode** the input into the record, via [`JsonDecoder`];
//! 2. **Apply defaults** to every field that was left unset, via [`apply_defaults`];
//! 3. **Validate** the result, via the configured [`Validator`].
//!
//! The first stage to fail aborts the pipeline: its error is returned,
//! wrapped in the matching [`BindError`] variant, and later stages never run.
//!
//! ```rust
//! use bindery::binding::{Binding, JsonBinding};
//!
//! #[derive(bindery::Record, serde::Deserialize, Default)]
//! #[serde(default)]
//! pub struct Signup {
//!     #[bind(default = "18")]
//!     age: i32,
//!     email: String,
//! }
//!
//! let mut signup = Signup::default();
//! JsonBinding::new()
//!     .bind_from_bytes(br#"{"email": "ada@example.com"}"#, &mut signup)
//!     .unwrap();
//! assert_eq!(signup.age, 18);
//! ```
//!
//! [`JsonDecoder`]: crate::decode::JsonDecoder
//! [`apply_defaults`]: crate::record::apply_defaults
use std::io::Read;

use serde::de::DeserializeOwned;
use tracing_log_error::log_error;

use crate::config::DecoderConfig;
use crate::decode::JsonDecoder;
use crate::errors::{BindError, InvalidRequest};
use crate::record::{Record, apply_defaults};
use crate::validation::{NoValidation, Validator};

pub use request::RequestContext;

mod request;

/// A strategy to populate records of type `R` from incoming data.
pub trait Binding<R> {
    /// A short label that identifies the input format, e.g. `"json"`.
    fn name(&self) -> &'static str;

    /// Populate `record` from the body of `request`.
    ///
    /// It fails with [`InvalidRequest`] if there is no request, or if the request has no body.
    fn bind_from_stream<C>(&self, request: Option<&mut C>, record: &mut R) -> Result<(), BindError>
    where
        C: RequestContext;

    /// Populate `record` from an in-memory buffer.
    fn bind_from_bytes(&self, bytes: &[u8], record: &mut R) -> Result<(), BindError>;
}

#[derive(Debug, Clone)]
/// Populate records from JSON documents.
///
/// # Configuration
///
/// [`JsonBinding::new`] follows the process-wide [`DecoderConfig`].
/// Use [`JsonBinding::with_config`] to pick a configuration explicitly.
///
/// # Validation
///
/// No validation is performed by default.
/// Attach a validator with [`JsonBinding::validator`].
pub struct JsonBinding<V = NoValidation> {
    decoder: JsonDecoder,
    validator: V,
}

impl JsonBinding {
    /// A binder that follows the process-wide [`DecoderConfig`].
    ///
    /// The configuration is captured when the binder is created.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::global())
    }

    /// A binder that follows `config`, regardless of the process-wide configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: JsonDecoder::new(config),
            validator: NoValidation,
        }
    }
}

impl Default for JsonBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> JsonBinding<V> {
    /// Replace the validator that runs after decoding and defaulting.
    pub fn validator<V2>(self, validator: V2) -> JsonBinding<V2> {
        JsonBinding {
            decoder: self.decoder,
            validator,
        }
    }

    /// The configuration this binder follows.
    pub fn config(&self) -> &DecoderConfig {
        self.decoder.config()
    }

    fn bind<R, B>(&self, body: B, record: &mut R) -> Result<(), BindError>
    where
        R: Record + DeserializeOwned,
        V: Validator<R>,
        B: Read,
    {
        if let Err(e) = self.decoder.decode_into(body, record) {
            log_error!(e, level: tracing::Level::DEBUG, "Failed to decode the incoming data");
            return Err(e.into());
        }
        if let Err(e) = apply_defaults(record) {
            log_error!(e, level: tracing::Level::DEBUG, "Failed to apply default values");
            return Err(e.into());
        }
        if let Err(e) = self.validator.validate(record) {
            log_error!(e, level: tracing::Level::DEBUG, "The record didn't pass validation");
            return Err(e.into());
        }
        Ok(())
    }
}

impl<R, V> Binding<R> for JsonBinding<V>
where
    R: Record + DeserializeOwned,
    V: Validator<R>,
{
    fn name(&self) -> &'static str {
        "json"
    }

    fn bind_from_stream<C>(&self, request: Option<&mut C>, record: &mut R) -> Result<(), BindError>
    where
        C: RequestContext,
    {
        let span = binding_span::<R>(Binding::<R>::name(self));
        let _guard = span.enter();
        let Some(request) = request else {
            let e = InvalidRequest::MissingRequest;
            log_error!(e, level: tracing::Level::DEBUG, "Nothing to bind from");
            return Err(e.into());
        };
        let Some(body) = request.body() else {
            let e = InvalidRequest::MissingBody;
            log_error!(e, level: tracing::Level::DEBUG, "Nothing to bind from");
            return Err(e.into());
        };
        self.bind(body, record)
    }

    fn bind_from_bytes(&self, bytes: &[u8], record: &mut R) -> Result<(), BindError> {
        let span = binding_span::<R>(Binding::<R>::name(self));
        let _guard = span.enter();
        self.bind(bytes, record)
    }
}

fn binding_span<R>(name: &'static str) -> tracing::Span {
    tracing::debug_span!(
        "Binding incoming data",
        binding.name = name,
        binding.record = std::any::type_name::<R>(),
    )
}

/// Populate `record` from a JSON document, following the process-wide [`DecoderConfig`].
///
/// No validation is performed.
/// It's a shorthand for `JsonBinding::new().bind_from_bytes(bytes, record)`.
pub fn bind_json<R>(bytes: &[u8], record: &mut R) -> Result<(), BindError>
where
    R: Record + DeserializeOwned,
{
    JsonBinding::new().bind_from_bytes(bytes, record)
}
