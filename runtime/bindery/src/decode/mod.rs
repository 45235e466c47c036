//! Decode JSON documents into typed records.
//!
//! [`JsonDecoder`] is a thin layer on top of `serde_json`'s streaming deserializer.
//! It adds the behaviours that can be toggled at runtime via [`DecoderConfig`]:
//!
//! - unknown keys can be rejected instead of silently dropped;
//! - numbers landing in dynamic slots (`serde_json::Value`) can be preserved as exact
//!   numeric tokens instead of being coerced to `f64`;
//! - bodies larger than a configurable limit are refused.
//!
//! Failures point at the offending value via its path in the document
//! (e.g. `owner.address.zip_code`).
use std::io::{BufReader, Read};

use serde::de::DeserializeOwned;

use crate::config::DecoderConfig;
use crate::errors::{
    DecodeError, FlattenedFieldError, JsonDeserializationError, SizeLimitExceeded,
    UnknownFieldError,
};

pub use limit::BodySizeLimit;

mod deserializer;
mod limit;

use deserializer::{Rejection, Session, Wrap};
use limit::LimitedReader;

#[derive(Debug, Clone, Copy, Default)]
/// Decode JSON documents according to a [`DecoderConfig`].
///
/// # Example
///
/// ```rust
/// use bindery::config::DecoderConfig;
/// use bindery::decode::JsonDecoder;
///
/// #[derive(serde::Deserialize)]
/// pub struct Listing {
///     address: String,
/// }
///
/// let strict = JsonDecoder::new(DecoderConfig::default().reject_unknown_input_keys(true));
/// let outcome = strict.decode::<Listing, _>(r#"{"address": "Rome", "price": 10}"#.as_bytes());
/// assert!(outcome.is_err());
/// ```
pub struct JsonDecoder {
    config: DecoderConfig,
}

impl JsonDecoder {
    /// Create a decoder that follows `config`.
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The configuration this decoder follows.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode the first JSON value in `reader` as a `T`.
    ///
    /// Bytes that follow the first top-level value are not inspected.
    pub fn decode<T, R>(&self, reader: R) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        let mut reader = BufReader::new(LimitedReader::new(reader, self.config.body_size_limit()));
        let session = Session::new(&self.config);
        let outcome = {
            let mut deserializer = serde_json::Deserializer::from_reader(&mut reader);
            serde_path_to_error::deserialize(Wrap::new(&mut deserializer, &session))
        };
        outcome.map_err(|source| -> DecodeError {
            if let BodySizeLimit::Enabled { max_size } = self.config.body_size_limit()
                && reader.get_ref().exceeded()
            {
                return SizeLimitExceeded { max_size }.into();
            }
            let path = source.path().to_string();
            match session.rejection() {
                Some(Rejection::UnknownKey) => UnknownFieldError { path }.into(),
                Some(Rejection::FlattenedKey) => FlattenedFieldError { path }.into(),
                None => JsonDeserializationError { source }.into(),
            }
        })
    }

    /// Decode the first JSON value in `reader` and store it into `destination`.
    ///
    /// `destination` is left untouched if decoding fails.
    pub fn decode_into<T, R>(&self, reader: R, destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        *destination = self.decode(reader)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use ubyte::ToByteUnit;

    use super::{BodySizeLimit, JsonDecoder};
    use crate::config::DecoderConfig;
    use crate::errors::DecodeError;

    #[derive(serde::Deserialize, Debug, Default, PartialEq)]
    #[serde(default)]
    struct Owner {
        name: String,
        age: i32,
    }

    #[derive(serde::Deserialize, Debug, Default, PartialEq)]
    #[serde(default)]
    struct Listing {
        address: String,
        owner: Owner,
        labels: HashMap<String, String>,
        extra: Option<serde_json::Value>,
    }

    fn decode<T: serde::de::DeserializeOwned>(
        config: DecoderConfig,
        body: serde_json::Value,
    ) -> Result<T, DecodeError> {
        let body = serde_json::to_vec(&body).unwrap();
        JsonDecoder::new(config).decode(&body[..])
    }

    #[test]
    fn unknown_keys_are_ignored_by_default() {
        let listing: Listing = decode(
            DecoderConfig::default(),
            json!({"address": "Rome", "price": 10}),
        )
        .unwrap();
        assert_eq!(listing.address, "Rome");
    }

    #[test]
    fn unknown_keys_are_rejected_in_strict_mode() {
        let config = DecoderConfig::default().reject_unknown_input_keys(true);
        let err = decode::<Listing>(config, json!({"address": "Rome", "price": 10})).unwrap_err();
        let DecodeError::UnknownField(err) = &err else {
            panic!("Expected an unknown field error, got {err:?}");
        };
        assert_eq!(err.path, "price");
        insta::assert_snapshot!(err, @"The body contains a field that the destination doesn't know about: `price`.");
    }

    #[test]
    fn nested_unknown_keys_report_their_path() {
        let config = DecoderConfig::default().reject_unknown_input_keys(true);
        let err = decode::<Listing>(
            config,
            json!({"owner": {"name": "Ada", "nickname": "Countess"}}),
        )
        .unwrap_err();
        let DecodeError::UnknownField(err) = &err else {
            panic!("Expected an unknown field error, got {err:?}");
        };
        assert_eq!(err.path, "owner.nickname");
    }

    #[test]
    fn maps_accept_any_key_in_strict_mode() {
        let config = DecoderConfig::default().reject_unknown_input_keys(true);
        let listing: Listing =
            decode(config, json!({"labels": {"anything": "goes"}})).unwrap();
        assert_eq!(listing.labels["anything"], "goes");
    }

    #[test]
    fn dynamic_numbers_are_floats_by_default() {
        let listing: Listing = decode(
            DecoderConfig::default(),
            json!({"extra": {"id": 9007199254740993u64, "tags": [1, 2]}}),
        )
        .unwrap();
        let extra = listing.extra.unwrap();
        assert!(extra["id"].is_f64());
        assert_eq!(extra["id"].as_f64(), Some(9007199254740992.0));
        assert!(extra["tags"][0].is_f64());
    }

    #[test]
    fn dynamic_numbers_keep_their_precision_as_opaque_tokens() {
        let config = DecoderConfig::default().use_opaque_numeric_tokens(true);
        let listing: Listing = decode(
            config,
            json!({"extra": {"id": 9007199254740993u64, "tags": [1, 2]}}),
        )
        .unwrap();
        let extra = listing.extra.unwrap();
        assert_eq!(extra["id"].as_u64(), Some(9007199254740993));
        assert!(extra["tags"][0].is_u64());
    }

    #[test]
    fn opaque_tokens_keep_the_literal_text_of_every_number() {
        let config = DecoderConfig::default().use_opaque_numeric_tokens(true);
        let listing: Listing = JsonDecoder::new(config)
            .decode(&br#"{"extra": {"id": 123456789012345678901234567890, "p": 1.10}}"#[..])
            .unwrap();
        let extra = listing.extra.unwrap();
        assert_eq!(extra["id"].to_string(), "123456789012345678901234567890");
        assert_eq!(extra["p"].to_string(), "1.10");
    }

    #[test]
    fn numbers_beyond_64_bits_are_floats_by_default() {
        let listing: Listing = JsonDecoder::default()
            .decode(&br#"{"extra": {"id": 123456789012345678901234567890, "p": 1.10}}"#[..])
            .unwrap();
        let extra = listing.extra.unwrap();
        assert!(extra["id"].is_f64());
        assert_eq!(extra["id"].as_f64(), Some(123456789012345678901234567890.0));
        assert_eq!(extra["p"].as_f64(), Some(1.1));
    }

    #[derive(serde::Deserialize, Debug, Default)]
    #[serde(default)]
    struct Reading {
        ratio: f64,
        count: u64,
    }

    #[derive(serde::Deserialize, Debug, PartialEq)]
    #[serde(untagged)]
    enum Amount {
        Whole(u64),
        Fraction(f64),
    }

    #[derive(serde::Deserialize, Debug)]
    struct Sensor {
        #[serde(flatten)]
        reading: Reading,
        amount: Amount,
    }

    #[test]
    fn buffered_values_receive_plain_numbers() {
        for opaque in [false, true] {
            let config = DecoderConfig::default().use_opaque_numeric_tokens(opaque);
            let sensor: Sensor = JsonDecoder::new(config)
                .decode(&br#"{"ratio": 0.25, "count": 7, "amount": 2.5}"#[..])
                .unwrap();
            assert_eq!(sensor.reading.ratio, 0.25);
            assert_eq!(sensor.reading.count, 7);
            assert_eq!(sensor.amount, Amount::Fraction(2.5));
        }
    }

    #[derive(serde::Deserialize, Debug, Default)]
    #[serde(default)]
    struct Catalog {
        listing: Listing,
        attributes: Vec<serde_json::Value>,
        boxed: Option<Box<serde_json::Value>>,
    }

    #[test]
    fn dynamic_values_are_coerced_at_any_depth() {
        let catalog: Catalog = decode(
            DecoderConfig::default(),
            json!({
                "listing": {"extra": {"count": 3}},
                "attributes": [7, {"weight": 2}],
                "boxed": 5
            }),
        )
        .unwrap();
        assert!(catalog.listing.extra.unwrap()["count"].is_f64());
        assert!(catalog.attributes[0].is_f64());
        assert!(catalog.attributes[1]["weight"].is_f64());
        assert!(catalog.boxed.unwrap().is_f64());
    }

    #[derive(serde::Deserialize, Debug, Default)]
    #[serde(default)]
    struct Tagged {
        #[serde(flatten)]
        owner: Owner,
        code: String,
    }

    #[test]
    fn keys_collected_by_flattened_fields_are_rejected_in_strict_mode() {
        let config = DecoderConfig::default().reject_unknown_input_keys(true);
        let tagged: Tagged = decode(config, json!({"code": "A1"})).unwrap();
        assert_eq!(tagged.code, "A1");

        let err = decode::<Tagged>(config, json!({"code": "A1", "name": "Ada"})).unwrap_err();
        let DecodeError::FlattenedField(err) = &err else {
            panic!("Expected a flattened field error, got {err:?}");
        };
        assert_eq!(err.path, "name");
        insta::assert_snapshot!(err, @"The body contains a field that can't be checked against the destination: `name` is collected by a `#[serde(flatten)]` field.");

        let tagged: Tagged =
            decode(DecoderConfig::default(), json!({"code": "A1", "name": "Ada"})).unwrap();
        assert_eq!(tagged.owner.name, "Ada");
    }

    #[test]
    fn typed_numbers_are_never_coerced() {
        let listing: Listing =
            decode(DecoderConfig::default(), json!({"owner": {"age": 42}})).unwrap();
        assert_eq!(listing.owner.age, 42);
    }

    #[test]
    fn type_mismatches_point_at_the_offending_value() {
        let err = decode::<Listing>(
            DecoderConfig::default(),
            json!({"owner": {"age": "forty-two"}}),
        )
        .unwrap_err();
        let DecodeError::Deserialization(err) = &err else {
            panic!("Expected a deserialization error, got {err:?}");
        };
        assert_eq!(err.path().to_string(), "owner.age");
        assert!(err.inner().is_data());
    }

    #[test]
    fn truncated_documents_are_rejected() {
        let decoder = JsonDecoder::default();
        let err = decoder
            .decode::<Listing, _>(&br#"{"address": "Ro"#[..])
            .unwrap_err();
        let DecodeError::Deserialization(err) = &err else {
            panic!("Expected a deserialization error, got {err:?}");
        };
        assert!(err.inner().is_eof());
    }

    #[test]
    fn trailing_bytes_are_not_inspected() {
        let decoder = JsonDecoder::default();
        let listing: Listing = decoder
            .decode(&br#"{"address": "Rome"} trailing garbage"#[..])
            .unwrap();
        assert_eq!(listing.address, "Rome");
    }

    #[test]
    fn oversized_bodies_are_rejected() {
        let config = DecoderConfig::default().limit_body_size(BodySizeLimit::Enabled {
            max_size: 16.bytes(),
        });
        let err = decode::<Listing>(
            config,
            json!({"address": "a very long address that does not fit"}),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::SizeLimitExceeded(_)));
    }

    #[test]
    fn failed_decodes_leave_the_destination_untouched() {
        let mut listing = Listing {
            address: "Rome".into(),
            ..Default::default()
        };
        let decoder = JsonDecoder::default();
        assert!(decoder.decode_into(&b"not json"[..], &mut listing).is_err());
        assert_eq!(listing.address, "Rome");
    }
}
