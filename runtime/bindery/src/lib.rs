//! # Bindery
//!
//! Populate typed records from incoming JSON data.
//!
//! Binding a record is a three-stage pipeline:
//!
//! 1. the input is [decoded](decode) into the record;
//! 2. fields left at their zero value receive their [declared defaults](record),
//!    recursing into embedded records;
//! 3. the populated record is [validated](validation).
//!
//! The first stage to fail aborts the pipeline.
//! Check out [`binding`] for the entrypoint, and [`config`] to tune the decoder.
//!
//! ```rust
//! use bindery::binding::bind_json;
//!
//! #[derive(bindery::Record, serde::Deserialize, Default)]
//! #[serde(default)]
//! pub struct Signup {
//!     #[bind(default = "18")]
//!     age: i32,
//!     #[bind(default = "en")]
//!     locale: String,
//! }
//!
//! let mut signup = Signup::default();
//! bind_json(br#"{"locale": "it"}"#, &mut signup).unwrap();
//! assert_eq!(signup.age, 18);
//! assert_eq!(signup.locale, "it");
//! ```

// Let `#[derive(Record)]` refer to `::bindery` from within this crate too.
extern crate self as bindery;

/// Derive an implementation of [`Record`](record::Record) for a struct with named fields.
///
/// Annotate the fields the default injector should look at:
///
/// - `#[bind(default = "..")]` declares the default literal for the field.
///   The field type must implement [`Slot`](record::Slot);
/// - `#[bind(embedded)]` marks a field whose type is itself a [`Record`](record::Record):
///   its own defaults are applied recursively.
///
/// Fields without a `#[bind]` attribute are ignored.
pub use bindery_macros::Record;

pub mod binding;
pub mod config;
pub mod decode;
pub mod errors;
pub mod record;
pub mod validation;
