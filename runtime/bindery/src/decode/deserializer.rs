//! A pass-through deserializer that enforces the runtime decoding toggles.
//!
//! `serde_json` only exposes those behaviours at compile time (`arbitrary_precision`,
//! `#[serde(deny_unknown_fields)]`), so we interpose between the destination type and
//! the underlying deserializer instead.
//! Every visitor, seed and accessor handed out by the inner deserializer is wrapped,
//! so that the toggles apply at every nesting level.
//!
//! `serde_json` is built with `arbitrary_precision`: numbers that don't fit a 64-bit
//! integer reach `deserialize_any` visitors as a single-entry map, keyed by
//! [`NUMBER_TOKEN`] and carrying the literal text. Only dynamic slots with opaque tokens
//! enabled get to see that map. Everybody else gets an `f64`, as they would without the feature.
use std::any::TypeId;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};

use crate::config::DecoderConfig;

/// The key `serde_json` uses for numbers kept in their textual form.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Why a decode was aborted by the wrapper rather than by the destination type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Rejection {
    /// A key matched none of the fields of its destination.
    UnknownKey,
    /// A key was handed over to a `#[serde(flatten)]` field, where it can't be checked.
    FlattenedKey,
}

/// State shared by all the wrappers involved in a single decode.
pub(super) struct Session {
    coerce_numbers: bool,
    reject_unknown_keys: bool,
    rejection: Cell<Option<Rejection>>,
    // Set by the key of a struct-like map when it's deserialized as an identifier.
    identifier_key: Cell<bool>,
}

impl Session {
    pub(super) fn new(config: &DecoderConfig) -> Self {
        Self {
            coerce_numbers: !config.uses_opaque_numeric_tokens(),
            reject_unknown_keys: config.rejects_unknown_input_keys(),
            rejection: Cell::new(None),
            identifier_key: Cell::new(false),
        }
    }

    /// The reason the decode was aborted by the wrapper, if it was.
    pub(super) fn rejection(&self) -> Option<Rejection> {
        self.rejection.get()
    }

    fn reject<E: de::Error>(&self, rejection: Rejection) -> E {
        self.rejection.set(Some(rejection));
        match rejection {
            Rejection::UnknownKey => E::custom("unknown field"),
            Rejection::FlattenedKey => E::custom("field collected by a flattened field"),
        }
    }
}

/// Numbers are only coerced when they land in a dynamic JSON value.
fn is_dynamic<T: ?Sized>() -> bool {
    type_id::<T>() == TypeId::of::<serde_json::Value>()
}

trait TypeIdOf {
    fn type_id_of(&self) -> TypeId
    where
        Self: 'static;
}

impl<T: ?Sized> TypeIdOf for PhantomData<T> {
    fn type_id_of(&self) -> TypeId
    where
        Self: 'static,
    {
        TypeId::of::<T>()
    }
}

/// [`TypeId::of`] for types that may borrow from the input.
///
/// Lifetime parameters don't take part in a `TypeId`, so `Content<'de>` and
/// `Content<'static>` share one.
fn type_id<T: ?Sized>() -> TypeId {
    let marker = PhantomData::<T>;
    let marker: &dyn TypeIdOf = &marker;
    // SAFETY: `type_id_of` never reads through `self`. Widening the lifetime of the
    // trait object only affects lifetime parameters, which `TypeId` erases.
    let marker =
        unsafe { std::mem::transmute::<&dyn TypeIdOf, &(dyn TypeIdOf + 'static)>(marker) };
    marker.type_id_of()
}

/// Where the wrapped deserializer sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Anywhere,
    /// The key of a map requested via `deserialize_map`.
    MapKey,
    /// The value that follows a [`Position::MapKey`] read as a struct field identifier.
    FieldValue,
}

/// How numbers reach the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numbers {
    /// The destination asked for a specific shape. No textual number can show up.
    Typed,
    /// `deserialize_any` on a typed destination: textual numbers become `f64`s.
    Native,
    /// A dynamic slot with coercion on: every number becomes an `f64`.
    Float,
    /// A dynamic slot with opaque tokens on: textual numbers are passed through.
    Exact,
}

pub(super) struct Wrap<'s, D> {
    inner: D,
    session: &'s Session,
    position: Position,
}

impl<'s, D> Wrap<'s, D> {
    pub(super) fn new(inner: D, session: &'s Session) -> Self {
        Self {
            inner,
            session,
            position: Position::Anywhere,
        }
    }

    fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

macro_rules! forward_deserialize {
    ($($method:ident),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                self.inner
                    .$method(WrapVisitor::new(visitor, self.session, Numbers::Typed))
            }
        )*
    };
}

impl<'s, 'de, D> Deserializer<'de> for Wrap<'s, D>
where
    D: Deserializer<'de>,
{
    type Error = D::Error;

    forward_deserialize!(
        deserialize_bool,
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_i128,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_u128,
        deserialize_f32,
        deserialize_f64,
        deserialize_char,
        deserialize_str,
        deserialize_string,
        deserialize_bytes,
        deserialize_byte_buf,
        deserialize_option,
        deserialize_unit,
        deserialize_seq,
    );

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let dynamic = is_dynamic::<V::Value>();
        // A struct field value asked for "anything" that isn't a JSON value is being
        // buffered for a `#[serde(flatten)]` field. Whether its key is known is decided
        // out of our sight.
        if self.position == Position::FieldValue && self.session.reject_unknown_keys && !dynamic {
            return Err(self.session.reject(Rejection::FlattenedKey));
        }
        let numbers = match (dynamic, self.session.coerce_numbers) {
            (false, _) => Numbers::Native,
            (true, true) => Numbers::Float,
            (true, false) => Numbers::Exact,
        };
        self.inner
            .deserialize_any(WrapVisitor::new(visitor, self.session, numbers))
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // Destination types ask to skip a value when its key matched none of their fields.
        if self.session.reject_unknown_keys {
            return Err(self.session.reject(Rejection::UnknownKey));
        }
        self.inner.deserialize_ignored_any(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner
            .deserialize_map(WrapVisitor::new(visitor, self.session, Numbers::Typed).open_map())
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        if self.position == Position::MapKey {
            self.session.identifier_key.set(true);
        }
        self.inner
            .deserialize_identifier(WrapVisitor::new(visitor, self.session, Numbers::Typed))
    }

    fn deserialize_unit_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner.deserialize_unit_struct(
            name,
            WrapVisitor::new(visitor, self.session, Numbers::Typed),
        )
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner.deserialize_newtype_struct(
            name,
            WrapVisitor::new(visitor, self.session, Numbers::Typed),
        )
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner
            .deserialize_tuple(len, WrapVisitor::new(visitor, self.session, Numbers::Typed))
    }

    fn deserialize_tuple_struct<V>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner.deserialize_tuple_struct(
            name,
            len,
            WrapVisitor::new(visitor, self.session, Numbers::Typed),
        )
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner.deserialize_struct(
            name,
            fields,
            WrapVisitor::new(visitor, self.session, Numbers::Typed),
        )
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner.deserialize_enum(
            name,
            variants,
            WrapVisitor::new(visitor, self.session, Numbers::Typed),
        )
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}

struct WrapVisitor<'s, V> {
    inner: V,
    session: &'s Session,
    numbers: Numbers,
    open_map: bool,
}

impl<'s, V> WrapVisitor<'s, V> {
    fn new(inner: V, session: &'s Session, numbers: Numbers) -> Self {
        Self {
            inner,
            session,
            numbers,
            open_map: false,
        }
    }

    /// The visitor was handed to `deserialize_map`: its keys are tracked.
    fn open_map(mut self) -> Self {
        self.open_map = true;
        self
    }
}

macro_rules! visit_integer {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<E>(self, v: $ty) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if self.numbers == Numbers::Float {
                    self.inner.visit_f64(v as f64)
                } else {
                    self.inner.$method(v)
                }
            }
        )*
    };
}

macro_rules! forward_visit {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<E>(self, v: $ty) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.inner.$method(v)
            }
        )*
    };
}

impl<'s, 'de, V> Visitor<'de> for WrapVisitor<'s, V>
where
    V: Visitor<'de>,
{
    type Value = V::Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        self.inner.expecting(formatter)
    }

    visit_integer!(
        visit_i8: i8,
        visit_i16: i16,
        visit_i32: i32,
        visit_i64: i64,
        visit_i128: i128,
        visit_u8: u8,
        visit_u16: u16,
        visit_u32: u32,
        visit_u64: u64,
        visit_u128: u128,
    );

    forward_visit!(
        visit_bool: bool,
        visit_f32: f32,
        visit_f64: f64,
        visit_char: char,
        visit_str: &str,
        visit_string: String,
        visit_bytes: &[u8],
        visit_byte_buf: Vec<u8>,
        visit_borrowed_str: &'de str,
        visit_borrowed_bytes: &'de [u8],
    );

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        self.inner.visit_none()
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        self.inner.visit_unit()
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.inner
            .visit_some(Wrap::new(deserializer, self.session))
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.inner
            .visit_newtype_struct(Wrap::new(deserializer, self.session))
    }

    fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        self.inner.visit_seq(WrapAccess::new(seq, self.session))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let session = self.session;
        match self.numbers {
            Numbers::Typed if self.open_map => self.inner.visit_map(WrapAccess::open(map, session)),
            Numbers::Typed | Numbers::Exact => {
                self.inner.visit_map(WrapAccess::new(map, session))
            }
            Numbers::Native | Numbers::Float => {
                let first = map.next_key::<String>()?;
                if first.as_deref() != Some(NUMBER_TOKEN) {
                    return self
                        .inner
                        .visit_map(WrapAccess::new(Replay::new(first, map), session));
                }
                let literal: String = map.next_value()?;
                let number = literal.parse::<f64>().map_err(|_| {
                    de::Error::invalid_value(Unexpected::Str(&literal), &"a JSON number")
                })?;
                self.inner.visit_f64(number)
            }
        }
    }

    fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        self.inner.visit_enum(WrapAccess::new(data, self.session))
    }
}

/// A map whose first key has already been consumed.
struct Replay<A> {
    first: Option<String>,
    done: bool,
    inner: A,
}

impl<A> Replay<A> {
    fn new(first: Option<String>, inner: A) -> Self {
        Self {
            done: first.is_none(),
            first,
            inner,
        }
    }
}

impl<'de, A> MapAccess<'de> for Replay<A>
where
    A: MapAccess<'de>,
{
    type Error = A::Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        if self.done {
            return Ok(None);
        }
        match self.first.take() {
            Some(key) => seed
                .deserialize(<String as IntoDeserializer<'de, A::Error>>::into_deserializer(key))
                .map(Some),
            None => self.inner.next_key_seed(seed),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        self.inner.next_value_seed(seed)
    }

    fn size_hint(&self) -> Option<usize> {
        self.inner
            .size_hint()
            .map(|n| n + usize::from(self.first.is_some()))
    }
}

/// Wraps sequence, map, enum and variant accessors.
struct WrapAccess<'s, A> {
    inner: A,
    session: &'s Session,
    open: bool,
    identifier_key: bool,
}

impl<'s, A> WrapAccess<'s, A> {
    fn new(inner: A, session: &'s Session) -> Self {
        Self {
            inner,
            session,
            open: false,
            identifier_key: false,
        }
    }

    /// A map requested via `deserialize_map`.
    /// Struct fields show up here when the struct has a `#[serde(flatten)]` field.
    fn open(inner: A, session: &'s Session) -> Self {
        Self {
            open: true,
            ..Self::new(inner, session)
        }
    }
}

impl<'s, 'de, A> SeqAccess<'de> for WrapAccess<'s, A>
where
    A: SeqAccess<'de>,
{
    type Error = A::Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        self.inner
            .next_element_seed(WrapSeed::new(seed, self.session))
    }

    fn size_hint(&self) -> Option<usize> {
        self.inner.size_hint()
    }
}

impl<'s, 'de, A> MapAccess<'de> for WrapAccess<'s, A>
where
    A: MapAccess<'de>,
{
    type Error = A::Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        if !self.open {
            return self.inner.next_key_seed(WrapSeed::new(seed, self.session));
        }
        self.session.identifier_key.set(false);
        let key = self
            .inner
            .next_key_seed(WrapSeed::new(seed, self.session).at(Position::MapKey))?;
        self.identifier_key = self.session.identifier_key.replace(false);
        Ok(key)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let position = if self.identifier_key {
            Position::FieldValue
        } else {
            Position::Anywhere
        };
        self.inner
            .next_value_seed(WrapSeed::new(seed, self.session).at(position))
    }

    fn size_hint(&self) -> Option<usize> {
        self.inner.size_hint()
    }
}

impl<'s, 'de, A> EnumAccess<'de> for WrapAccess<'s, A>
where
    A: EnumAccess<'de>,
{
    type Error = A::Error;
    type Variant = WrapAccess<'s, A::Variant>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let session = self.session;
        let (value, variant) = self.inner.variant_seed(WrapSeed::new(seed, session))?;
        Ok((value, WrapAccess::new(variant, session)))
    }
}

impl<'s, 'de, A> VariantAccess<'de> for WrapAccess<'s, A>
where
    A: VariantAccess<'de>,
{
    type Error = A::Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        self.inner.unit_variant()
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        self.inner
            .newtype_variant_seed(WrapSeed::new(seed, self.session))
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner
            .tuple_variant(len, WrapVisitor::new(visitor, self.session, Numbers::Typed))
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.inner
            .struct_variant(fields, WrapVisitor::new(visitor, self.session, Numbers::Typed))
    }
}

struct WrapSeed<'s, S> {
    inner: S,
    session: &'s Session,
    position: Position,
}

impl<'s, S> WrapSeed<'s, S> {
    fn new(inner: S, session: &'s Session) -> Self {
        Self {
            inner,
            session,
            position: Position::Anywhere,
        }
    }

    fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

impl<'s, 'de, S> DeserializeSeed<'de> for WrapSeed<'s, S>
where
    S: DeserializeSeed<'de>,
{
    type Value = S::Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.inner
            .deserialize(Wrap::new(deserializer, self.session).at(self.position))
    }
}
