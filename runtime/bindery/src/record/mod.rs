//! Describe the shape of a record so that defaults can be injected into it.
//!
//! # Overview
//!
//! The default injector never inspects a record directly.
//! It works off a _capability table_: the list of fields that may receive a default,
//! each paired with a typed mutable slot pointing into the record.
//! That table is exposed via the [`Record`] trait.
//!
//! You'll rarely implement [`Record`] by hand: `#[derive(Record)]` generates the table
//! from `#[bind(..)]` attributes.
//!
//! ```rust
//! use bindery::Record;
//!
//! #[derive(Record, Default)]
//! pub struct Base {
//!     #[bind(default = "eu-west-1")]
//!     region: String,
//! }
//!
//! #[derive(Record, Default)]
//! pub struct Signup {
//!     #[bind(default = "18")]
//!     age: i32,
//!     #[bind(embedded)]
//!     base: Base,
//!     // Not annotated: invisible to the default injector.
//!     email: String,
//! }
//!
//! let mut signup = Signup::default();
//! bindery::record::apply_defaults(&mut signup).unwrap();
//! assert_eq!(signup.age, 18);
//! assert_eq!(signup.base.region, "eu-west-1");
//! ```
//!
//! # Field kinds
//!
//! The kind of a field determines both its zero value and how its default literal is parsed.
//! See [`FieldSlot`] for the full list.
//! Fields whose kind isn't supported keep their annotation, but it's silently ignored.
pub use defaults::apply_defaults;

mod defaults;

/// A record whose fields can receive declared default values.
///
/// # Implementing `Record` by hand
///
/// Return one [`Field`] per annotated field, in declaration order:
///
/// ```rust
/// use bindery::record::{Field, Record, Slot};
///
/// pub struct Pagination {
///     page_size: i32,
///     cursor: Option<String>,
/// }
///
/// impl Record for Pagination {
///     fn fields(&mut self) -> Vec<Field<'_>> {
///         vec![
///             Field::new("page_size", self.page_size.slot()).default_literal("50"),
///             Field::new("cursor", self.cursor.slot()).default_literal("start"),
///         ]
///     }
/// }
/// ```
pub trait Record {
    /// The fields of this record that the default injector should look at.
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// An empty indirection exposes no fields.
impl<R: Record> Record for Option<R> {
    fn fields(&mut self) -> Vec<Field<'_>> {
        match self {
            Some(record) => record.fields(),
            None => Vec::new(),
        }
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn fields(&mut self) -> Vec<Field<'_>> {
        (**self).fields()
    }
}

macro_rules! no_fields {
    ($(impl$(<$($param:ident),*>)? for $ty:ty),* $(,)?) => {
        $(
            /// Not a record: there is nothing to default.
            /// Elements and entries are left as decoded.
            impl$(<$($param),*>)? Record for $ty {
                fn fields(&mut self) -> Vec<Field<'_>> {
                    Vec::new()
                }
            }
        )*
    };
}

no_fields!(
    impl<T> for Vec<T>,
    impl<K, V, S> for std::collections::HashMap<K, V, S>,
    impl<K, V> for std::collections::BTreeMap<K, V>,
    impl for serde_json::Value,
);

/// A single entry of a record's capability table.
#[derive(Debug)]
pub struct Field<'a> {
    name: &'static str,
    default: Option<&'static str>,
    slot: FieldSlot<'a>,
}

impl<'a> Field<'a> {
    /// A field named `name`, backed by `slot`, without a default annotation.
    pub fn new(name: &'static str, slot: FieldSlot<'a>) -> Self {
        Self {
            name,
            default: None,
            slot,
        }
    }

    /// An embedded sub-record, whose own fields will be visited recursively.
    pub fn embedded(name: &'static str, record: &'a mut dyn Record) -> Self {
        Self::new(name, FieldSlot::Record(record))
    }

    /// Attach a default annotation to this field.
    pub fn default_literal(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    /// The name of the field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The literal carried by the default annotation, if any.
    pub fn default(&self) -> Option<&'static str> {
        self.default
    }

    /// The kind of the field.
    pub fn kind(&self) -> FieldKind {
        self.slot.kind()
    }

    pub(crate) fn into_slot(self) -> FieldSlot<'a> {
        self.slot
    }
}

/// A typed, mutable view over the storage of a field.
///
/// The variant determines the zero value used to detect an unset field,
/// as well as the way a default literal is parsed.
#[non_exhaustive]
pub enum FieldSlot<'a> {
    /// Zero value: `0`. Defaults are parsed as base-10 32-bit integers.
    Int32(&'a mut i32),
    /// Zero value: `""`. Defaults are used verbatim.
    String(&'a mut String),
    /// Zero value: `None`. An explicit `0` in the input is preserved.
    OptionalInt32(&'a mut Option<i32>),
    /// Zero value: `None`. An explicit `""` in the input is preserved.
    OptionalString(&'a mut Option<String>),
    /// An embedded record. It is never defaulted as a whole, its fields are.
    Record(&'a mut dyn Record),
    /// A kind that doesn't support defaults. Carries the name of the Rust type.
    Unsupported(&'static str),
}

impl FieldSlot<'_> {
    /// The kind of the underlying field.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldSlot::Int32(_) => FieldKind::Int32,
            FieldSlot::String(_) => FieldKind::String,
            FieldSlot::OptionalInt32(_) => FieldKind::OptionalInt32,
            FieldSlot::OptionalString(_) => FieldKind::OptionalString,
            FieldSlot::Record(_) => FieldKind::Record,
            FieldSlot::Unsupported(type_name) => FieldKind::Unsupported(type_name),
        }
    }

    /// Returns `true` if the field holds the zero value for its kind.
    ///
    /// Records and unsupported kinds are never considered to be at their zero value.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldSlot::Int32(v) => **v == 0,
            FieldSlot::String(v) => v.is_empty(),
            FieldSlot::OptionalInt32(v) => v.is_none(),
            FieldSlot::OptionalString(v) => v.is_none(),
            FieldSlot::Record(_) | FieldSlot::Unsupported(_) => false,
        }
    }
}

impl std::fmt::Debug for FieldSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldSlot::Int32(v) => f.debug_tuple("Int32").field(v).finish(),
            FieldSlot::String(v) => f.debug_tuple("String").field(v).finish(),
            FieldSlot::OptionalInt32(v) => f.debug_tuple("OptionalInt32").field(v).finish(),
            FieldSlot::OptionalString(v) => f.debug_tuple("OptionalString").field(v).finish(),
            FieldSlot::Record(_) => f.write_str("Record(..)"),
            FieldSlot::Unsupported(t) => f.debug_tuple("Unsupported").field(t).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
/// The kind of a [`Field`], detached from its storage.
pub enum FieldKind {
    Int32,
    String,
    OptionalInt32,
    OptionalString,
    Record,
    Unsupported(&'static str),
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Int32 => f.write_str("i32"),
            FieldKind::String => f.write_str("String"),
            FieldKind::OptionalInt32 => f.write_str("Option<i32>"),
            FieldKind::OptionalString => f.write_str("Option<String>"),
            FieldKind::Record => f.write_str("record"),
            FieldKind::Unsupported(type_name) => f.write_str(type_name),
        }
    }
}

/// Expose a field's storage as a [`FieldSlot`].
///
/// `#[derive(Record)]` requires every field carrying `#[bind(default = "..")]`
/// to implement this trait.
/// Implement it for your own types, returning [`FieldSlot::Unsupported`],
/// if you want to annotate them without a compile error.
pub trait Slot {
    /// A mutable view over `self`.
    fn slot(&mut self) -> FieldSlot<'_>;
}

impl Slot for i32 {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Int32(self)
    }
}

impl Slot for String {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::String(self)
    }
}

impl Slot for Option<i32> {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::OptionalInt32(self)
    }
}

impl Slot for Option<String> {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::OptionalString(self)
    }
}

macro_rules! unsupported_slot {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Slot for $ty {
                fn slot(&mut self) -> FieldSlot<'_> {
                    FieldSlot::Unsupported(std::any::type_name::<$ty>())
                }
            }
        )*
    };
}

unsupported_slot!(
    bool, char, i8, i16, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    Option<bool>, Option<char>, Option<i8>, Option<i16>, Option<i64>, Option<i128>,
    Option<isize>, Option<u8>, Option<u16>, Option<u32>, Option<u64>, Option<u128>,
    Option<usize>, Option<f32>, Option<f64>,
    serde_json::Value,
);

impl<T> Slot for Vec<T> {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported(std::any::type_name::<Self>())
    }
}

impl<K, V, S> Slot for std::collections::HashMap<K, V, S> {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported(std::any::type_name::<Self>())
    }
}

impl<K, V> Slot for std::collections::BTreeMap<K, V> {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported(std::any::type_name::<Self>())
    }
}
