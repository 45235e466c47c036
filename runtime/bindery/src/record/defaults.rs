use std::num::ParseIntError;

use crate::errors::DefaultError;

use super::{FieldSlot, Record};

/// Fill every field left at its zero value with its declared default.
///
/// Fields are visited in declaration order.
/// Embedded records are visited depth-first, as soon as they are encountered.
///
/// The walk stops at the first default literal that can't be parsed into the kind of its field:
/// fields that come after it are left untouched.
/// Annotations on fields whose kind doesn't support defaults are ignored.
pub fn apply_defaults<R>(record: &mut R) -> Result<(), DefaultError>
where
    R: Record + ?Sized,
{
    let span = tracing::trace_span!(
        "Applying default values",
        record = std::any::type_name::<R>()
    );
    let _guard = span.enter();
    walk(record, None)
}

fn walk<R>(record: &mut R, prefix: Option<&str>) -> Result<(), DefaultError>
where
    R: Record + ?Sized,
{
    for field in record.fields() {
        let (name, default, kind) = (field.name(), field.default(), field.kind());
        let path = || match prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_owned(),
        };
        match field.into_slot() {
            FieldSlot::Record(embedded) => walk(embedded, Some(&path()))?,
            FieldSlot::Unsupported(_) => {
                if default.is_some() {
                    tracing::trace!(
                        field = %path(),
                        field_type = %kind,
                        "Fields of this type can't be defaulted, ignoring the annotation"
                    );
                }
            }
            slot => {
                let Some(literal) = default else {
                    continue;
                };
                if !slot.is_zero() {
                    continue;
                }
                assign(slot, literal).map_err(|source| DefaultError {
                    field: path(),
                    literal: literal.to_owned(),
                    source,
                })?;
                tracing::trace!(
                    field = %path(),
                    field_type = %kind,
                    default = literal,
                    "Applied default value"
                );
            }
        }
    }
    Ok(())
}

fn assign(slot: FieldSlot<'_>, literal: &str) -> Result<(), ParseIntError> {
    match slot {
        FieldSlot::Int32(v) => *v = literal.parse()?,
        FieldSlot::OptionalInt32(v) => *v = Some(literal.parse()?),
        FieldSlot::String(v) => *v = literal.to_owned(),
        FieldSlot::OptionalString(v) => *v = Some(literal.to_owned()),
        FieldSlot::Record(_) | FieldSlot::Unsupported(_) => {}
    }
    Ok(())
}
