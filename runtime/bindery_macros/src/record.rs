//! A derive macro for implementing the `Record` trait for structs with named fields.
use darling::{
    FromDeriveInput, FromField,
    util::{Flag, Ignored},
};
use proc_macro::TokenStream;
use quote::{quote, quote_spanned};
use syn::{DeriveInput, Ident, Type, ext::IdentExt, parse_macro_input, parse_quote, spanned::Spanned};

#[derive(FromDeriveInput)]
#[darling(supports(struct_named))]
struct RecordInput {
    ident: Ident,
    generics: syn::Generics,
    data: darling::ast::Data<Ignored, RecordField>,
}

#[derive(FromField)]
#[darling(attributes(bind))]
struct RecordField {
    ident: Option<Ident>,
    ty: Type,
    /// `#[bind(default = "...")]`
    default: Option<String>,
    /// `#[bind(embedded)]`
    embedded: Flag,
}

// What we actually want to use in codegen per field.
enum FieldRole<'a> {
    Default(&'a str),
    Embedded,
}

impl RecordField {
    fn role(&self) -> darling::Result<Option<FieldRole<'_>>> {
        match (&self.default, self.embedded.is_present()) {
            (Some(_), true) => Err(darling::Error::custom(
                "A field can either declare a default value or be an embedded record, not both.\n\
                 Defaults for an embedded record belong on the fields of the embedded type.",
            )
            .with_span(&self.ident)),
            (Some(literal), false) => Ok(Some(FieldRole::Default(literal))),
            (None, true) => Ok(Some(FieldRole::Embedded)),
            (None, false) => Ok(None),
        }
    }
}

pub(super) fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match _derive_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}

fn _derive_record(input: DeriveInput) -> Result<proc_macro2::TokenStream, darling::Error> {
    let input = RecordInput::from_derive_input(&input)?;
    let Some(fields) = input.data.take_struct() else {
        // Unreachable: `darling` rejects every shape other than structs with named fields.
        return Err(darling::Error::unsupported_shape("enum"));
    };

    let mut errors = darling::Error::accumulator();
    let mut entries = Vec::new();
    let mut bounds: Vec<syn::WherePredicate> = Vec::new();
    for field in fields.iter() {
        let Some(role) = errors.handle(field.role()) else {
            continue;
        };
        let Some(role) = role else {
            continue;
        };
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.unraw().to_string();
        let ty = &field.ty;
        let ty_span = ty.span();
        match role {
            FieldRole::Default(literal) => {
                bounds.push(parse_quote! { #ty: ::bindery::record::Slot });
                entries.push(quote_spanned! { ty_span =>
                    ::bindery::record::Field::new(
                        #name,
                        ::bindery::record::Slot::slot(&mut self.#ident),
                    )
                    .default_literal(#literal)
                });
            }
            FieldRole::Embedded => {
                bounds.push(parse_quote! { #ty: ::bindery::record::Record });
                entries.push(quote_spanned! { ty_span =>
                    ::bindery::record::Field::embedded(#name, &mut self.#ident)
                });
            }
        }
    }
    errors.finish()?;

    let struct_ident = &input.ident;
    let mut generics = input.generics.clone();
    // Bounds on concrete field types are trivially satisfied, or fail anyway when the
    // slot is built. They only matter when the field type depends on a type parameter.
    if generics.type_params().next().is_some() {
        generics.make_where_clause().predicates.extend(bounds);
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::bindery::record::Record for #struct_ident #ty_generics #where_clause {
            fn fields(&mut self) -> ::std::vec::Vec<::bindery::record::Field<'_>> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}
