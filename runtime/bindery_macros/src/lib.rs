use proc_macro::TokenStream;

mod record;

#[proc_macro_derive(Record, attributes(bind))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
