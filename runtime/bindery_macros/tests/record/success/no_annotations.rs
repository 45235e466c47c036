#[derive(bindery::Record, Default)]
pub struct Opaque {
    id: u64,
    name: String,
}

fn main() {
    let mut opaque = Opaque::default();
    bindery::record::apply_defaults(&mut opaque).unwrap();
    assert_eq!(opaque.id, 0);
    assert!(opaque.name.is_empty());
}
