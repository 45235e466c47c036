use bindery::Record;
use bindery::record::Slot;

#[derive(Record, Default)]
pub struct Page<T, M> {
    #[bind(default = "25")]
    size: T,
    #[bind(embedded)]
    meta: M,
}

#[derive(Record, Default)]
pub struct Meta {
    #[bind(default = "v1")]
    version: String,
}

fn assert_record<R: bindery::record::Record>(_: &R) {}

fn populate<T: Slot + Default>() -> Page<T, Meta> {
    let mut page = Page::<T, Meta>::default();
    assert_record(&page);
    bindery::record::apply_defaults(&mut page).unwrap();
    page
}

fn main() {
    let page = populate::<i32>();
    assert_eq!(page.size, 25);
    assert_eq!(page.meta.version, "v1");
}
