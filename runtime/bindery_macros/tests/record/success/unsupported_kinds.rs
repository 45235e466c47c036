use bindery::Record;
use bindery::record::{FieldSlot, Slot};

#[derive(Default)]
pub struct Percentage(f64);

impl Slot for Percentage {
    fn slot(&mut self) -> FieldSlot<'_> {
        FieldSlot::Unsupported(std::any::type_name::<Self>())
    }
}

#[derive(Record, Default)]
pub struct Settings {
    #[bind(default = "true")]
    enabled: bool,
    #[bind(default = "0.5")]
    ratio: Percentage,
    #[bind(default = "[]")]
    tags: Vec<String>,
    #[bind(default = "kind")]
    r#type: String,
}

fn main() {
    let mut settings = Settings::default();
    bindery::record::apply_defaults(&mut settings).unwrap();
    assert!(!settings.enabled);
    assert_eq!(settings.ratio.0, 0.0);
    assert!(settings.tags.is_empty());
    assert_eq!(settings.r#type, "kind");
}
