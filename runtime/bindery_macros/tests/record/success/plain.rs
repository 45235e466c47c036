use bindery::Record;

#[derive(Record, Default)]
pub struct Signup {
    #[bind(default = "18")]
    age: i32,
    #[bind(default = "anonymous")]
    name: String,
    #[bind(default = "10")]
    limit: Option<i32>,
    #[bind(default = "asc")]
    order: Option<String>,
    email: String,
}

fn main() {
    let mut signup = Signup::default();
    bindery::record::apply_defaults(&mut signup).unwrap();
    assert_eq!(signup.age, 18);
    assert_eq!(signup.name, "anonymous");
    assert_eq!(signup.limit, Some(10));
    assert_eq!(signup.order.as_deref(), Some("asc"));
    assert!(signup.email.is_empty());
}
