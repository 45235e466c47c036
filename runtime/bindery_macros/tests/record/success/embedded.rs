use bindery::Record;

#[derive(Record, Default)]
pub struct Address {
    #[bind(default = "Rome")]
    city: String,
}

#[derive(Record, Default)]
pub struct Customer {
    #[bind(embedded)]
    billing: Address,
    #[bind(embedded)]
    shipping: Option<Address>,
    #[bind(embedded)]
    fallback: Box<Address>,
}

fn main() {
    let mut customer = Customer {
        shipping: Some(Address::default()),
        ..Default::default()
    };
    bindery::record::apply_defaults(&mut customer).unwrap();
    assert_eq!(customer.billing.city, "Rome");
    assert_eq!(customer.shipping.unwrap().city, "Rome");
    assert_eq!(customer.fallback.city, "Rome");
}
