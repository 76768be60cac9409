use mapgen_core::{MapperConfiguration, MappingError};
use mapgen_fixtures::profiles::{LegacyProfile, OrderProfile, UserProfile};
use mapgen_fixtures::*;

fn mk_user() -> User {
    User {
        id: 42,
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        age: None,
        address: Some(Address { street: "1 Analytical Way".into(), city: "London".into() }),
        tags: vec!["admin".into(), "beta".into()],
    }
}

fn mk_order() -> Order {
    Order {
        id: 7,
        items: vec![
            LineItem { sku: "A-1".into(), qty: 2 },
            LineItem { sku: "B-2".into(), qty: 3 },
        ],
        note: None,
    }
}

fn mk_config() -> MapperConfiguration {
    let mut config = MapperConfiguration::new();
    config.add_profile(&UserProfile).add_profile(&OrderProfile).add_profile(&LegacyProfile);
    config
}

#[test]
fn same_named_and_bound_members_are_copied() {
    let mapper = UserProfileMapper::new();
    let dto = mapper.map_user_to_user_dto(&mk_user());

    assert_eq!(dto.user_id, 42);
    assert_eq!(dto.full_name, "Ada Lovelace");
    assert_eq!(dto.email, "ada@example.com");
    assert_eq!(dto.tags, vec!["admin".to_string(), "beta".to_string()]);
    assert_eq!(dto.internal_note, "");
}

#[test]
fn optional_source_unwraps_to_default() {
    let mapper = UserProfileMapper::new();
    let mut user = mk_user();
    assert_eq!(mapper.map_user_to_user_dto(&user).age, 0);

    user.age = Some(36);
    assert_eq!(mapper.map_user_to_user_dto(&user).age, 36);
}

#[test]
fn nested_values_go_through_their_own_mapping() {
    let mapper = UserProfileMapper::new();
    let mut user = mk_user();

    let dto = mapper.map_user_to_user_dto(&user);
    assert_eq!(
        dto.address,
        Some(AddressDto { street: "1 Analytical Way".into(), city: "London".into() })
    );

    user.address = None;
    assert_eq!(mapper.map_user_to_user_dto(&user).address, None);
}

#[test]
fn mapping_into_an_existing_value_keeps_unassigned_members() {
    let mapper = UserProfileMapper::new();
    let mut dto = UserDto { internal_note: "keep me".into(), age: 99, ..Default::default() };

    mapper.map_user_into_user_dto(&mk_user(), &mut dto);
    assert_eq!(dto.internal_note, "keep me");
    assert_eq!(dto.user_id, 42);
    assert_eq!(dto.age, 0);
}

#[test]
fn conditions_guard_assignments() {
    let mapper = UserProfileMapper::new();

    let view = mapper.map_product_to_product_view(&Product {
        name: "lamp".into(),
        price: 19.5,
        discount: Some(2.0),
    });
    assert_eq!(view.price, 19.5);
    assert!(view.discounted);

    let view = mapper.map_product_to_product_view(&Product { name: "gift".into(), price: -1.0, discount: None });
    assert_eq!(view.price, 0.0);
    assert!(!view.discounted);

    let mut existing = ProductView { price: 5.0, ..Default::default() };
    mapper.map_product_into_product_view(&Product::default(), &mut existing);
    assert_eq!(existing.price, 5.0);
}

#[test]
fn hooks_run_before_and_after_assignments() {
    let mapper = UserProfileMapper::from_config(&mk_config());
    let customer = Customer { id: 7, name: "Grace".into() };

    let card = mapper.map_customer_to_customer_card(&customer);
    assert_eq!(card.name, "Grace");
    assert_eq!(card.trail, vec!["before".to_string(), "after 7".to_string()]);

    let cards = mapper.map_customer_list_to_customer_card(&[customer.clone(), customer]);
    assert!(cards.iter().all(|c| c.trail.len() == 2));
}

#[test]
fn hooks_are_absent_without_a_configuration() {
    let card = UserProfileMapper::new().map_customer_to_customer_card(&Customer { id: 1, name: "x".into() });
    assert!(card.trail.is_empty());
}

#[test]
fn hooks_run_when_mapping_into_an_existing_value() {
    let mapper = UserProfileMapper::from_config(&mk_config());
    let mut card = CustomerCard { trail: vec!["start".into()], ..Default::default() };

    mapper.map_customer_into_customer_card(&Customer { id: 3, name: "Lin".into() }, &mut card);
    assert_eq!(card.trail, vec!["start".to_string(), "before".to_string(), "after 3".to_string()]);
}

#[test]
fn a_later_group_binds_its_own_hooks_for_a_shared_pair() {
    let config = mk_config();
    let address = Address { street: "Main".into(), city: "Oslo".into() };

    let legacy = LegacyProfileMapper::from_config(&config).map_address_to_address_dto(&address);
    assert_eq!(legacy, AddressDto { street: "Main!".into(), city: "OSLO".into() });

    let plain = UserProfileMapper::from_config(&config).map_address_to_address_dto(&address);
    assert_eq!(plain, AddressDto { street: "Main".into(), city: "Oslo".into() });

    assert!(config.hooks_for_group::<Address, AddressDto>("UserProfile").is_empty());
    assert!(config.hooks_for_group::<Address, AddressDto>("LegacyProfile").after.is_some());
}

#[test]
fn embedded_parent_members_are_reached_through_the_parent() {
    let mapper = UserProfileMapper::new();
    let employee = Employee {
        entity: Entity { id: 11, created_by: "hr".into() },
        name: "Sam".into(),
    };

    let dto = mapper.map_employee_to_employee_dto(&employee);
    assert_eq!(dto, EmployeeDto { id: 11, created_by: "hr".into(), name: "Sam".into() });
    assert_eq!(mapper.map_employee_dto_to_employee(&dto), employee);
}

#[test]
fn reverse_mappings_restore_the_original() {
    let mapper = OrderProfileMapper::new();
    let order = Order { note: Some("gift".into()), ..mk_order() };

    let dto = mapper.map_order_to_order_dto(&order);
    assert_eq!(dto.items[1], LineItemDto { sku: "B-2".into(), qty: 3 });
    assert_eq!(mapper.map_order_dto_to_order(&dto), order);
}

#[test]
fn reverse_of_renamed_bindings_swaps_them() {
    let mapper = OrderProfileMapper::new();

    let ticket = mapper.map_ticket_dto_to_ticket(&TicketDto { order_id: 456, customer: "Jane".into() });
    assert_eq!(ticket, Ticket { id: 456, name: "Jane".into() });

    let dto = mapper.map_ticket_to_ticket_dto(&ticket);
    assert_eq!((dto.order_id, dto.customer.as_str()), (456, "Jane"));
}

#[test]
fn destinations_without_default_are_built_in_one_literal() {
    let mapper = OrderProfileMapper::new();

    let receipt = mapper.map_order_to_receipt(&mk_order());
    assert_eq!(receipt.order_id, 7);
    assert_eq!(receipt.items.len(), 2);
    assert_eq!(receipt.total_qty, 5);
    assert_eq!(receipt.note, "");

    let receipt = mapper.map_order_to_receipt(&Order { note: Some("fragile".into()), ..mk_order() });
    assert_eq!(receipt.note, "fragile");
}

#[test]
fn batch_forms_keep_order_and_length() {
    let mapper = OrderProfileMapper::new();
    let items = [
        LineItem { sku: "x".into(), qty: 1 },
        LineItem { sku: "y".into(), qty: 2 },
        LineItem { sku: "z".into(), qty: 3 },
    ];

    let array: [LineItemDto; 3] = mapper.map_line_item_array_to_line_item_dto(&items);
    let list = mapper.map_line_item_list_to_line_item_dto(&items);
    let iter = mapper.map_line_item_iter_to_line_item_dto(items.iter().filter(|i| i.qty > 1));

    assert_eq!(array.iter().map(|i| i.sku.as_str()).collect::<Vec<_>>(), vec!["x", "y", "z"]);
    assert_eq!(list, array.to_vec());
    assert_eq!(iter.len(), 2);
    assert!(mapper.map_line_item_list_to_line_item_dto(&[]).is_empty());
}

#[test]
fn batch_forms_handle_empty_and_single_inputs() {
    let mapper = OrderProfileMapper::new();
    let one = [LineItem { sku: "solo".into(), qty: 4 }];
    let none: [LineItem; 0] = [];

    let array: [LineItemDto; 0] = mapper.map_line_item_array_to_line_item_dto(&none);
    assert!(array.is_empty());
    let array: [LineItemDto; 1] = mapper.map_line_item_array_to_line_item_dto(&one);
    assert_eq!(array, [LineItemDto { sku: "solo".into(), qty: 4 }]);

    assert!(mapper.map_line_item_iter_to_line_item_dto(none.iter()).is_empty());
    assert!(mapper.map_line_item_iter_to_line_item_dto(std::iter::empty()).is_empty());
    assert_eq!(mapper.map_line_item_iter_to_line_item_dto(one.iter()), array.to_vec());

    assert_eq!(mapper.map_line_item_list_to_line_item_dto(&one), array.to_vec());
}

#[test]
fn hooks_run_once_per_element_in_batches() {
    let mapper = UserProfileMapper::from_config(&mk_config());
    let customers = [
        Customer { id: 1, name: "a".into() },
        Customer { id: 2, name: "b".into() },
        Customer { id: 3, name: "c".into() },
    ];

    let cards: [CustomerCard; 3] = mapper.map_customer_array_to_customer_card(&customers);
    let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(cards[2].trail, vec!["before".to_string(), "after 3".to_string()]);

    let cards = mapper.map_customer_iter_to_customer_card(customers.iter().rev());
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0].trail, vec!["before".to_string(), "after 3".to_string()]);
    assert!(cards.iter().all(|c| c.trail.len() == 2));

    let none: [Customer; 0] = [];
    assert!(mapper.map_customer_iter_to_customer_card(&none).is_empty());
}

#[test]
fn dispatcher_serves_declared_pairs_only() {
    let mapper = UserProfileMapper::new();
    let user = mk_user();

    let dto: UserDto = mapper.map(&user).unwrap();
    assert_eq!(dto.user_id, 42);

    let err = mapper.map::<User, Receipt>(&user).unwrap_err();
    assert!(matches!(err, MappingError::NotConfigured { .. }));
    assert!(err.to_string().contains("Receipt"));

    let mut target = UserDto::default();
    mapper.map_into(&user, &mut target).unwrap();
    assert_eq!(target.full_name, "Ada Lovelace");
    assert!(mapper.map_into(&user, &mut 0_u8).is_err());

    let dtos: Vec<UserDto> = mapper.map_slice(&[user.clone(), user]).unwrap();
    assert_eq!(dtos.len(), 2);
}

#[test]
fn aggregate_routes_each_pair_to_the_first_group_declaring_it() {
    let mapper = AggregateMapper::from_config(&mk_config());
    let address = Address { street: "Main St".into(), city: "Oslo".into() };

    let dto: AddressDto = mapper.map(&address).unwrap();
    assert_eq!((dto.street.as_str(), dto.city.as_str()), ("Main St", "Oslo"));
    let legacy: AddressDto = mapper.legacy_profile.map(&address).unwrap();
    assert_eq!((legacy.street.as_str(), legacy.city.as_str()), ("Main St!", "OSLO"));

    let receipt: Receipt = mapper.map(&mk_order()).unwrap();
    assert_eq!(receipt.total_qty, 5);

    let card: CustomerCard = mapper.map(&Customer { id: 9, name: "n".into() }).unwrap();
    assert_eq!(card.trail.len(), 2);

    assert!(mapper.map::<Receipt, Order>(&receipt).is_err());
}

#[test]
fn live_configuration_records_declarations() {
    let config = mk_config();

    assert!(config.is_configured::<User, UserDto>());
    assert!(config.is_configured::<OrderDto, Order>());
    assert!(!config.is_configured::<UserDto, User>());
    assert_eq!(config.members::<User, UserDto>().len(), 3);
    assert!(config.members::<User, UserDto>()[2].ignored);
    assert!(config.hooks_for::<Customer, CustomerCard>().before.is_some());
}
