use mapgen_core::{MapperConfiguration, MappingProfile};

use crate::models::*;

pub struct UserProfile;

impl MappingProfile for UserProfile {
    fn configure(&self, config: &mut MapperConfiguration) {
        config
            .create_map::<User, UserDto>()
            .for_member(|d| &d.user_id, |o| o.map_from(|s| s.id))
            .for_member(|d| &d.full_name, |o| o.map_from(|s| format!("{} {}", s.first_name, s.last_name)))
            .for_member(|d| &d.internal_note, |o| o.ignore());

        config.create_map::<Address, AddressDto>();

        config
            .create_map::<Customer, CustomerCard>()
            .for_member(|d| &d.trail, |o| o.ignore())
            .before_map(|_, d| d.trail.push("before".to_string()))
            .after_map(|s, d| d.trail.push(format!("after {}", s.id)));

        config
            .create_map::<Product, ProductView>()
            .for_member(|d| &d.price, |o| o.when(|s| s.price > 0.0))
            .for_member(|d| &d.discounted, |o| o.map_from(|s| s.discount.is_some()));

        config.create_map::<Employee, EmployeeDto>().reverse_map();
    }
}

pub struct OrderProfile;

impl MappingProfile for OrderProfile {
    fn configure(&self, config: &mut MapperConfiguration) {
        config.create_map::<Order, OrderDto>().reverse_map();
        config.create_map::<LineItem, LineItemDto>().reverse_map();

        config
            .create_map::<Ticket, TicketDto>()
            .for_member(|d| &d.order_id, |o| o.map_from(|s| s.id))
            .for_member(|d| &d.customer, |o| o.map_from(|s| s.name.clone()))
            .reverse_map();

        config
            .create_map::<Order, Receipt>()
            .for_member(|d| &d.order_id, |o| o.map_from(|s| s.id))
            .for_member(|d| &d.note, |o| {
                o.when(|s| s.note.is_some()).map_from(|s| s.note.clone().unwrap_or_default())
            })
            .for_member(|d| &d.total_qty, |o| o.map_from(|s| s.items.iter().map(|i| i.qty).sum::<u32>()));
    }
}

pub struct LegacyProfile;

impl MappingProfile for LegacyProfile {
    fn configure(&self, config: &mut MapperConfiguration) {
        config
            .create_map::<Address, AddressDto>()
            .for_member(|d| &d.city, |o| o.map_from(|s| s.city.to_uppercase()))
            .after_map(|_, d| d.street.push('!'));
    }
}
