//! Run-time support for generated mappers.
//!
//! This is the declarative surface profiles are written against ([`MapperConfiguration`],
//! [`MapExpression`], [`MemberOptions`], [`MappingProfile`]) and the small set of helpers the
//! generated code calls: hook slots, type-identity checks and allocation-free casts.
//!
//! The configuration records what each chain declared. Member options are kept as summaries
//! only; the generator reads the real expressions from source. Hook callables are the one
//! thing generated mappers take from the live object, through
//! [`MapperConfiguration::hooks_for_group`].

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("no mapping configured from `{from}` to `{to}`")]
    NotConfigured { from: &'static str, to: &'static str },
}

impl MappingError {
    pub fn not_configured<S: ?Sized, D: ?Sized>() -> Self {
        MappingError::NotConfigured { from: type_name::<S>(), to: type_name::<D>() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePair {
    pub source: TypeId,
    pub destination: TypeId,
    pub source_name: &'static str,
    pub destination_name: &'static str,
}

impl TypePair {
    pub fn of<S: ?Sized + 'static, D: ?Sized + 'static>() -> Self {
        TypePair {
            source: TypeId::of::<S>(),
            destination: TypeId::of::<D>(),
            source_name: type_name::<S>(),
            destination_name: type_name::<D>(),
        }
    }

    pub fn reversed(&self) -> Self {
        TypePair {
            source: self.destination,
            destination: self.source,
            source_name: self.destination_name,
            destination_name: self.source_name,
        }
    }
}

pub type Hook<S, D> = Arc<dyn Fn(&S, &mut D) + Send + Sync>;

/// Before/after callables of one mapping. Filled once when a mapper is built, read-only after.
pub struct HookSlot<S, D> {
    pub before: Option<Hook<S, D>>,
    pub after: Option<Hook<S, D>>,
}

impl<S, D> Default for HookSlot<S, D> {
    fn default() -> Self {
        HookSlot { before: None, after: None }
    }
}

impl<S, D> Clone for HookSlot<S, D> {
    fn clone(&self) -> Self {
        HookSlot { before: self.before.clone(), after: self.after.clone() }
    }
}

impl<S, D> fmt::Debug for HookSlot<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSlot")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

impl<S, D> HookSlot<S, D> {
    #[inline]
    pub fn run_before(&self, src: &S, dst: &mut D) {
        if let Some(hook) = &self.before {
            hook(src, dst);
        }
    }

    #[inline]
    pub fn run_after(&self, src: &S, dst: &mut D) {
        if let Some(hook) = &self.after {
            hook(src, dst);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}

/// What one `for_member` call configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberConfig {
    pub member_type: &'static str,
    pub ignored: bool,
    pub mapped: bool,
    pub conditional: bool,
}

struct PairEntry {
    pair: TypePair,
    //group the chain was registered under, if any
    group: Option<String>,
    reverse: bool,
    ignore_non_existing: bool,
    members: Vec<MemberConfig>,
    //both hold a `Hook<S, D>` for this entry's pair
    before: Option<Box<dyn Any + Send + Sync>>,
    after: Option<Box<dyn Any + Send + Sync>>,
}

impl PairEntry {
    fn new(pair: TypePair, group: Option<String>) -> Self {
        PairEntry {
            pair,
            group,
            reverse: false,
            ignore_non_existing: false,
            members: Vec::new(),
            before: None,
            after: None,
        }
    }

    fn has_hooks(&self) -> bool {
        self.before.is_some() || self.after.is_some()
    }

    fn hooks<S: 'static, D: 'static>(&self) -> HookSlot<S, D> {
        let take = |hook: &Option<Box<dyn Any + Send + Sync>>| {
            hook.as_ref().and_then(|h| h.downcast_ref::<Hook<S, D>>()).cloned()
        };
        HookSlot { before: take(&self.before), after: take(&self.after) }
    }
}

//`a::b::UserProfile<T>` -> `UserProfile`
fn group_of<P: ?Sized>() -> String {
    let name = type_name::<P>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name).to_string()
}

/// A group of mapping declarations.
pub trait MappingProfile {
    fn configure(&self, config: &mut MapperConfiguration);
}

/// Live configuration object. The first registration of a pair is the one that counts.
#[derive(Default)]
pub struct MapperConfiguration {
    entries: Vec<PairEntry>,
    current_group: Option<String>,
}

impl fmt::Debug for MapperConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{} -> {}", e.pair.source_name, e.pair.destination_name))
            .collect();
        f.debug_struct("MapperConfiguration").field("pairs", &pairs).finish()
    }
}

impl MapperConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_map<S: 'static, D: 'static>(&mut self) -> MapExpression<'_, S, D> {
        let entry = PairEntry::new(TypePair::of::<S, D>(), self.current_group.clone());
        self.entries.push(entry);
        let at = self.entries.len() - 1;
        MapExpression { config: self, at, marker: PhantomData }
    }

    /// Register a profile. Its chains are recorded under the profile's type name.
    pub fn add_profile<P: MappingProfile>(&mut self, profile: &P) -> &mut Self {
        self.add_group(&group_of::<P>(), |config| profile.configure(config))
    }

    /// Register the chains `configure` declares under `group`, for configuration written as a
    /// plain function (`add_group("configure_orders", configure_orders)`).
    pub fn add_group(&mut self, group: &str, configure: impl FnOnce(&mut Self)) -> &mut Self {
        let outer = self.current_group.replace(group.to_string());
        configure(self);
        self.current_group = outer;
        self
    }

    fn entry(&self, pair: TypePair) -> Option<&PairEntry> {
        self.entries.iter().find(|e| e.pair == pair)
    }

    //an entry for the swapped pair that asked for `reverse_map()`
    fn reversed_entry(&self, pair: TypePair) -> Option<&PairEntry> {
        self.entry(pair.reversed()).filter(|e| e.reverse)
    }

    pub fn is_configured<S: 'static, D: 'static>(&self) -> bool {
        let pair = TypePair::of::<S, D>();
        self.entry(pair).is_some() || self.reversed_entry(pair).is_some()
    }

    pub fn ignores_non_existing<S: 'static, D: 'static>(&self) -> bool {
        let pair = TypePair::of::<S, D>();
        match self.entry(pair) {
            Some(entry) => entry.ignore_non_existing,
            None => self.reversed_entry(pair).is_some_and(|e| e.ignore_non_existing),
        }
    }

    /// Member summaries of an explicitly declared pair.
    pub fn members<S: 'static, D: 'static>(&self) -> &[MemberConfig] {
        self.entry(TypePair::of::<S, D>()).map(|e| e.members.as_slice()).unwrap_or(&[])
    }

    /// Hook callables of the first registration of this pair that carries any.
    /// Reverse mappings never inherit hooks.
    pub fn hooks_for<S: 'static, D: 'static>(&self) -> HookSlot<S, D> {
        let pair = TypePair::of::<S, D>();
        self.entries
            .iter()
            .find(|e| e.pair == pair && e.has_hooks())
            .map(|e| e.hooks::<S, D>())
            .unwrap_or_default()
    }

    /// Hook callables `group` registered for this pair. Falls back to [`Self::hooks_for`] when
    /// the group never declared the pair, e.g. when its chains were configured outside
    /// [`Self::add_profile`] or [`Self::add_group`].
    pub fn hooks_for_group<S: 'static, D: 'static>(&self, group: &str) -> HookSlot<S, D> {
        let pair = TypePair::of::<S, D>();
        match self.entries.iter().find(|e| e.pair == pair && e.group.as_deref() == Some(group)) {
            Some(entry) => entry.hooks(),
            None => self.hooks_for(),
        }
    }

    /// Every configured pair, derived reverses included, in registration order.
    pub fn pairs(&self) -> Vec<TypePair> {
        let mut pairs: Vec<TypePair> = Vec::new();
        for entry in &self.entries {
            let mut candidates = vec![entry.pair];
            if entry.reverse {
                candidates.push(entry.pair.reversed());
            }
            for pair in candidates {
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
        pairs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Chain builder returned by [`MapperConfiguration::create_map`].
pub struct MapExpression<'c, S, D> {
    config: &'c mut MapperConfiguration,
    at: usize,
    marker: PhantomData<fn(&S, &mut D)>,
}

impl<S: 'static, D: 'static> MapExpression<'_, S, D> {
    fn entry(&mut self) -> &mut PairEntry {
        &mut self.config.entries[self.at]
    }

    pub fn for_member<M: ?Sized>(
        mut self,
        _member: impl for<'a> Fn(&'a D) -> &'a M,
        options: impl FnOnce(MemberOptions<S>) -> MemberOptions<S>,
    ) -> Self {
        let opts = options(MemberOptions::new());
        self.entry().members.push(MemberConfig {
            member_type: type_name::<M>(),
            ignored: opts.ignored,
            mapped: opts.mapped,
            conditional: opts.conditional,
        });
        self
    }

    pub fn ignore_non_existing(mut self) -> Self {
        self.entry().ignore_non_existing = true;
        self
    }

    pub fn ignore_all_non_existing(self) -> Self {
        self.ignore_non_existing()
    }

    pub fn reverse_map(mut self) -> Self {
        self.entry().reverse = true;
        self
    }

    pub fn before_map(mut self, hook: impl Fn(&S, &mut D) + Send + Sync + 'static) -> Self {
        let hook: Hook<S, D> = Arc::new(hook);
        self.entry().before = Some(Box::new(hook));
        self
    }

    pub fn after_map(mut self, hook: impl Fn(&S, &mut D) + Send + Sync + 'static) -> Self {
        let hook: Hook<S, D> = Arc::new(hook);
        self.entry().after = Some(Box::new(hook));
        self
    }
}

/// Options of one destination member.
pub struct MemberOptions<S> {
    ignored: bool,
    mapped: bool,
    conditional: bool,
    marker: PhantomData<fn(&S)>,
}

impl<S> MemberOptions<S> {
    fn new() -> Self {
        MemberOptions { ignored: false, mapped: false, conditional: false, marker: PhantomData }
    }

    pub fn map_from<T>(mut self, _source: impl Fn(&S) -> T) -> Self {
        self.mapped = true;
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn when(mut self, _condition: impl Fn(&S) -> bool) -> Self {
        self.conditional = true;
        self
    }
}

#[inline]
pub fn is_type<T: ?Sized + 'static, U: ?Sized + 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<U>()
}

#[inline]
pub fn cast_ref<T: 'static, U: 'static>(value: &T) -> Option<&U> {
    (value as &dyn Any).downcast_ref::<U>()
}

#[inline]
pub fn cast_mut<T: 'static, U: 'static>(value: &mut T) -> Option<&mut U> {
    (value as &mut dyn Any).downcast_mut::<U>()
}

/// Move `value` out as `U` when both are the same type. Does not allocate.
#[inline]
pub fn cast_owned<T: 'static, U: 'static>(value: T) -> Option<U> {
    let mut slot = Some(value);
    (&mut slot as &mut dyn Any).downcast_mut::<Option<U>>().and_then(Option::take)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Order {
        id: i64,
    }

    #[derive(Default)]
    struct OrderDto {
        order_id: i64,
        trail: Vec<String>,
    }

    struct OrderProfile;

    impl MappingProfile for OrderProfile {
        fn configure(&self, config: &mut MapperConfiguration) {
            config
                .create_map::<Order, OrderDto>()
                .for_member(|d| &d.order_id, |o| o.map_from(|s| s.id))
                .for_member(|d| &d.trail, |o| o.ignore())
                .ignore_non_existing()
                .reverse_map()
                .after_map(|s, d| d.trail.push(format!("after:{}", s.id)));
        }
    }

    fn mk_config() -> MapperConfiguration {
        let mut config = MapperConfiguration::new();
        config.add_profile(&OrderProfile);
        config
    }

    #[test]
    fn profile_registration_is_recorded() {
        let config = mk_config();
        assert_eq!(config.len(), 1);
        assert!(config.is_configured::<Order, OrderDto>());
        assert!(config.is_configured::<OrderDto, Order>());
        assert!(!config.is_configured::<Order, Order>());
        assert!(config.ignores_non_existing::<OrderDto, Order>());

        let members = config.members::<Order, OrderDto>();
        assert_eq!(members.len(), 2);
        assert!(members[0].mapped && !members[0].ignored);
        assert_eq!(members[0].member_type, "i64");
        assert!(members[1].ignored);

        assert_eq!(config.pairs().len(), 2);
    }

    #[test]
    fn hooks_are_only_handed_out_for_their_own_pair() {
        let config = mk_config();

        let slot = config.hooks_for::<Order, OrderDto>();
        assert!(slot.before.is_none() && slot.after.is_some());
        assert!(config.hooks_for::<OrderDto, Order>().is_empty());

        let mut dto = OrderDto::default();
        slot.run_before(&Order { id: 7 }, &mut dto);
        slot.run_after(&Order { id: 7 }, &mut dto);
        assert_eq!(dto.trail, vec!["after:7".to_string()]);
        assert_eq!(dto.order_id, 0);
    }

    struct PlainProfile;

    impl MappingProfile for PlainProfile {
        fn configure(&self, config: &mut MapperConfiguration) {
            config.create_map::<Order, OrderDto>();
        }
    }

    #[test]
    fn later_groups_keep_their_own_hooks() {
        let mut config = MapperConfiguration::new();
        config.add_profile(&PlainProfile).add_profile(&OrderProfile);
        config.add_group("configure_orders", |config| {
            config.create_map::<Order, OrderDto>().before_map(|_, d| d.order_id = -1);
        });

        assert!(config.hooks_for_group::<Order, OrderDto>("PlainProfile").is_empty());

        let slot = config.hooks_for_group::<Order, OrderDto>("OrderProfile");
        assert!(slot.before.is_none() && slot.after.is_some());

        let slot = config.hooks_for_group::<Order, OrderDto>("configure_orders");
        let mut dto = OrderDto::default();
        slot.run_before(&Order { id: 1 }, &mut dto);
        assert_eq!(dto.order_id, -1);

        //first registration with callables wins when the group is unknown
        let slot = config.hooks_for_group::<Order, OrderDto>("Unknown");
        assert!(slot.after.is_some());
        assert!(config.hooks_for::<Order, OrderDto>().after.is_some());
    }

    #[test]
    fn profile_groups_use_the_type_name() {
        assert_eq!(group_of::<OrderProfile>(), "OrderProfile");
        assert_eq!(group_of::<Vec<OrderProfile>>(), "Vec");
    }

    #[test]
    fn casts_follow_type_identity() {
        assert!(is_type::<Order, Order>());
        assert!(!is_type::<Order, OrderDto>());

        let order = Order { id: 3 };
        assert_eq!(cast_ref::<Order, Order>(&order).map(|o| o.id), Some(3));
        assert!(cast_ref::<Order, OrderDto>(&order).is_none());

        let mut dto = OrderDto::default();
        if let Some(d) = cast_mut::<OrderDto, OrderDto>(&mut dto) {
            d.order_id = 9;
        }
        assert_eq!(dto.order_id, 9);

        assert_eq!(cast_owned::<String, String>("x".to_string()).as_deref(), Some("x"));
        assert_eq!(cast_owned::<String, i32>("x".to_string()), None);
    }

    #[test]
    fn not_configured_names_both_types() {
        let err = MappingError::not_configured::<Order, String>();
        let text = err.to_string();
        assert!(text.contains("Order") && text.contains("String"));
    }
}
