use crate::cache::Cache;
use crate::config::BrowseConfig;
use crate::entry::{BrowseEntry, EntryKey};
use crate::error::Error;
use crate::name::fqdn;
use crate::netif::Interface;
use crate::query::browse_message;
use hickory_proto::op::Message;
use hickory_proto::rr::Name;
use std::collections::{btree_map, BTreeMap, HashSet};
use std::time::Instant;

/// Callbacks for communicating browse results
///
/// For any one entry identity (service type, instance name, interface
/// name), calls strictly alternate: `on_add`, `on_remove`, `on_add`...
pub trait Callback {
    /// A service instance has appeared on an interface
    fn on_add(&mut self, entry: &BrowseEntry);

    /// A previously-added service instance has gone away
    ///
    /// The entry is the one passed to `on_add`.
    fn on_remove(&mut self, entry: &BrowseEntry);
}

/// Adapts a pair of closures into a [`Callback`]
pub struct Callbacks<A, R> {
    add: A,
    rmv: R,
}

impl<A, R> Callbacks<A, R>
where
    A: FnMut(&BrowseEntry),
    R: FnMut(&BrowseEntry),
{
    /// Call `add` for each new entry, and `rmv` for each removal
    pub fn new(add: A, rmv: R) -> Self {
        Self { add, rmv }
    }
}

impl<A, R> Callback for Callbacks<A, R>
where
    A: FnMut(&BrowseEntry),
    R: FnMut(&BrowseEntry),
{
    fn on_add(&mut self, entry: &BrowseEntry) {
        (self.add)(entry);
    }

    fn on_remove(&mut self, entry: &BrowseEntry) {
        (self.rmv)(entry);
    }
}

/// The core of a DNS-SD browser
///
/// Like `cotton_ssdp::Engine`, this does no I/O of its own. Its owner
/// sends the questions from [`Browser::query_message`] on each
/// interface, and passes every incoming message to
/// [`Browser::on_message`]; the browser keeps the record cache, and
/// works out which entries have come and gone. See [`crate::browse()`]
/// for the usual tokio-based owner.
pub struct Browser<CB: Callback> {
    questions: Vec<Name>,
    service_types: HashSet<String>,
    cache: Cache,
    tracked: BTreeMap<EntryKey, BrowseEntry>,
    callback: CB,
}

impl<CB: Callback> Browser<CB> {
    /// Create a browser for the service types in `config`
    ///
    /// # Errors
    ///
    /// Passes on errors from [`BrowseConfig::validate`].
    pub fn new(config: &BrowseConfig, callback: CB) -> Result<Self, Error> {
        let questions = config.validate()?;
        let service_types = questions
            .iter()
            .map(|n| fqdn(n).to_ascii_lowercase())
            .collect();
        Ok(Self {
            questions,
            service_types,
            cache: Cache::new(),
            tracked: BTreeMap::new(),
            callback,
        })
    }

    /// The question set to send on every interface
    #[must_use]
    pub fn query_message(&self) -> Message {
        browse_message(&self.questions)
    }

    /// Process one incoming message, invoking callbacks for changes
    ///
    /// All additions are reported before any removals.
    pub fn on_message(
        &mut self,
        message: &Message,
        interface: &Interface,
        now: Instant,
    ) {
        self.cache.update_from(message, interface, now);

        for service in self.cache.services() {
            if !self
                .service_types
                .contains(&service.service_name().to_ascii_lowercase())
            {
                continue;
            }
            for (interface_name, ips) in &service.addresses {
                let entry = BrowseEntry::new(service, interface_name, ips);
                if let btree_map::Entry::Vacant(v) =
                    self.tracked.entry(entry.key())
                {
                    log::debug!(
                        "+ {} on {}",
                        entry.service_instance_name(),
                        entry.interface_name
                    );
                    self.callback.on_add(&entry);
                    v.insert(entry);
                }
            }
        }

        let live = self
            .cache
            .services()
            .iter()
            .map(|s| s.service_instance_name())
            .collect::<HashSet<_>>();
        let gone = self
            .tracked
            .iter()
            .filter(|(_, e)| !live.contains(&e.service_instance_name()))
            .map(|(k, _)| k.clone())
            .collect::<Vec<_>>();
        for key in gone {
            if let Some(entry) = self.tracked.remove(&key) {
                log::debug!(
                    "- {} on {}",
                    entry.service_instance_name(),
                    entry.interface_name
                );
                self.callback.on_remove(&entry);
            }
        }
    }

    /// Entries added and not yet removed, in identity order
    pub fn tracked(&self) -> impl Iterator<Item = &BrowseEntry> {
        self.tracked.values()
    }

    /// The underlying record cache
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}
