//! Name-keyed command dispatch table.
//!
//! Handlers are async; a synchronous function is adapted by
//! [`SyncCommand`], which completes immediately with its result. The table
//! enumerates in the natural (sorted-by-name) order of the key, not
//! insertion order, and callers indexing by ordinal rely on that.

use async_trait::async_trait;
use relay_core::{ArgList, CallError, RelayError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered command handler.
///
/// Handlers return the outcome and result arguments as a pair; transport
/// and framing concerns never reach them.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, args: &ArgList) -> (CallError, ArgList);
}

/// Adapter exposing a synchronous function through the async handler
/// contract.
pub struct SyncCommand<F>
where
    F: Fn(&ArgList) -> (CallError, ArgList) + Send + Sync,
{
    func: F,
}

impl<F> SyncCommand<F>
where
    F: Fn(&ArgList) -> (CallError, ArgList) + Send + Sync,
{
    pub fn new(func: F) -> Self {
        SyncCommand { func }
    }
}

#[async_trait]
impl<F> CommandHandler for SyncCommand<F>
where
    F: Fn(&ArgList) -> (CallError, ArgList) + Send + Sync,
{
    async fn execute(&self, args: &ArgList) -> (CallError, ArgList) {
        (self.func)(args)
    }
}

/// Name-keyed table of command handlers.
#[derive(Default)]
pub struct CommandMap {
    entries: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandMap {
    pub fn new() -> Self {
        CommandMap::default()
    }

    /// Register a handler. Fails without modifying the table if the name
    /// is already taken; commands are never silently overwritten.
    pub fn add(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(RelayError::DuplicateHandler { name });
        }
        self.entries.insert(name, handler);
        Ok(())
    }

    /// Register a synchronous function as a handler.
    pub fn add_sync<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn(&ArgList) -> (CallError, ArgList) + Send + Sync + 'static,
    {
        self.add(name, Arc::new(SyncCommand::new(func)))
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.entries.get(name).cloned()
    }

    /// Handler at `ordinal` in sorted-by-name order. This does not match
    /// registration order.
    pub fn get_ordinal(&self, ordinal: usize) -> Option<(&str, Arc<dyn CommandHandler>)> {
        self.entries
            .iter()
            .nth(ordinal)
            .map(|(name, handler)| (name.as_str(), handler.clone()))
    }

    /// Remove an entry if present; returns whether one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Command names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for CommandMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandMap")
            .field("commands", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Atom;

    fn ok_with(tagged: &'static str) -> impl Fn(&ArgList) -> (CallError, ArgList) {
        move |_args| {
            (
                CallError::okay(),
                ArgList::new().with(Atom::text("from", tagged)),
            )
        }
    }

    #[tokio::test]
    async fn test_duplicate_add_fails_and_keeps_original() {
        let mut map = CommandMap::new();
        map.add_sync("get_mtu", ok_with("original")).unwrap();

        let err = map.add_sync("get_mtu", ok_with("usurper")).unwrap_err();
        assert!(matches!(err, RelayError::DuplicateHandler { ref name } if name == "get_mtu"));
        assert_eq!(map.len(), 1);

        // The original handler is still the one that runs.
        let handler = map.get("get_mtu").unwrap();
        let (error, args) = handler.execute(&ArgList::new()).await;
        assert!(error.is_okay());
        assert_eq!(args.get_named("from").unwrap().to_text(), "from:txt=original");
    }

    #[test]
    fn test_remove_allows_readding() {
        let mut map = CommandMap::new();
        map.add_sync("get_mtu", ok_with("first")).unwrap();
        assert!(map.remove("get_mtu"));
        assert!(!map.remove("get_mtu"));
        map.add_sync("get_mtu", ok_with("second")).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_ordinal_order_is_sorted_not_insertion() {
        let mut map = CommandMap::new();
        map.add_sync("zebra", ok_with("z")).unwrap();
        map.add_sync("alpha", ok_with("a")).unwrap();
        map.add_sync("mango", ok_with("m")).unwrap();

        let names: Vec<&str> = (0..map.len())
            .map(|i| map.get_ordinal(i).unwrap().0)
            .collect();
        assert_eq!(names, ["alpha", "mango", "zebra"]);
        assert!(map.get_ordinal(3).is_none());
    }

    #[test]
    fn test_get_unknown_is_none() {
        let map = CommandMap::new();
        assert!(map.get("nope").is_none());
    }
}
