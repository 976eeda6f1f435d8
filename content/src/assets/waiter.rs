//! Waiting for assets that are not registered yet.
//!
//! The `Waiter` is a table of one-shot continuations keyed by `AssetKey`.
//! When the registry adds an asset it announces the asset under its id and
//! under its url, and every continuation waiting for that key runs exactly
//! once.

use crate::assets::{Asset, AssetKey};
use log::trace;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Identifies a single continuation registered in a `Waiter`.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct WaitToken(u64);

type Continuation = Box<dyn FnOnce(Rc<Asset>)>;

#[derive(Default)]
pub struct Waiter {
    pending: RefCell<HashMap<AssetKey, Vec<(WaitToken, Continuation)>>>,
    next_token: Cell<u64>,
}

impl Waiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the continuation to run when an asset with `key` is announced.
    pub fn register(&self, key: AssetKey, continuation: Continuation) -> WaitToken {
        let token = WaitToken(self.next_token.get());
        self.next_token.set(token.0 + 1);

        trace!("Waiting for asset {} ({:?})", key, token);
        self.pending
            .borrow_mut()
            .entry(key)
            .or_insert_with(Vec::new)
            .push((token, continuation));

        token
    }

    /// Runs and removes all continuations registered under `key` in the
    /// order they were registered. Returns the number of continuations run.
    ///
    /// Continuations registered for the same key while the announcement
    /// is running wait for the next announcement.
    pub fn announce(&self, key: &AssetKey, asset: &Rc<Asset>) -> usize {
        let waiting = match self.pending.borrow_mut().remove(key) {
            None => return 0,
            Some(t) => t,
        };

        trace!("Announcing {} to {} waiters", key, waiting.len());

        let count = waiting.len();
        for (_, continuation) in waiting {
            continuation(asset.clone());
        }
        count
    }

    /// Removes a single continuation. Returns `false` if it already ran or
    /// was cancelled before.
    pub fn cancel(&self, token: WaitToken) -> bool {
        let mut pending = self.pending.borrow_mut();

        let key = pending
            .iter()
            .find(|(_, list)| list.iter().any(|(t, _)| *t == token))
            .map(|(k, _)| k.clone());

        match key {
            None => false,
            Some(key) => {
                if let Some(list) = pending.get_mut(&key) {
                    list.retain(|(t, _)| *t != token);
                    if list.is_empty() {
                        pending.remove(&key);
                    }
                }
                true
            }
        }
    }

    /// Returns whether any continuation waits for `key`.
    pub fn is_waiting(&self, key: &AssetKey) -> bool {
        self.pending.borrow().contains_key(key)
    }

    /// Total number of registered continuations.
    pub fn len(&self) -> usize {
        self.pending.borrow().values().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
