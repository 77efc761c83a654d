//! Proxy pool with permanent failure tracking
//!
//! The pool hands out one proxy at a time. A proxy that fails is retired for
//! the rest of the run and the cursor moves forward to the next live entry.
//! Once every entry has failed the pool is exhausted and selection falls back
//! to a direct connection.

use crate::proxy::models::{Proxy, ProxyEntry, ProxyStatus, Route};
use tracing::{debug, info};

/// Ordered set of proxies plus a forward-only cursor
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    entries: Vec<ProxyEntry>,
    /// Index of the current entry. Every entry before it is `Failed`;
    /// `cursor == entries.len()` means exhausted.
    cursor: usize,
}

impl ProxyPool {
    /// Build a pool with every proxy alive and the cursor at the start
    pub fn new(proxies: Vec<Proxy>) -> Self {
        Self {
            entries: proxies.into_iter().map(ProxyEntry::new).collect(),
            cursor: 0,
        }
    }

    /// Route for the next request. Does not advance the cursor.
    pub fn current(&self) -> Route {
        match self.entries.get(self.cursor) {
            Some(entry) => Route::Proxy(entry.proxy.clone()),
            None => Route::Direct,
        }
    }

    /// Retire a proxy for the rest of the run.
    ///
    /// Marking an already failed (or unknown) proxy is a no-op.
    pub fn mark_failed(&mut self, proxy: &Proxy) {
        let mut changed = false;
        for entry in self.entries.iter_mut().filter(|e| &e.proxy == proxy) {
            if entry.is_alive() {
                entry.status = ProxyStatus::Failed;
                changed = true;
            }
        }

        if !changed {
            return;
        }

        debug!(proxy = %proxy, alive = self.alive_count(), "proxy marked failed");

        if self.cursor < self.entries.len() && !self.entries[self.cursor].is_alive() {
            self.advance();
        }
    }

    fn advance(&mut self) {
        let next = self.entries[self.cursor..]
            .iter()
            .position(ProxyEntry::is_alive)
            .map(|offset| self.cursor + offset);

        match next {
            Some(index) => self.cursor = index,
            None => {
                self.cursor = self.entries.len();
                info!(
                    total = self.entries.len(),
                    "all proxies failed, continuing with direct connection"
                );
            }
        }
    }

    /// True when proxies were configured and all of them have failed
    pub fn is_exhausted(&self) -> bool {
        !self.entries.is_empty() && self.cursor >= self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_alive()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.alive_count()
    }

    pub fn entries(&self) -> &[ProxyEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyType;

    fn proxy(last_octet: u8) -> Proxy {
        Proxy::new(format!("10.0.0.{}", last_octet), 8080, ProxyType::Http)
    }

    #[test]
    fn test_empty_pool_is_direct() {
        let pool = ProxyPool::new(Vec::new());
        assert_eq!(pool.current(), Route::Direct);
        assert!(pool.is_empty());
        assert!(!pool.is_exhausted());
    }

    #[test]
    fn test_current_does_not_advance() {
        let pool = ProxyPool::new(vec![proxy(1), proxy(2)]);
        assert_eq!(pool.current(), Route::Proxy(proxy(1)));
        assert_eq!(pool.current(), Route::Proxy(proxy(1)));
    }

    #[test]
    fn test_mark_failed_rotates_to_next_alive() {
        let mut pool = ProxyPool::new(vec![proxy(1), proxy(2), proxy(3)]);
        pool.mark_failed(&proxy(1));
        assert_eq!(pool.current(), Route::Proxy(proxy(2)));
        assert_eq!(pool.alive_count(), 2);
        assert_eq!(pool.failed_count(), 1);
    }

    #[test]
    fn test_failing_every_entry_exhausts_pool() {
        for n in 1..=5u8 {
            let proxies: Vec<_> = (1..=n).map(proxy).collect();
            let mut pool = ProxyPool::new(proxies.clone());
            for p in &proxies {
                pool.mark_failed(p);
            }
            assert_eq!(pool.current(), Route::Direct);
            assert!(pool.is_exhausted());
            assert_eq!(pool.alive_count(), 0);
        }
    }

    #[test]
    fn test_mark_failed_is_idempotent() {
        let mut pool = ProxyPool::new(vec![proxy(1), proxy(2), proxy(3)]);
        pool.mark_failed(&proxy(1));
        pool.mark_failed(&proxy(1));
        pool.mark_failed(&proxy(1));
        assert_eq!(pool.current(), Route::Proxy(proxy(2)));
        assert_eq!(pool.failed_count(), 1);
    }

    #[test]
    fn test_failing_non_current_entry_is_skipped_later() {
        let mut pool = ProxyPool::new(vec![proxy(1), proxy(2), proxy(3)]);
        pool.mark_failed(&proxy(2));
        assert_eq!(pool.current(), Route::Proxy(proxy(1)));

        pool.mark_failed(&proxy(1));
        assert_eq!(pool.current(), Route::Proxy(proxy(3)));
    }

    #[test]
    fn test_failed_proxy_never_selected_again() {
        let mut pool = ProxyPool::new(vec![proxy(1), proxy(2)]);
        pool.mark_failed(&proxy(1));
        pool.mark_failed(&proxy(2));
        pool.mark_failed(&proxy(1));
        assert_eq!(pool.current(), Route::Direct);
        assert!(pool.entries().iter().all(|e| e.status == ProxyStatus::Failed));
    }

    #[test]
    fn test_unknown_proxy_is_ignored() {
        let mut pool = ProxyPool::new(vec![proxy(1)]);
        pool.mark_failed(&proxy(9));
        assert_eq!(pool.current(), Route::Proxy(proxy(1)));
        assert_eq!(pool.len(), 1);
    }
}
