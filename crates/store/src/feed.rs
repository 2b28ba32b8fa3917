// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Change subscriptions.
//!
//! Every backend owns a [`ChangeFeed`] and publishes the changes of each
//! successful commit to it. Subscribers receive only the changes their
//! [`SubscriptionFilter`] selects.

use crate::document::DocumentChange;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Buffer size for the change broadcast channel.
const FEED_BUFFER_SIZE: usize = 256;

/// Selects which changes a subscription receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    collection: Option<String>,
    key: Option<String>,
}

impl SubscriptionFilter {
    /// Every change in every collection.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            collection: None,
            key: None,
        }
    }

    /// Every change in one collection.
    #[must_use]
    pub fn collection(collection: &str) -> Self {
        Self {
            collection: Some(collection.to_string()),
            key: None,
        }
    }

    /// Changes to a single document.
    #[must_use]
    pub fn document(collection: &str, key: &str) -> Self {
        Self {
            collection: Some(collection.to_string()),
            key: Some(key.to_string()),
        }
    }

    /// Returns true if `change` passes this filter.
    #[must_use]
    pub fn matches(&self, change: &DocumentChange) -> bool {
        self.collection
            .as_deref()
            .is_none_or(|c| c == change.collection)
            && self.key.as_deref().is_none_or(|k| k == change.key)
    }
}

/// Broadcasts committed changes to subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<DocumentChange>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_BUFFER_SIZE);
        Self { sender }
    }

    /// Publishes the changes of one commit.
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, changes: &[DocumentChange]) {
        for change in changes {
            if self.sender.send(change.clone()).is_err() {
                debug!("No change subscribers connected");
                return;
            }
        }
    }

    /// Opens a new subscription.
    #[must_use]
    pub fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    /// Returns the number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to committed changes.
///
/// Dropping the subscription, or calling [`Subscription::unsubscribe`],
/// ends delivery.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<DocumentChange>,
    filter: SubscriptionFilter,
}

impl Subscription {
    /// Waits for the next matching change.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn recv(&mut self) -> Option<DocumentChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.filter.matches(&change) => return Some(change),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change subscriber lagged, changes dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next matching change already delivered, without waiting.
    pub fn try_recv(&mut self) -> Option<DocumentChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) if self.filter.matches(&change) => return Some(change),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change subscriber lagged, changes dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Ends the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
