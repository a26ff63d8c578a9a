//! Versioned state channels.
//!
//! Each channel pairs its payload with a version counter. Reducers mutate
//! the payload without touching the version; the barrier bumps the version
//! once per node when content actually changed, which keeps change
//! detection cheap for checkpointing and diagnostics.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::Message;

/// Common surface of a versioned channel.
pub trait Channel {
    /// Payload type held by the channel.
    type Payload: Clone;

    /// Current version counter.
    fn version(&self) -> u32;

    /// Overwrite the version counter. Reserved for the barrier and for
    /// checkpoint restoration.
    fn set_version(&mut self, version: u32);

    /// Mutable access to the payload for reducers.
    fn get_mut(&mut self) -> &mut Self::Payload;

    /// Cloned, point-in-time copy of the payload.
    fn snapshot(&self) -> Self::Payload;
}

/// Channel holding the ordered conversation history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagesChannel {
    items: Vec<Message>,
    version: u32,
}

impl MessagesChannel {
    /// Build a channel from existing messages at the given version.
    #[must_use]
    pub fn new(items: Vec<Message>, version: u32) -> Self {
        Self { items, version }
    }

    /// Number of messages currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for MessagesChannel {
    fn default() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl Channel for MessagesChannel {
    type Payload = Vec<Message>;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn get_mut(&mut self) -> &mut Vec<Message> {
        &mut self.items
    }

    fn snapshot(&self) -> Vec<Message> {
        self.items.clone()
    }
}

/// Channel holding keyed metadata and intermediate results as JSON values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtrasChannel {
    map: FxHashMap<String, Value>,
    version: u32,
}

impl ExtrasChannel {
    /// Build a channel from an existing map at the given version.
    #[must_use]
    pub fn new(map: FxHashMap<String, Value>, version: u32) -> Self {
        Self { map, version }
    }
}

impl Default for ExtrasChannel {
    fn default() -> Self {
        Self::new(FxHashMap::default(), 1)
    }
}

impl Channel for ExtrasChannel {
    type Payload = FxHashMap<String, Value>;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn get_mut(&mut self) -> &mut FxHashMap<String, Value> {
        &mut self.map
    }

    fn snapshot(&self) -> FxHashMap<String, Value> {
        self.map.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut channel = ExtrasChannel::default();
        channel.get_mut().insert("k".into(), json!(1));
        let snap = channel.snapshot();
        channel.get_mut().insert("k".into(), json!(2));
        assert_eq!(snap.get("k"), Some(&json!(1)));
    }

    #[test]
    fn versions_start_at_one() {
        assert_eq!(MessagesChannel::default().version(), 1);
        assert_eq!(ExtrasChannel::default().version(), 1);
    }
}
