//! Merge strategies applied at the barrier after each node.
//!
//! Each state channel has a reducer: messages append in order, extras
//! overwrite per key. Reducers mutate payloads only; version bumps are the
//! barrier's responsibility so that a no-op update never looks like a
//! change.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::channels::Channel;
use crate::node::NodePartial;
use crate::state::ExecutionState;
use crate::types::ChannelType;

/// A channel merge strategy.
pub trait Reducer: Send + Sync {
    /// Merge the relevant field of `update` into `state`.
    fn apply(&self, state: &mut ExecutionState, update: &NodePartial);
}

/// Appends update messages to the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddMessages;

impl Reducer for AddMessages {
    fn apply(&self, state: &mut ExecutionState, update: &NodePartial) {
        if let Some(messages) = &update.messages
            && !messages.is_empty()
        {
            state.messages.get_mut().extend(messages.iter().cloned());
        }
    }
}

/// Shallow-merges update extras, overwriting existing keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapMerge;

impl Reducer for MapMerge {
    fn apply(&self, state: &mut ExecutionState, update: &NodePartial) {
        if let Some(extras) = &update.extra
            && !extras.is_empty()
        {
            let map = state.extra.get_mut();
            for (key, value) in extras {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Registry mapping channel types to their reducers.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelType, Arc<dyn Reducer>>,
}

/// Whether the partial carries data for the given channel. Lets the
/// registry skip reducers with nothing to do.
fn channel_guard(channel: &ChannelType, partial: &NodePartial) -> bool {
    match channel {
        ChannelType::Message => partial
            .messages
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false),
        ChannelType::Extra => partial
            .extra
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false),
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(ChannelType::Message, Arc::new(AddMessages));
        registry.register(ChannelType::Extra, Arc::new(MapMerge));
        registry
    }
}

impl ReducerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Register (or replace) the reducer for a channel.
    pub fn register(&mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.insert(channel, reducer);
        self
    }

    /// Apply the reducer for one channel, skipping empty updates.
    pub fn try_update(
        &self,
        channel: ChannelType,
        state: &mut ExecutionState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        if !channel_guard(&channel, update) {
            return Ok(());
        }
        match self.reducer_map.get(&channel) {
            Some(reducer) => {
                reducer.apply(state, update);
                Ok(())
            }
            None => Err(ReducerError::UnknownChannel(channel)),
        }
    }

    /// Apply every registered reducer to the update.
    pub fn apply_all(
        &self,
        state: &mut ExecutionState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        for channel in self.reducer_map.keys() {
            self.try_update(channel.clone(), state, update)?;
        }
        Ok(())
    }
}

/// Failures while dispatching to reducers.
#[derive(Debug)]
pub enum ReducerError {
    /// No reducer registered for the channel.
    UnknownChannel(ChannelType),
}

impl fmt::Display for ReducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerError::UnknownChannel(channel) => {
                write!(f, "no reducer registered for channel: {channel}")
            }
        }
    }
}

impl std::error::Error for ReducerError {}
