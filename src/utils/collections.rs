//! Collection helpers for the extras channel.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Fresh map of the shape stored in the extras channel.
#[must_use]
pub fn new_extra_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}
