//! Repository layer for the local state database

pub mod sync_state;

pub use sync_state::{
    SyncState, get_sync_state, list_sync_states, open_state_pool, record_sync, touch_sync,
};
