pub mod allocator;
pub mod serialization;

pub use allocator::{IdProvider, SequentialIds, UuidIds};
pub use serialization::{
    load_snapshot_from_path, save_snapshot_to_path, snapshot_from_json, snapshot_to_json,
    SaveSnapshot, SAVE_VERSION,
};
