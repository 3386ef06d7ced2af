use serde::{Deserialize, Serialize};

/// Options for bulk [`get`](crate::CollectionClient::get) calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOptions {
    /// When set, ids that cannot be found are logged as a warning and the
    /// subset that was found is returned. Without it, any missing id fails
    /// the whole call with an aggregate error naming every missing id.
    pub ignore_missing_ids: bool,
}

impl GetOptions {
    pub fn ignore_missing() -> Self {
        Self {
            ignore_missing_ids: true,
        }
    }
}

/// Options for mutating calls (`add`, `update`, `set_path`, `delete`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// When set, the operation is not committed; the resolved task descriptor
    /// is returned so the caller can batch several tasks through
    /// [`commit`](crate::DocLinkClient::commit) as one atomic write.
    pub return_task_only: bool,
}

impl WriteOptions {
    pub fn task_only() -> Self {
        Self {
            return_task_only: true,
        }
    }
}
