//! Lifecycle stage of experiments and runs, and the listing filter over it

use serde::{Deserialize, Serialize};

/// Soft-delete marker carried by experiments and runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStage {
    /// Visible in default listings.
    #[default]
    Active,
    /// Soft-deleted; hidden from `ViewType::ActiveOnly` listings.
    Deleted,
}

impl LifecycleStage {
    /// Whether the entity is active.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Which lifecycle stages a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    /// Only active entities.
    #[default]
    ActiveOnly,
    /// Only soft-deleted entities.
    DeletedOnly,
    /// Everything.
    All,
}

impl ViewType {
    /// Whether an entity in `stage` is part of this view.
    #[must_use]
    pub const fn includes(self, stage: LifecycleStage) -> bool {
        match self {
            Self::ActiveOnly => matches!(stage, LifecycleStage::Active),
            Self::DeletedOnly => matches!(stage, LifecycleStage::Deleted),
            Self::All => true,
        }
    }
}
