//! The session's effect log.
//!
//! Every externally visible mutation is recorded in order: fact lifecycle
//! changes, focus changes, firings, and halts. The log is the session's
//! observability surface; hosts read it instead of hooking a logger.

use antler_foundation::FactHandle;

/// One recorded session effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectRecord {
    /// A fact entered working memory.
    Inserted {
        /// Handle of the inserted fact.
        handle: FactHandle,
    },
    /// A fact was revised in place.
    Updated {
        /// Handle of the updated fact.
        handle: FactHandle,
        /// The fact's new version number.
        version: u64,
    },
    /// A fact left working memory.
    Retracted {
        /// Handle of the retracted fact.
        handle: FactHandle,
    },
    /// The focus stack changed.
    FocusChanged {
        /// The newly focused group.
        group: String,
    },
    /// A rule fired.
    Fired {
        /// Name of the fired rule.
        rule: String,
        /// Sequence number of the fired activation.
        seq: u64,
    },
    /// The firing loop was asked to stop.
    Halted,
}
