// Anti-spam filtering of classified signals
pub mod anti_spam;
pub mod gate;
pub mod state;
pub mod store;

pub use anti_spam::{AntiSpamFilter, FilterDecision, SuppressReason};
pub use gate::SignalGate;
pub use state::{FilterState, FilterStats, ScopeKey};
pub use store::{FilterStateStore, JsonFileFilterStateStore, MemoryFilterStateStore};
