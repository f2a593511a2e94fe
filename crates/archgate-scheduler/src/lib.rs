//! archgate-scheduler: architecture-aware filter and score plugin.
//!
//! Rejects candidate nodes whose CPU architecture none of a workload's
//! images were published for, and ranks the rest by a configured
//! per-architecture weight.
//!
//! # Architecture
//!
//! ```text
//! Framework (host)
//!   └── ArchFilter ("archfilter")
//!       ├── Filter → ArchLookup
//!       │     ├── ArchCache (hit)
//!       │     └── Resolver (miss) → Put
//!       └── Score → WeightArgs[node arch] or 0
//! ```
//!
//! Lookup failures surface as an `Error` status so the host retries on
//! its next cycle; only a genuine architecture mismatch is
//! `Unschedulable`.

pub mod archfilter;
pub mod args;
pub mod context;
pub mod error;
pub mod framework;
pub mod host;
pub mod lookup;

pub use archfilter::ArchFilter;
pub use args::{RawArgs, WeightArgs, decode_into};
pub use context::DecisionContext;
pub use error::{LookupError, LookupResult};
pub use framework::{
    Code, CycleState, FilterPlugin, NodeInfo, NodeLister, Plugin, ScorePlugin, StaticNodeLister,
    Status,
};
pub use host::{Evaluation, Framework, NodeScore, Rejection};
pub use lookup::ArchLookup;
