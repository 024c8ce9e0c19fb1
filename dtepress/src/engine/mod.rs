//! Job distribution and concurrent execution engine.
//!
//! Documents flow through a bounded FIFO queue to a fixed-size pool of
//! workers, each running the per-job pipeline (parse, validate, render,
//! route, write) and reporting outcomes back on a result channel. The
//! supervisor owns the whole run.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Supervisor                          │
//! │  validate → build jobs → enqueue jobs + sentinels        │
//! └──────────────┬────────────────────────────▲──────────────┘
//!                │ JobQueue                   │ result channel
//!       ┌────────┼────────┐                   │
//!       ▼        ▼        ▼                   │
//!   ┌────────┐┌────────┐┌────────┐            │
//!   │Worker 0││Worker 1││Worker N│────────────┘
//!   └────────┘└────────┘└────────┘
//!    parse → validate → render → route → write
//! ```
//!
//! Termination uses one sentinel per worker: a worker that pops a
//! sentinel reports `WorkerDone` and exits, and the supervisor stops
//! draining once every worker has been retired. Cancelling the run's
//! token closes the queue instead, so blocked workers exit without
//! taking further jobs while in-flight jobs finish.
//!
//! Completion order across workers is not guaranteed to match
//! submission order; destinations are derived per document so concurrent
//! writes never collide, except on the shared stdout stream.

pub mod error;
pub mod job;
pub mod queue;
pub mod router;
pub mod supervisor;

mod worker;

pub use error::{EngineError, PipelineError, ValidationError};
pub use job::{Job, QueueItem, WorkerOutcome};
pub use queue::JobQueue;
pub use router::{resolve_destination, Destination, OutputPolicy};
pub use supervisor::{JobFailure, RunReport, SourceDocument, Supervisor};
