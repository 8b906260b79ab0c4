//! Lifecycle events and the reporter contract

mod events;
mod reporter;
mod session;

pub use events::{channel, EventReceiver, EventSender, TestEvent, TestEventKind};
pub use reporter::{LogReporter, MultiReporter, Reporter};
pub use session::{run_session, RunReport, RunStats};
