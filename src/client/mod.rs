//! Client side of the event stream: reconnecting session, SSE parsing, and
//! snapshot reconciliation.

pub mod merge;
pub mod session;
pub mod sse;
pub mod view;

pub use merge::{merge_tasks, visibly_equal, TaskList};
pub use session::{reconnect_delay, ConnectionState, SessionConfig, StreamObserver, StreamSession};
pub use view::{ActiveDrag, BoardViewModel, TaskInspector};
