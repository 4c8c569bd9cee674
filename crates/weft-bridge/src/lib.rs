pub mod channel;
pub mod literal;
pub mod normalize;
pub mod processor;
pub mod state;

pub use channel::{EventDrain, EventSink, RunChannel};
pub use processor::{RuntimeProfile, SpanProcessor};
pub use state::RunState;
