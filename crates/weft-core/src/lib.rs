pub mod errors;
pub mod ids;
pub mod messages;
pub mod protocol;
pub mod span;
pub mod trace;

pub use errors::TranslateError;
pub use protocol::{Role, UiEvent};
pub use span::{Span, SpanKind};
pub use trace::TraceEvent;
