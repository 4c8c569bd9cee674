use serde::{Deserialize, Serialize};

use crate::ids::SpanId;

/// What a traced scope wraps. `LlmGeneration` and `ToolExecution` spans are
/// always nested under a `Run` span by the producing runtime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpanKind {
    Run,
    Step { name: String },
    LlmGeneration,
    ToolExecution,
}

/// A timed scope around one unit of execution. Spans are owned by the
/// runtime; the translation engine only observes their start/end. A span
/// ends at most once, after exactly one start.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub kind: SpanKind,
}

impl Span {
    pub fn run() -> Self {
        Self { id: SpanId::new(), kind: SpanKind::Run }
    }

    pub fn step(name: impl Into<String>) -> Self {
        Self { id: SpanId::new(), kind: SpanKind::Step { name: name.into() } }
    }

    pub fn llm_generation() -> Self {
        Self { id: SpanId::new(), kind: SpanKind::LlmGeneration }
    }

    pub fn tool_execution() -> Self {
        Self { id: SpanId::new(), kind: SpanKind::ToolExecution }
    }

    pub fn kind_str(&self) -> &'static str {
        match self.kind {
            SpanKind::Run => "run",
            SpanKind::Step { .. } => "step",
            SpanKind::LlmGeneration => "llm_generation",
            SpanKind::ToolExecution => "tool_execution",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(Span::run().kind, SpanKind::Run);
        assert_eq!(Span::llm_generation().kind, SpanKind::LlmGeneration);
        assert_eq!(Span::tool_execution().kind, SpanKind::ToolExecution);
        let step = Span::step("plan");
        assert_eq!(step.kind, SpanKind::Step { name: "plan".into() });
        assert_eq!(step.kind_str(), "step");
    }

    #[test]
    fn spans_get_distinct_ids() {
        assert_ne!(Span::run().id, Span::run().id);
    }
}
