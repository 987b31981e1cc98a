//! Reconciliation passes driven by a knowledge base of skill suggestions

mod knowledge;
mod orchestrator;

pub use knowledge::{KnowledgeBase, SuggestedSkill};
pub use orchestrator::{GapKind, PassReport, ReconciliationOrchestrator, UnresolvedGap};
