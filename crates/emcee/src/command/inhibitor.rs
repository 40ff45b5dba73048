use std::sync::Arc;

use async_trait::async_trait;

use crate::command::types::CommandConfig;
use crate::message::ChatMessage;

/// When an inhibitor runs in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InhibitorPhase {
    /// After prefix resolution, before any command-specific logic. The
    /// command is not yet known to the check.
    Pre,
    /// After argument resolution and permission checks, with the resolved
    /// command in hand.
    Post,
}

/// A registered pass/fail check. Returning `true` from [`blocks`] rejects
/// the dispatch with this inhibitor's reason.
///
/// [`blocks`]: Inhibitor::blocks
#[async_trait]
pub trait Inhibitor: Send + Sync {
    fn id(&self) -> &str;

    fn phase(&self) -> InhibitorPhase;

    /// Higher priority runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Reason reported when this inhibitor blocks a message.
    fn reason(&self) -> &str {
        self.id()
    }

    async fn blocks(&self, message: &ChatMessage, command: Option<&CommandConfig>) -> bool;
}

/// Ordered inhibitor collection. First rejection wins.
#[derive(Default)]
pub struct InhibitorRegistry {
    entries: Vec<Arc<dyn Inhibitor>>,
}

impl InhibitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, inhibitor: Arc<dyn Inhibitor>) {
        self.entries.push(inhibitor);
        self.entries.sort_by_key(|i| std::cmp::Reverse(i.priority()));
    }

    /// Run every inhibitor of `phase` in priority order; the first one that
    /// blocks supplies the rejection reason.
    pub async fn test(
        &self,
        phase: InhibitorPhase,
        message: &ChatMessage,
        command: Option<&CommandConfig>,
    ) -> Option<String> {
        for inhibitor in self.entries.iter().filter(|i| i.phase() == phase) {
            if inhibitor.blocks(message, command).await {
                return Some(inhibitor.reason().to_string());
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        id: &'static str,
        phase: InhibitorPhase,
        priority: i32,
        blocks: bool,
    }

    #[async_trait]
    impl Inhibitor for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn phase(&self) -> InhibitorPhase {
            self.phase
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        async fn blocks(&self, _message: &ChatMessage, _command: Option<&CommandConfig>) -> bool {
            self.blocks
        }
    }

    #[tokio::test]
    async fn highest_priority_rejection_wins() {
        let mut registry = InhibitorRegistry::new();
        registry.register(Arc::new(Fixed {
            id: "low",
            phase: InhibitorPhase::Pre,
            priority: 0,
            blocks: true,
        }));
        registry.register(Arc::new(Fixed {
            id: "high",
            phase: InhibitorPhase::Pre,
            priority: 10,
            blocks: true,
        }));

        let message = ChatMessage::user("m1", "u1", "c1", "!x");
        let reason = registry.test(InhibitorPhase::Pre, &message, None).await;
        assert_eq!(reason.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn phases_are_isolated() {
        let mut registry = InhibitorRegistry::new();
        registry.register(Arc::new(Fixed {
            id: "post-only",
            phase: InhibitorPhase::Post,
            priority: 0,
            blocks: true,
        }));

        let message = ChatMessage::user("m1", "u1", "c1", "!x");
        assert!(registry
            .test(InhibitorPhase::Pre, &message, None)
            .await
            .is_none());
        assert!(registry
            .test(InhibitorPhase::Post, &message, None)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn passing_inhibitors_do_not_reject() {
        let mut registry = InhibitorRegistry::new();
        registry.register(Arc::new(Fixed {
            id: "pass",
            phase: InhibitorPhase::Pre,
            priority: 0,
            blocks: false,
        }));

        let message = ChatMessage::user("m1", "u1", "c1", "!x");
        assert!(registry
            .test(InhibitorPhase::Pre, &message, None)
            .await
            .is_none());
    }
}
