use async_trait::async_trait;

use nova_core::{RitualKind, RitualStep};

/// Host hook that renders ritual steps (speech, visuals, sounds).
#[async_trait]
pub trait RitualEffects: Send + Sync {
    async fn perform(&self, ritual: RitualKind, step: &RitualStep);
}

/// Default sink: records each step as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEffects;

#[async_trait]
impl RitualEffects for LogEffects {
    async fn perform(&self, ritual: RitualKind, step: &RitualStep) {
        tracing::info!(
            ritual = %ritual,
            action = step.effect.action(),
            content = step.effect.content().unwrap_or(""),
            "ritual step"
        );
    }
}
