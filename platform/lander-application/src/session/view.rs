use lander_domain::services::gate::{ActionAvailability, GateContext};
use lander_domain::services::history::{reward_trend, unzip_history};
use lander_domain::value_objects::snapshot::Snapshot;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedView {
    pub episodes: Vec<u64>,
    pub rewards: Vec<f64>,
    pub reward_trend: f64,
}

impl DerivedView {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let (episodes, rewards) = unzip_history(&snapshot.history_tail);
        Self {
            episodes,
            rewards,
            reward_trend: reward_trend(&snapshot.history_tail),
        }
    }
}

/// Secondary values derived from the latest snapshot, memoized by snapshot
/// identity.
#[derive(Debug, Default)]
pub struct SessionStateView {
    source: Option<Arc<Snapshot>>,
    derived: DerivedView,
    recomputations: u64,
}

impl SessionStateView {
    pub fn sync(&mut self, latest: Option<&Arc<Snapshot>>) -> &DerivedView {
        let unchanged = match (&self.source, latest) {
            (Some(held), Some(next)) => Arc::ptr_eq(held, next),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            self.derived = latest
                .map(|snapshot| DerivedView::from_snapshot(snapshot))
                .unwrap_or_default();
            self.source = latest.cloned();
            self.recomputations += 1;
        }
        &self.derived
    }

    pub fn derived(&self) -> &DerivedView {
        &self.derived
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    pub fn availability(&self, selected_weights: &str, in_flight: bool) -> ActionAvailability {
        ActionAvailability::from_context(&GateContext {
            snapshot: self.source.as_deref(),
            selected_weights,
            in_flight,
        })
    }
}
