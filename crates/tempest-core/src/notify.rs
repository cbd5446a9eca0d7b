//! Synchronous, cancellable change notifications.
//!
//! Before a season or weather change is committed, every registered
//! [`ChangeObserver`] is consulted in registration order. All observers see
//! the proposal even after one has vetoed; the change proceeds only if
//! none vetoed. Observers run while the world's context is locked and must
//! not call back into the [`Atmosphere`](crate::engine::Atmosphere) for the
//! same world.

use std::sync::{Arc, RwLock};

use tempest_types::{SeasonKind, WeatherKind, WorldId};
use tracing::warn;

/// An observer's answer to a proposed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the change proceed.
    Allow,
    /// Block the change.
    Veto,
}

/// Receives season and weather change proposals.
pub trait ChangeObserver: Send + Sync {
    /// A world is about to move from `old` to `new` season.
    fn on_season_change(&self, _world: WorldId, _old: SeasonKind, _new: SeasonKind) -> Verdict {
        Verdict::Allow
    }

    /// A world is about to move from `old` to `new` weather.
    fn on_weather_change(&self, _world: WorldId, _old: WeatherKind, _new: WeatherKind) -> Verdict {
        Verdict::Allow
    }
}

/// Ordered set of observers.
#[derive(Default)]
pub struct NotificationBus {
    observers: RwLock<Vec<Arc<dyn ChangeObserver>>>,
}

impl NotificationBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are consulted in registration order.
    pub fn subscribe(&self, observer: Arc<dyn ChangeObserver>) {
        let Ok(mut observers) = self.observers.write() else {
            warn!("Observer list poisoned, subscription dropped");
            return;
        };
        observers.push(observer);
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.read().map_or(0, |observers| observers.len())
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Publish a season change. Returns `true` if any observer vetoed.
    pub fn publish_season_change(&self, world: WorldId, old: SeasonKind, new: SeasonKind) -> bool {
        self.publish(|observer| observer.on_season_change(world, old, new))
    }

    /// Publish a weather change. Returns `true` if any observer vetoed.
    pub fn publish_weather_change(
        &self,
        world: WorldId,
        old: WeatherKind,
        new: WeatherKind,
    ) -> bool {
        self.publish(|observer| observer.on_weather_change(world, old, new))
    }

    fn publish(&self, ask: impl Fn(&dyn ChangeObserver) -> Verdict) -> bool {
        let observers: Vec<Arc<dyn ChangeObserver>> = match self.observers.read() {
            Ok(observers) => observers.clone(),
            Err(_) => {
                warn!("Observer list poisoned, publishing to nobody");
                return false;
            }
        };
        let mut vetoed = false;
        for observer in &observers {
            if ask(observer.as_ref()) == Verdict::Veto {
                vetoed = true;
            }
        }
        vetoed
    }
}

impl core::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("observers", &self.len())
            .finish()
    }
}
