//! Night-cycle suspension.
//!
//! At dusk the live weather is saved and replaced by
//! [`WeatherKind::NightCycle`], which runs no effects. At dawn the saved
//! weather comes back, or a fresh seasonal pick if none was saved. Both
//! transitions go through the ordinary weather path, so observers can veto
//! them like any other change.

use tempest_types::WeatherKind;
use tracing::{debug, info};

use crate::context::{NightCycleState, Services, WorldContext};
use crate::weather;

/// Suspend the world's weather for the night.
///
/// Returns `false` if already suspended, if the sentinel is already live,
/// or if the change was vetoed. A vetoed suspension leaves the world
/// running its current weather through the night.
pub(crate) async fn begin_night(ctx: &mut WorldContext, services: &Services) -> bool {
    if ctx.night.active || ctx.weather.kind == WeatherKind::NightCycle {
        return false;
    }
    let current = ctx.weather.kind;
    if !weather::set_weather(ctx, services, WeatherKind::NightCycle, 0).await {
        return false;
    }
    ctx.night = NightCycleState {
        active: true,
        saved: Some(current),
    };
    services.store.save(ctx.world, &ctx.record());
    info!(world = %ctx.world, saved = %current, "Night cycle started");
    true
}

/// Restore the weather saved at dusk.
///
/// Returns `false` if the world was not suspended.
pub(crate) async fn end_night(ctx: &mut WorldContext, services: &Services) -> bool {
    if !ctx.night.active {
        return false;
    }
    let saved = ctx.night.saved.take();
    ctx.night.active = false;
    services.store.clear_previous_weather(ctx.world);

    let restored = match saved {
        Some(kind) => weather::set_weather(ctx, services, kind, 0).await,
        None => weather::reselect_seasonal(ctx, services).await,
    };
    if restored {
        info!(world = %ctx.world, weather = %ctx.weather.kind, "Night cycle ended");
    } else {
        debug!(world = %ctx.world, "Dawn restore vetoed, sentinel stays until it expires");
    }
    true
}

/// Run the transition for a clock edge into night (`true`) or day.
pub(crate) async fn on_clock_edge(
    ctx: &mut WorldContext,
    services: &Services,
    is_night: bool,
) -> bool {
    if is_night {
        begin_night(ctx, services).await
    } else {
        end_night(ctx, services).await
    }
}
