//! Weather transitions for one world.
//!
//! Every change goes through [`set_weather`]: the proposal is published,
//! and only if no observer vetoes is the new weather committed, its
//! effects started, the record persisted, and present entities told.
//!
//! While the night cycle is active the live weather is the sentinel and
//! its duration does not age. Seasonal reselection during that time
//! replaces the weather that will be restored at dawn instead of the live
//! one.

use tempest_types::WeatherKind;
use tracing::{debug, info, warn};

use crate::context::{Services, WeatherState, WorldContext};
use crate::host::HostError;

/// Propose `kind` for `duration_minutes` (zero means the default).
///
/// Returns `false` if an observer vetoed; nothing changes in that case.
pub(crate) async fn set_weather(
    ctx: &mut WorldContext,
    services: &Services,
    kind: WeatherKind,
    duration_minutes: u32,
) -> bool {
    let duration_minutes = if duration_minutes == 0 {
        services.settings.default_duration_minutes()
    } else {
        duration_minutes
    };
    let old = ctx.weather.kind;
    if services.bus.publish_weather_change(ctx.world, old, kind) {
        info!(world = %ctx.world, from = %old, to = %kind, "Weather change vetoed");
        return false;
    }

    ctx.weather = WeatherState {
        kind,
        remaining_minutes: duration_minutes,
    };
    info!(
        world = %ctx.world,
        from = %old,
        to = %kind,
        minutes = duration_minutes,
        "Weather changed"
    );

    services.effects.apply(ctx.world, kind).await;
    services.store.save(ctx.world, &ctx.record());
    sync_native(ctx, services, kind);
    announce(ctx, services, kind);
    true
}

/// Start the effects of a freshly loaded world without announcing anything.
pub(crate) async fn resume(ctx: &WorldContext, services: &Services) {
    services.effects.apply(ctx.world, ctx.weather.kind).await;
    sync_native(ctx, services, ctx.weather.kind);
}

/// Draw a seasonal weather and make it current.
///
/// During the night cycle the draw replaces the weather saved for dawn.
/// Returns `false` only if the live change was vetoed.
pub(crate) async fn reselect_seasonal(ctx: &mut WorldContext, services: &Services) -> bool {
    let (kind, minutes) = services.pick_seasonal(ctx.season.season);
    if ctx.night.active {
        // Dawn restores with the default duration.
        ctx.night.saved = Some(kind);
        services.store.save(ctx.world, &ctx.record());
        debug!(world = %ctx.world, saved = %kind, "Reselected weather held until dawn");
        return true;
    }
    set_weather(ctx, services, kind, minutes).await
}

/// Age the live weather by `minutes`, reselecting when it runs out.
///
/// Frozen while the night cycle is active. Returns whether a reselection
/// was attempted.
pub(crate) async fn decrease_duration(
    ctx: &mut WorldContext,
    services: &Services,
    minutes: u32,
) -> bool {
    if ctx.night.active || minutes == 0 {
        return false;
    }
    ctx.weather.remaining_minutes = ctx.weather.remaining_minutes.saturating_sub(minutes);
    if ctx.weather.remaining_minutes > 0 {
        services.store.save(ctx.world, &ctx.record());
        return false;
    }
    debug!(world = %ctx.world, weather = %ctx.weather.kind, "Weather expired");
    if !reselect_seasonal(ctx, services).await {
        // Keep the expired weather; the next tick tries again.
        services.store.save(ctx.world, &ctx.record());
    }
    true
}

/// Roll the configured change chance and reselect on success.
///
/// Returns whether the weather changed.
pub(crate) async fn try_probabilistic_change(ctx: &mut WorldContext, services: &Services) -> bool {
    if !services.roll_percent(services.settings.change_chance_percent()) {
        return false;
    }
    reselect_seasonal(ctx, services).await
}

fn sync_native(ctx: &WorldContext, services: &Services, kind: WeatherKind) {
    if let Err(e) = services.host.set_native_precipitation(
        ctx.world,
        kind.has_precipitation(),
        kind.is_thundering(),
    ) {
        warn!(world = %ctx.world, error = %e, "Could not update native precipitation");
    }
}

/// Tell every present entity about `kind`. The sentinel is never announced.
fn announce(ctx: &WorldContext, services: &Services, kind: WeatherKind) {
    if kind == WeatherKind::NightCycle {
        return;
    }
    let host = services.host.as_ref();
    let entities = match host.present_entities(ctx.world) {
        Ok(entities) => entities,
        Err(e) => {
            warn!(world = %ctx.world, error = %e, "Could not list entities for announcement");
            return;
        }
    };
    for entity in entities {
        match host.announce_weather(ctx.world, entity, kind) {
            Ok(()) | Err(HostError::EntityGone(_)) => {}
            Err(e) => {
                warn!(world = %ctx.world, entity = %entity, error = %e, "Announcement failed");
            }
        }
    }
}
