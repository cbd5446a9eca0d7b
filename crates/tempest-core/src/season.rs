//! Season transitions for one world.

use tempest_types::SeasonKind;
use tracing::{debug, info};

use crate::context::{SeasonState, Services, WorldContext};
use crate::weather;

/// Outcome of advancing a world by one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayAdvance {
    /// Same season, new day.
    Advanced {
        /// The new day within the season.
        day: u32,
    },
    /// The season rolled over to day 1 of the next one.
    SeasonChanged {
        /// Season that ended.
        from: SeasonKind,
        /// Season that began.
        to: SeasonKind,
    },
    /// The rollover was vetoed. Season and day are unchanged.
    Vetoed,
}

/// Propose `season` at `day`. Days outside `1..=days_per_season` become 1.
///
/// On success the weather is reselected from the new season's pool.
/// Returns `false` if an observer vetoed.
pub(crate) async fn set_season(
    ctx: &mut WorldContext,
    services: &Services,
    season: SeasonKind,
    day: u32,
) -> bool {
    let days_per_season = services.settings.days_per_season();
    let day = if (1..=days_per_season).contains(&day) {
        day
    } else {
        debug!(world = %ctx.world, day, days_per_season, "Season day out of range, using 1");
        1
    };

    let old = ctx.season.season;
    if services.bus.publish_season_change(ctx.world, old, season) {
        info!(world = %ctx.world, from = %old, to = %season, "Season change vetoed");
        return false;
    }
    ctx.season = SeasonState { season, day };
    info!(world = %ctx.world, from = %old, to = %season, day, "Season set");

    weather::reselect_seasonal(ctx, services).await;
    services.store.save(ctx.world, &ctx.record());
    true
}

/// Move one day forward, rolling into the next season after the last day.
pub(crate) async fn advance_day(ctx: &mut WorldContext, services: &Services) -> DayAdvance {
    let next_day = ctx.season.day.saturating_add(1);
    if next_day <= services.settings.days_per_season() {
        ctx.season.day = next_day;
        services.store.save(ctx.world, &ctx.record());
        debug!(world = %ctx.world, season = %ctx.season.season, day = next_day, "New day");
        return DayAdvance::Advanced { day: next_day };
    }

    let from = ctx.season.season;
    let to = from.next();
    if services.bus.publish_season_change(ctx.world, from, to) {
        info!(world = %ctx.world, from = %from, to = %to, "Season rollover vetoed");
        return DayAdvance::Vetoed;
    }
    ctx.season = SeasonState { season: to, day: 1 };
    info!(world = %ctx.world, from = %from, to = %to, "Season changed");

    weather::reselect_seasonal(ctx, services).await;
    services.store.save(ctx.world, &ctx.record());
    DayAdvance::SeasonChanged { from, to }
}
