//! Weighted per-season weather pools.
//!
//! Each season draws its weather from a pool of `(kind, weight)` entries.
//! Weights are summed and a random value in `[0, total_weight)` walks the
//! cumulative distribution. The default pools give every kind weight 1, so
//! selection is uniform; configuration may replace any season's pool.
//!
//! An empty pool (or one whose weights sum to zero) yields
//! [`WeatherKind::ClearSky`].

use std::collections::BTreeMap;

use rand::Rng;
use tempest_types::{SeasonKind, WeatherKind};

use crate::config::{ConfigError, SeasonsConfig};

/// Weighted weather entries for one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPool {
    entries: Vec<(WeatherKind, u32)>,
}

impl WeightedPool {
    /// Build a pool from `(kind, weight)` entries. Sentinel kinds are dropped.
    pub fn new(entries: Vec<(WeatherKind, u32)>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(kind, _)| kind.is_selectable())
            .collect();
        Self { entries }
    }

    /// A pool giving each of `kinds` weight 1.
    pub fn uniform(kinds: &[WeatherKind]) -> Self {
        Self::new(kinds.iter().map(|&kind| (kind, 1)).collect())
    }

    /// Whether `kind` can be drawn from this pool.
    pub fn contains(&self, kind: WeatherKind) -> bool {
        self.entries
            .iter()
            .any(|&(entry, weight)| entry == kind && weight > 0)
    }

    /// Kinds in the pool, in entry order.
    pub fn kinds(&self) -> impl Iterator<Item = WeatherKind> + '_ {
        self.entries.iter().map(|&(kind, _)| kind)
    }

    /// Draw a kind.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> WeatherKind {
        let total = self.total_weight();
        if total == 0 {
            return WeatherKind::ClearSky;
        }
        self.select(rng.random_range(0..total))
    }

    /// Select the kind whose cumulative weight first exceeds `random_value`.
    fn select(&self, random_value: u32) -> WeatherKind {
        let mut cumulative: u32 = 0;
        for &(kind, weight) in &self.entries {
            cumulative = cumulative.saturating_add(weight);
            if random_value < cumulative {
                return kind;
            }
        }
        WeatherKind::ClearSky
    }

    /// Return the total weight (sum of all entry weights).
    fn total_weight(&self) -> u32 {
        let mut total: u32 = 0;
        for &(_, weight) in &self.entries {
            total = total.saturating_add(weight);
        }
        total
    }
}

/// The weighted pool of every season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonPools {
    pools: BTreeMap<SeasonKind, WeightedPool>,
}

impl SeasonPools {
    /// Uniform pools over each season's default kinds.
    pub fn defaults() -> Self {
        let pools = SeasonKind::ALL
            .into_iter()
            .map(|season| (season, WeightedPool::uniform(season.default_pool())))
            .collect();
        Self { pools }
    }

    /// Default pools with configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override names an unknown
    /// season or weather, or the night-cycle sentinel.
    pub fn from_config(config: &SeasonsConfig) -> Result<Self, ConfigError> {
        let mut pools = Self::defaults();
        for (season, entries) in config.pool_overrides()? {
            pools.pools.insert(season, WeightedPool::new(entries));
        }
        Ok(pools)
    }

    /// The pool for `season`.
    pub fn pool(&self, season: SeasonKind) -> Option<&WeightedPool> {
        self.pools.get(&season)
    }

    /// Draw a kind for `season`.
    pub fn pick<R: Rng + ?Sized>(&self, season: SeasonKind, rng: &mut R) -> WeatherKind {
        self.pools
            .get(&season)
            .map_or(WeatherKind::ClearSky, |pool| pool.pick(rng))
    }
}

impl Default for SeasonPools {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::config::PoolEntry;

    #[test]
    fn picks_stay_inside_the_season_pool() {
        let pools = SeasonPools::defaults();
        let mut rng = SmallRng::seed_from_u64(11);
        for season in SeasonKind::ALL {
            let pool = pools.pool(season).unwrap();
            for _ in 0..200 {
                let kind = pools.pick(season, &mut rng);
                assert!(pool.contains(kind), "{kind} not in {season} pool");
            }
        }
    }

    #[test]
    fn uniform_pool_reaches_every_kind() {
        let pools = SeasonPools::defaults();
        let mut rng = SmallRng::seed_from_u64(3);
        let seen: BTreeSet<WeatherKind> = (0..2_000)
            .map(|_| pools.pick(SeasonKind::Winter, &mut rng))
            .collect();
        assert_eq!(seen.len(), SeasonKind::Winter.default_pool().len());
    }

    #[test]
    fn empty_pool_falls_back_to_clear_sky() {
        let pool = WeightedPool::new(Vec::new());
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(pool.pick(&mut rng), WeatherKind::ClearSky);

        let zero = WeightedPool::new(vec![(WeatherKind::Fog, 0)]);
        assert_eq!(zero.pick(&mut rng), WeatherKind::ClearSky);
        assert!(!zero.contains(WeatherKind::Fog));
    }

    #[test]
    fn sentinel_is_dropped_from_pools() {
        let pool = WeightedPool::uniform(&[WeatherKind::NightCycle, WeatherKind::Mist]);
        assert_eq!(pool.kinds().collect::<Vec<_>>(), vec![WeatherKind::Mist]);
    }

    #[test]
    fn cumulative_selection_respects_weights() {
        let pool = WeightedPool::new(vec![(WeatherKind::Fog, 1), (WeatherKind::Mist, 3)]);
        assert_eq!(pool.select(0), WeatherKind::Fog);
        assert_eq!(pool.select(1), WeatherKind::Mist);
        assert_eq!(pool.select(3), WeatherKind::Mist);
        assert_eq!(pool.select(4), WeatherKind::ClearSky);
    }

    #[test]
    fn config_overrides_replace_one_season() {
        let mut config = SeasonsConfig::default();
        config.pools.insert(
            String::from("summer"),
            vec![PoolEntry::Id(String::from("drizzle"))],
        );
        let pools = SeasonPools::from_config(&config).unwrap();
        let summer = pools.pool(SeasonKind::Summer).unwrap();
        assert_eq!(summer.kinds().collect::<Vec<_>>(), vec![WeatherKind::Drizzle]);
        assert_eq!(
            pools.pool(SeasonKind::Spring).unwrap(),
            &WeightedPool::uniform(SeasonKind::Spring.default_pool())
        );
    }
}
