//! Per-world state persistence.
//!
//! Each world's atmosphere is stored as a flat string map:
//!
//! | Field | Value |
//! |-------|-------|
//! | `season` | season id |
//! | `season_day` | day within the season, from 1 |
//! | `weather` | weather id (`night_cycle` while suspended) |
//! | `weather_duration` | remaining minutes |
//! | `previous_weather` | weather to restore at dawn; only while suspended |
//!
//! Absent fields mean "use the default". Unparsable values are logged and
//! treated as absent.
//!
//! Writes are fire-and-forget: [`Persistence`] forwards them over an
//! ordered channel to a writer task that owns the [`AtmosphereStore`].
//! Store failures are logged and never roll back in-memory state. Loads
//! travel through the same channel, so a load always observes every write
//! queued before it.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tempest_types::{SeasonKind, WeatherKind, WorldId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Field holding the season id.
pub const FIELD_SEASON: &str = "season";
/// Field holding the day within the season.
pub const FIELD_SEASON_DAY: &str = "season_day";
/// Field holding the live weather id.
pub const FIELD_WEATHER: &str = "weather";
/// Field holding the remaining weather minutes.
pub const FIELD_WEATHER_DURATION: &str = "weather_duration";
/// Field holding the weather saved during a night suspension.
pub const FIELD_PREVIOUS_WEATHER: &str = "previous_weather";

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// The persisted view of one world. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldRecord {
    /// Current season.
    pub season: Option<SeasonKind>,
    /// Day within the season.
    pub season_day: Option<u32>,
    /// Live weather.
    pub weather: Option<WeatherKind>,
    /// Remaining weather minutes.
    pub weather_duration: Option<u32>,
    /// Weather saved during a night suspension.
    pub previous_weather: Option<WeatherKind>,
}

impl WorldRecord {
    /// Decode a stored field map, dropping values that do not parse.
    pub fn from_fields(world: WorldId, fields: &BTreeMap<String, String>) -> Self {
        let season = parse_field(world, fields, FIELD_SEASON, SeasonKind::from_id);
        let season_day = parse_field(world, fields, FIELD_SEASON_DAY, |raw| {
            raw.parse::<u32>().ok().filter(|&day| day >= 1)
        });
        let weather = parse_field(world, fields, FIELD_WEATHER, WeatherKind::from_id);
        let weather_duration = parse_field(world, fields, FIELD_WEATHER_DURATION, |raw| {
            raw.parse::<u32>().ok()
        });
        let previous_weather = parse_field(world, fields, FIELD_PREVIOUS_WEATHER, |raw| {
            WeatherKind::from_id(raw).filter(|kind| kind.is_selectable())
        });
        Self {
            season,
            season_day,
            weather,
            weather_duration,
            previous_weather,
        }
    }

    /// Encode the present fields.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        if let Some(season) = self.season {
            fields.insert(FIELD_SEASON.to_owned(), season.id().to_owned());
        }
        if let Some(day) = self.season_day {
            fields.insert(FIELD_SEASON_DAY.to_owned(), day.to_string());
        }
        if let Some(weather) = self.weather {
            fields.insert(FIELD_WEATHER.to_owned(), weather.id().to_owned());
        }
        if let Some(minutes) = self.weather_duration {
            fields.insert(FIELD_WEATHER_DURATION.to_owned(), minutes.to_string());
        }
        if let Some(previous) = self.previous_weather {
            fields.insert(FIELD_PREVIOUS_WEATHER.to_owned(), previous.id().to_owned());
        }
        fields
    }
}

fn parse_field<T>(
    world: WorldId,
    fields: &BTreeMap<String, String>,
    name: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let raw = fields.get(name)?;
    let parsed = parse(raw);
    if parsed.is_none() {
        warn!(world = %world, field = name, value = raw, "Ignoring unparsable persisted value");
    }
    parsed
}

/// A key-value-per-world storage backend.
pub trait AtmosphereStore: Send + Sync + 'static {
    /// Every stored field of `world`. Unknown worlds yield an empty map.
    fn load(
        &self,
        world: WorldId,
    ) -> impl Future<Output = Result<BTreeMap<String, String>, StoreError>> + Send;

    /// Upsert `fields` for `world`, leaving other fields untouched.
    fn save(
        &self,
        world: WorldId,
        fields: BTreeMap<String, String>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete `fields` of `world`. Missing fields are ignored.
    fn remove(
        &self,
        world: WorldId,
        fields: Vec<String>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    worlds: Arc<Mutex<HashMap<WorldId, BTreeMap<String, String>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored for `world`.
    pub fn snapshot(&self, world: WorldId) -> BTreeMap<String, String> {
        self.worlds
            .lock()
            .map(|worlds| worlds.get(&world).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Overwrite one raw field, bypassing validation.
    pub fn insert_raw(&self, world: WorldId, field: &str, value: &str) {
        if let Ok(mut worlds) = self.worlds.lock() {
            worlds
                .entry(world)
                .or_default()
                .insert(field.to_owned(), value.to_owned());
        }
    }
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Backend {
        message: format!("memory store lock poisoned: {e}"),
    }
}

impl AtmosphereStore for MemoryStore {
    async fn load(&self, world: WorldId) -> Result<BTreeMap<String, String>, StoreError> {
        let worlds = self.worlds.lock().map_err(poisoned)?;
        Ok(worlds.get(&world).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        world: WorldId,
        fields: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut worlds = self.worlds.lock().map_err(poisoned)?;
        worlds.entry(world).or_default().extend(fields);
        Ok(())
    }

    async fn remove(&self, world: WorldId, fields: Vec<String>) -> Result<(), StoreError> {
        let mut worlds = self.worlds.lock().map_err(poisoned)?;
        if let Some(stored) = worlds.get_mut(&world) {
            for field in &fields {
                stored.remove(field);
            }
        }
        Ok(())
    }
}

enum Command {
    Save {
        world: WorldId,
        fields: BTreeMap<String, String>,
    },
    Remove {
        world: WorldId,
        fields: Vec<String>,
    },
    Load {
        world: WorldId,
        reply: oneshot::Sender<BTreeMap<String, String>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the persistence writer task.
#[derive(Debug)]
pub struct Persistence {
    tx: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Persistence {
    /// Spawn the writer task for `store`. Must be called inside a Tokio runtime.
    pub fn spawn<S: AtmosphereStore>(store: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(store, rx));
        Self {
            tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queue the present fields of `record`.
    pub fn save(&self, world: WorldId, record: &WorldRecord) {
        let fields = record.to_fields();
        if fields.is_empty() {
            return;
        }
        self.send(Command::Save { world, fields });
    }

    /// Queue removal of the saved night-suspension weather.
    pub fn clear_previous_weather(&self, world: WorldId) {
        self.send(Command::Remove {
            world,
            fields: vec![FIELD_PREVIOUS_WEATHER.to_owned()],
        });
    }

    /// Read `world`'s record after every previously queued write.
    ///
    /// Backend failures are logged and yield an empty record.
    pub async fn load(&self, world: WorldId) -> WorldRecord {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Load { world, reply });
        match rx.await {
            Ok(fields) => WorldRecord::from_fields(world, &fields),
            Err(_) => {
                warn!(world = %world, "Persistence writer gone, using defaults");
                WorldRecord::default()
            }
        }
    }

    /// Wait until every queued write has been handed to the store.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Flush { reply });
        if rx.await.is_err() {
            debug!("Persistence writer already stopped");
        }
    }

    /// Flush, then stop the writer task. Later writes are dropped with a warning.
    pub async fn close(&self) {
        self.flush().await;
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            task.abort();
            if let Err(e) = task.await
                && !e.is_cancelled()
            {
                warn!(error = %e, "Persistence writer ended abnormally");
            }
        }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("Persistence writer stopped, dropping command");
        }
    }
}

async fn run_writer<S: AtmosphereStore>(store: S, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Save { world, fields } => {
                if let Err(e) = store.save(world, fields).await {
                    warn!(world = %world, error = %e, "Failed to persist world state");
                }
            }
            Command::Remove { world, fields } => {
                if let Err(e) = store.remove(world, fields).await {
                    warn!(world = %world, error = %e, "Failed to remove persisted fields");
                }
            }
            Command::Load { world, reply } => {
                let fields = store.load(world).await.unwrap_or_else(|e| {
                    warn!(world = %world, error = %e, "Failed to load world state");
                    BTreeMap::new()
                });
                let _ = reply.send(fields);
            }
            Command::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }
    debug!("Persistence writer drained");
}
