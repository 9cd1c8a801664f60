use crate::models::{AppData, Preferences, Profile, UserRecord};
use crate::tracker::{WeekTransition, WeeklyTracker};
use chrono::NaiveDate;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("tracker for {0} was modified concurrently")]
    Conflict(String),

    #[error("failed to write data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    }
}

/// Writes through a sibling temp file so a crash never leaves half a document.
pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// JSON-file backed profile and tracker store.
///
/// The mutex guards the in-memory document only while a snapshot is read or
/// a write is committed. Tracker writes are checked against the stored
/// revision, so a writer working from an old snapshot gets
/// [`StoreError::Conflict`] instead of overwriting newer progress.
#[derive(Clone)]
pub struct Store {
    data_path: PathBuf,
    data: Arc<Mutex<AppData>>,
    save_attempts: u32,
}

impl Store {
    pub fn new(data_path: PathBuf, data: AppData, save_attempts: u32) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            save_attempts: save_attempts.max(1),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub async fn load_profile(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        let data = self.data.lock().await;
        data.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }

    /// Absent users read as an empty record, which sends the calculator down
    /// its fallback path.
    pub async fn load_profile_or_default(&self, user_id: &str) -> UserRecord {
        self.load_profile(user_id).await.unwrap_or_default()
    }

    pub async fn save_profile(
        &self,
        user_id: &str,
        profile: Profile,
    ) -> Result<UserRecord, StoreError> {
        self.modify_user(user_id, |record| record.profile = profile).await
    }

    pub async fn save_preferences(
        &self,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<UserRecord, StoreError> {
        self.modify_user(user_id, |record| record.preferences = preferences)
            .await
    }

    pub async fn modify_user(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<UserRecord, StoreError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let record = next.users.entry(user_id.to_string()).or_default();
        apply(record);
        let updated = record.clone();

        persist_data(&self.data_path, &next).await?;
        *data = next;
        Ok(updated)
    }

    pub async fn load_tracker(&self, user_id: &str) -> Result<WeeklyTracker, StoreError> {
        let data = self.data.lock().await;
        data.trackers
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tracker for {user_id}")))
    }

    /// Zeroed tracker at revision 0. Nothing is stored until it is saved.
    pub fn create_tracker(&self, user_id: &str) -> WeeklyTracker {
        WeeklyTracker::new(user_id)
    }

    pub async fn load_or_create_tracker(&self, user_id: &str) -> Result<WeeklyTracker, StoreError> {
        match self.load_tracker(user_id).await {
            Err(StoreError::NotFound(_)) => Ok(self.create_tracker(user_id)),
            other => other,
        }
    }

    /// Commits `tracker` if nobody saved since it was loaded.
    pub async fn save_tracker(
        &self,
        mut tracker: WeeklyTracker,
    ) -> Result<WeeklyTracker, StoreError> {
        let mut data = self.data.lock().await;
        let stored_revision = data
            .trackers
            .get(&tracker.user_id)
            .map_or(0, |stored| stored.revision);
        if stored_revision != tracker.revision {
            return Err(StoreError::Conflict(tracker.user_id));
        }

        tracker.revision += 1;
        let mut next = data.clone();
        next.trackers.insert(tracker.user_id.clone(), tracker.clone());

        persist_data(&self.data_path, &next).await?;
        *data = next;
        Ok(tracker)
    }

    /// Loads (or creates) the tracker, brings it into the current week,
    /// applies `transform` and saves, retrying from a fresh load on conflict.
    pub async fn update_tracker<T>(
        &self,
        user_id: &str,
        today: NaiveDate,
        mut transform: impl FnMut(&mut WeeklyTracker) -> T,
    ) -> Result<(WeeklyTracker, T), StoreError> {
        let mut attempt = 1;
        loop {
            let mut tracker = self.load_or_create_tracker(user_id).await?;
            let transition = tracker.initialize_or_roll_week(today);
            if transition == WeekTransition::RolledOver {
                debug!("rolled tracker for {user_id} into week of {today}");
            }
            let output = transform(&mut tracker);

            match self.save_tracker(tracker).await {
                Ok(saved) => return Ok((saved, output)),
                Err(StoreError::Conflict(_)) if attempt < self.save_attempts => {
                    warn!(
                        "tracker conflict for {user_id}, retrying ({attempt}/{})",
                        self.save_attempts
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Tracker ready for reading in the week of `today`. Saves only when the
    /// week was initialized or rolled, or the day changed.
    pub async fn current_tracker(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<WeeklyTracker, StoreError> {
        let mut tracker = self.load_or_create_tracker(user_id).await?;
        if !tracker.initialize_or_roll_week(today).changed() {
            return Ok(tracker);
        }

        match self.save_tracker(tracker).await {
            // Someone else just wrote; their copy is already current.
            Err(StoreError::Conflict(_)) => {
                self.current_tracker_after_conflict(user_id, today).await
            }
            other => other,
        }
    }

    async fn current_tracker_after_conflict(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<WeeklyTracker, StoreError> {
        let (tracker, ()) = self.update_tracker(user_id, today, |_| ()).await?;
        Ok(tracker)
    }
}
