//! libSQL backend: async `WellnessStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, Value, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::model::{ActivityCounts, ActivityKind, UserProfile};
use crate::store::traits::WellnessStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn opt_text(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

fn opt_int(n: Option<i64>) -> Value {
    match n {
        Some(n) => Value::Integer(n),
        None => Value::Null,
    }
}

fn opt_bool(b: Option<bool>) -> Value {
    opt_int(b.map(i64::from))
}

fn opt_real(n: Option<f64>) -> Value {
    match n {
        Some(n) => Value::Real(n),
        None => Value::Null,
    }
}

fn value_text(v: Value) -> Option<String> {
    match v {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

fn value_int(v: Value) -> Option<i64> {
    match v {
        Value::Integer(n) => Some(n),
        Value::Real(n) => Some(n as i64),
        _ => None,
    }
}

fn value_bool(v: Value) -> Option<bool> {
    value_int(v).map(|n| n != 0)
}

fn value_real(v: Value) -> Option<f64> {
    match v {
        Value::Real(n) => Some(n),
        Value::Integer(n) => Some(n as f64),
        _ => None,
    }
}

const PROFILE_COLUMNS: &str = "user_id, age, gender, height_cm, weight_kg, activity_level, \
     primary_goal, fitness_experience, daily_calorie_goal, health_conditions, medications, \
     allergies, sleep_hours, stress_level, bmi, smoking";

/// Map a libsql Row to a UserProfile. Column order matches PROFILE_COLUMNS.
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, libsql::Error> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        age: value_int(row.get_value(1)?),
        gender: value_text(row.get_value(2)?),
        height_cm: value_real(row.get_value(3)?),
        weight_kg: value_real(row.get_value(4)?),
        activity_level: value_text(row.get_value(5)?),
        primary_goal: value_text(row.get_value(6)?),
        fitness_experience: value_text(row.get_value(7)?),
        daily_calorie_goal: value_int(row.get_value(8)?),
        health_conditions: value_text(row.get_value(9)?),
        medications: value_text(row.get_value(10)?),
        allergies: value_text(row.get_value(11)?),
        sleep_hours: value_real(row.get_value(12)?),
        stress_level: value_text(row.get_value(13)?),
        bmi: value_real(row.get_value(14)?),
        smoking: value_bool(row.get_value(15)?),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl WellnessStore for LibSqlBackend {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?
        {
            Some(row) => row_to_profile(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_profile row: {e}"))),
            None => Ok(None),
        }
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO profiles (user_id, age, gender, height_cm, weight_kg, activity_level,
                    primary_goal, fitness_experience, daily_calorie_goal, health_conditions,
                    medications, allergies, sleep_hours, stress_level, bmi, smoking, created_at,
                    updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
                 ON CONFLICT(user_id) DO UPDATE SET
                    age = excluded.age,
                    gender = excluded.gender,
                    height_cm = excluded.height_cm,
                    weight_kg = excluded.weight_kg,
                    activity_level = excluded.activity_level,
                    primary_goal = excluded.primary_goal,
                    fitness_experience = excluded.fitness_experience,
                    daily_calorie_goal = excluded.daily_calorie_goal,
                    health_conditions = excluded.health_conditions,
                    medications = excluded.medications,
                    allergies = excluded.allergies,
                    sleep_hours = excluded.sleep_hours,
                    stress_level = excluded.stress_level,
                    bmi = excluded.bmi,
                    smoking = excluded.smoking,
                    updated_at = excluded.updated_at",
                params![
                    profile.user_id.as_str(),
                    opt_int(profile.age),
                    opt_text(profile.gender.as_deref()),
                    opt_real(profile.height_cm),
                    opt_real(profile.weight_kg),
                    opt_text(profile.activity_level.as_deref()),
                    opt_text(profile.primary_goal.as_deref()),
                    opt_text(profile.fitness_experience.as_deref()),
                    opt_int(profile.daily_calorie_goal),
                    opt_text(profile.health_conditions.as_deref()),
                    opt_text(profile.medications.as_deref()),
                    opt_text(profile.allergies.as_deref()),
                    opt_real(profile.sleep_hours),
                    opt_text(profile.stress_level.as_deref()),
                    opt_real(profile.bmi),
                    opt_bool(profile.smoking),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile: {e}")))?;

        debug!(user_id = %profile.user_id, "Profile upserted");
        Ok(())
    }

    async fn record_activity(
        &self,
        user_id: &str,
        kind: ActivityKind,
        description: &str,
    ) -> Result<(), DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO activities (id, user_id, kind, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    user_id,
                    kind.as_str(),
                    description,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_activity: {e}")))?;

        debug!(user_id = user_id, kind = %kind, "Activity recorded");
        Ok(())
    }

    async fn activity_counts(&self, user_id: &str) -> Result<ActivityCounts, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT kind, COUNT(*) FROM activities WHERE user_id = ?1 GROUP BY kind",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("activity_counts: {e}")))?;

        let mut counts = ActivityCounts::default();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("activity_counts: {e}")))?
        {
            let kind: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("activity_counts row: {e}")))?;
            let count: i64 = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("activity_counts row: {e}")))?;
            match kind.parse::<ActivityKind>() {
                Ok(ActivityKind::Meal) => counts.meals = count.max(0) as u64,
                Ok(ActivityKind::Workout) => counts.workouts = count.max(0) as u64,
                Err(e) => tracing::warn!("Skipping activity row: {e}"),
            }
        }
        Ok(counts)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
