//! `WellnessStore` trait: single async interface for all persistence.
//!
//! The dispatch graph only reads profiles and appends activity entries;
//! profile writes come from the HTTP surface.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::store::model::{ActivityCounts, ActivityKind, UserProfile};

/// Backend-agnostic store for profiles and the activity log.
#[async_trait]
pub trait WellnessStore: Send + Sync {
    /// Fetch a user's profile. Absence is a normal case.
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Insert or replace a profile.
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    /// Append an activity entry.
    async fn record_activity(
        &self,
        user_id: &str,
        kind: ActivityKind,
        description: &str,
    ) -> Result<(), DatabaseError>;

    /// Count logged meals and workouts for a user.
    async fn activity_counts(&self, user_id: &str) -> Result<ActivityCounts, DatabaseError>;
}
