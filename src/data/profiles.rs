use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app::{ServiceError, ServiceResult},
    data::from_rows,
    proxy::ExternalDb,
    store::{Filters, OrderBy, Row, TableOperation},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Player columns embedded into the composite profile view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: String,
    pub elo: i64,
    pub tier: String,
    pub wins: i64,
    pub losses: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerProfile {
    #[serde(flatten)]
    pub profile: Profile,
    pub player_data: Option<PlayerSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub opponent_name: String,
    pub result: MatchResult,
    pub elo_change: i64,
    pub player_elo_before: i64,
    pub player_elo_after: i64,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponStat {
    pub weapon_name: String,
    pub times_used: i64,
    pub wins_with_weapon: i64,
    pub losses_with_weapon: i64,
}

const MATCH_HISTORY_LIMIT: u64 = 10;

/// Profile reads and the single write path of this layer (username/avatar
/// updates). The composite profile view is assembled from two sequential
/// store reads and is not atomic.
pub struct ProfileService {
    db: Arc<ExternalDb>,
}

impl ProfileService {
    pub fn new(db: Arc<ExternalDb>) -> Self {
        Self { db }
    }

    pub async fn profile(&self, user_id: &str) -> ServiceResult<Profile> {
        let mut filters = Filters::new();
        filters.insert("id".to_string(), json!(user_id));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "profiles".to_string(),
                filters,
                projection: None,
                order: None,
                limit: None,
            })
            .await?;
        let mut profiles = from_rows::<Profile>(rows)?;
        if profiles.is_empty() {
            return ServiceError::not_found("Profile not found");
        }
        Ok(profiles.remove(0))
    }

    pub async fn player_profile(&self, user_id: &str) -> ServiceResult<PlayerProfile> {
        let profile = self.profile(user_id).await?;

        let mut filters = Filters::new();
        filters.insert("user_id".to_string(), json!(user_id));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "players".to_string(),
                filters,
                projection: Some("id, elo, tier, wins, losses".to_string()),
                order: None,
                limit: None,
            })
            .await?;
        let player_data = from_rows::<PlayerSummary>(rows)?.into_iter().next();

        Ok(PlayerProfile {
            profile,
            player_data,
        })
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        username: Option<String>,
        avatar_url: Option<String>,
    ) -> ServiceResult<Profile> {
        let mut patch = Row::new();
        if let Some(username) = username {
            patch.insert("username".to_string(), json!(username));
        }
        if let Some(avatar_url) = avatar_url {
            patch.insert("avatar_url".to_string(), json!(avatar_url));
        }
        if patch.is_empty() {
            return ServiceError::not_possible("No fields to update");
        }

        let mut filters = Filters::new();
        filters.insert("id".to_string(), json!(user_id));
        let rows = self
            .db
            .execute(TableOperation::Update {
                table: "profiles".to_string(),
                filters,
                patch,
            })
            .await?;
        let mut profiles = from_rows::<Profile>(rows)?;
        if profiles.is_empty() {
            return ServiceError::not_found("Profile update failed");
        }
        Ok(profiles.remove(0))
    }

    pub async fn match_history(&self, player_id: &str) -> ServiceResult<Vec<MatchRecord>> {
        let mut filters = Filters::new();
        filters.insert("player_id".to_string(), json!(player_id));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "match_history".to_string(),
                filters,
                projection: None,
                order: Some(OrderBy {
                    column: "played_at".to_string(),
                    ascending: Some(false),
                }),
                limit: Some(MATCH_HISTORY_LIMIT),
            })
            .await?;
        from_rows(rows)
    }

    pub async fn weapon_stats(&self, player_id: &str) -> ServiceResult<Vec<WeaponStat>> {
        let mut filters = Filters::new();
        filters.insert("player_id".to_string(), json!(player_id));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "weapon_stats".to_string(),
                filters,
                projection: None,
                order: None,
                limit: None,
            })
            .await?;
        from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::store::memory::MemoryExternalStore;

    fn profile_row(id: &str, username: &str) -> Row {
        json!({
            "id": id,
            "username": username,
            "avatar_url": null,
            "created_at": "2024-01-01T00:00:00Z",
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn setup() -> (Arc<MemoryExternalStore>, ProfileService) {
        let store = Arc::new(MemoryExternalStore::new());
        (
            store.clone(),
            ProfileService::new(Arc::new(ExternalDb::new(store))),
        )
    }

    #[tokio::test]
    async fn test_player_profile_composite() {
        let (store, service) = setup();
        store.seed("profiles", vec![profile_row("u1", "one")]);
        store.seed(
            "players",
            vec![
                json!({
                    "id": "player-1",
                    "user_id": "u1",
                    "name": "one",
                    "elo": 1250,
                    "tier": "Gold",
                    "wins": 10,
                    "losses": 4,
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-02T00:00:00Z",
                })
                .as_object()
                .unwrap()
                .clone(),
            ],
        );

        let composite = service.player_profile("u1").await.unwrap();
        assert_eq!(composite.profile.username, "one");
        let player = composite.player_data.unwrap();
        assert_eq!(player.elo, 1250);
        assert_eq!(player.tier, "Gold");
    }

    #[tokio::test]
    async fn test_player_profile_without_player_row() {
        let (store, service) = setup();
        store.seed("profiles", vec![profile_row("u1", "one")]);

        let composite = service.player_profile("u1").await.unwrap();
        assert!(composite.player_data.is_none());
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let (_, service) = setup();
        let err = service.profile("missing").await.unwrap_err();
        assert_eq!(err.message(), "Profile not found");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (store, service) = setup();
        store.seed("profiles", vec![profile_row("u1", "one")]);

        let updated = service
            .update_profile("u1", Some("renamed".to_string()), None)
            .await
            .unwrap();
        assert_eq!(updated.username, "renamed");

        let err = service
            .update_profile("missing", Some("x".to_string()), None)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Profile update failed");

        let err = service.update_profile("u1", None, None).await.unwrap_err();
        assert_eq!(err.message(), "No fields to update");
    }

    #[tokio::test]
    async fn test_match_history_limit_and_order() {
        let (store, service) = setup();
        let rows = (1..=12)
            .map(|day| {
                json!({
                    "id": format!("match-{}", day),
                    "player_id": "player-1",
                    "opponent_name": "rival",
                    "result": if day % 2 == 0 { "win" } else { "loss" },
                    "elo_change": 12,
                    "player_elo_before": 1000,
                    "player_elo_after": 1012,
                    "played_at": format!("2024-05-{:02}T00:00:00Z", day),
                })
                .as_object()
                .unwrap()
                .clone()
            })
            .collect();
        store.seed("match_history", rows);

        let history = service.match_history("player-1").await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].id, "match-12");
        assert_eq!(history[0].result, MatchResult::Win);

        assert!(service.match_history("player-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weapon_stats_for_player() {
        let (store, service) = setup();
        store.seed(
            "weapon_stats",
            vec![
                json!({
                    "player_id": "player-1",
                    "weapon_name": "greatsword",
                    "times_used": 40,
                    "wins_with_weapon": 25,
                    "losses_with_weapon": 15,
                })
                .as_object()
                .unwrap()
                .clone(),
            ],
        );

        let stats = service.weapon_stats("player-1").await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].weapon_name, "greatsword");
    }
}
