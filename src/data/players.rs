use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app::{ServiceError, ServiceResult},
    data::{Page, from_rows, paginate},
    proxy::ExternalDb,
    store::{Filters, OrderBy, TableOperation},
    tier::is_tier_consistent,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub elo: i64,
    pub tier: String,
    pub wins: i64,
    pub losses: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read access to the community leaderboard. Search and pagination happen
/// over the full fetched set; only equality filters, one sort key and a row
/// limit are pushed to the store.
pub struct RankingService {
    db: Arc<ExternalDb>,
}

impl RankingService {
    pub fn new(db: Arc<ExternalDb>) -> Self {
        Self { db }
    }

    fn select_by_elo(limit: Option<u64>) -> TableOperation {
        TableOperation::Select {
            table: "players".to_string(),
            filters: Filters::new(),
            projection: None,
            order: Some(OrderBy {
                column: "elo".to_string(),
                ascending: Some(false),
            }),
            limit,
        }
    }

    pub async fn top_players(&self, limit: u64) -> ServiceResult<Vec<Player>> {
        let players = from_rows(self.db.execute(Self::select_by_elo(Some(limit))).await?)?;
        check_stored_tiers(&players);
        Ok(players)
    }

    pub async fn all_players(&self) -> ServiceResult<Vec<Player>> {
        let players = from_rows(self.db.execute(Self::select_by_elo(None)).await?)?;
        check_stored_tiers(&players);
        Ok(players)
    }

    pub async fn players_page(&self, page: usize, page_size: usize) -> ServiceResult<Page<Player>> {
        Ok(paginate(self.all_players().await?, page, page_size))
    }

    /// Case-insensitive substring match on the player name, done over the
    /// full table. A blank query short-circuits to an empty result.
    pub async fn search_players(&self, query: &str) -> ServiceResult<Vec<Player>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let players = self.all_players().await?;
        Ok(players
            .into_iter()
            .filter(|player| player.name.to_lowercase().contains(&query))
            .collect())
    }

    pub async fn player_by_name(&self, name: &str) -> ServiceResult<Player> {
        let mut filters = Filters::new();
        filters.insert("name".to_string(), json!(name));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "players".to_string(),
                filters,
                projection: None,
                order: None,
                limit: None,
            })
            .await?;
        let mut players = from_rows::<Player>(rows)?;
        if players.is_empty() {
            return ServiceError::not_found("Player not found");
        }
        Ok(players.remove(0))
    }
}

/// The stored tier label is expected to track the ELO but is not enforced
/// transactionally by the store; surface drift instead of hiding it.
fn check_stored_tiers(players: &[Player]) {
    for player in players {
        if !is_tier_consistent(player.elo, &player.tier) {
            warn!(
                "Stored tier '{}' does not match elo {} for player {}",
                player.tier, player.elo, player.name
            );
        }
    }
}
