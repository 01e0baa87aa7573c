use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    app::{AppState, ServiceError},
    data::{
        assets::{Asset, AssetType},
        news::NewsArticle,
        paginate,
        players::Player,
        profiles::{MatchRecord, PlayerProfile, Profile, WeaponStat},
    },
    http::PaginatedResponse,
    jwt::Claims,
    tier::Tier,
};

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<usize>,
    per_page: Option<usize>,
    search: Option<String>,
    category: Option<String>,
}

impl PageQuery {
    fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    fn per_page(&self) -> usize {
        self.per_page.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
pub struct TopQuery {
    limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct AssetsQuery {
    #[serde(rename = "type")]
    asset_type: Option<AssetType>,
}

#[derive(Serialize)]
pub struct TierBracket {
    pub tier: Tier,
    pub min_elo: i64,
    pub max_elo: Option<i64>,
}

/// The fixed tier brackets, for display next to the leaderboard.
pub async fn get_tiers() -> Json<Vec<TierBracket>> {
    Json(
        Tier::ALL
            .into_iter()
            .map(|tier| {
                let (min_elo, max_elo) = tier.range();
                TierBracket {
                    tier,
                    min_elo,
                    max_elo,
                }
            })
            .collect(),
    )
}

pub async fn get_players(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<Player>>, ServiceError> {
    let page = match query.search() {
        Some(search) => {
            let players = state.ranking_service.search_players(search).await?;
            paginate(players, query.page(), query.per_page())
        }
        None => {
            state
                .ranking_service
                .players_page(query.page(), query.per_page())
                .await?
        }
    };
    Ok(Json(page.into()))
}

pub async fn get_top_players(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<Player>>, ServiceError> {
    let limit = query.limit.filter(|&l| l > 0).unwrap_or(5);
    Ok(Json(state.ranking_service.top_players(limit).await?))
}

pub async fn get_player_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Player>, ServiceError> {
    Ok(Json(state.ranking_service.player_by_name(&name).await?))
}

pub async fn get_match_history(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<MatchRecord>>, ServiceError> {
    Ok(Json(state.profile_service.match_history(&player_id).await?))
}

pub async fn get_weapon_stats(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<WeaponStat>>, ServiceError> {
    Ok(Json(state.profile_service.weapon_stats(&player_id).await?))
}

pub async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<NewsArticle>>, ServiceError> {
    let page = if let Some(search) = query.search() {
        let articles = state.news_service.search_news(search).await?;
        paginate(articles, query.page(), query.per_page())
    } else {
        match query.category.as_deref().filter(|c| *c != "all") {
            Some(category) => {
                state
                    .news_service
                    .news_by_category(category, query.page(), query.per_page())
                    .await?
            }
            None => {
                state
                    .news_service
                    .news_page(query.page(), query.per_page())
                    .await?
            }
        }
    };
    Ok(Json(page.into()))
}

pub async fn get_news_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NewsArticle>, ServiceError> {
    Ok(Json(state.news_service.news_by_id(&id).await?))
}

pub async fn get_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetsQuery>,
) -> Result<Json<Vec<Asset>>, ServiceError> {
    let assets = match query.asset_type {
        Some(asset_type) => state.asset_service.assets_by_type(asset_type).await?,
        None => state.asset_service.all_assets().await?,
    };
    Ok(Json(assets))
}

pub async fn get_asset_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Asset>, ServiceError> {
    Ok(Json(state.asset_service.asset_by_id(&id).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PlayerProfile>, ServiceError> {
    Ok(Json(state.profile_service.player_profile(&user_id).await?))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    username: Option<String>,
    avatar_url: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    claims: Claims,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ServiceError> {
    if claims.sub != user_id {
        return ServiceError::forbidden("You can only update your own profile");
    }
    let profile = state
        .profile_service
        .update_profile(&user_id, request.username, request.avatar_url)
        .await?;
    Ok(Json(profile))
}
