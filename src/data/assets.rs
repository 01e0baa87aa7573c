use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app::{ServiceError, ServiceResult},
    data::from_rows,
    proxy::ExternalDb,
    store::{Filters, OrderBy, TableOperation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Music,
    Image,
    Video,
    Other,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Music => "music",
            AssetType::Image => "image",
            AssetType::Video => "video",
            AssetType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub format: String,
    #[serde(default)]
    pub size: Option<String>,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
}

/// Read access to the downloadable-assets catalog, newest first.
pub struct AssetService {
    db: Arc<ExternalDb>,
}

impl AssetService {
    pub fn new(db: Arc<ExternalDb>) -> Self {
        Self { db }
    }

    fn select_newest(filters: Filters) -> TableOperation {
        TableOperation::Select {
            table: "assets".to_string(),
            filters,
            projection: None,
            order: Some(OrderBy {
                column: "created_at".to_string(),
                ascending: Some(false),
            }),
            limit: None,
        }
    }

    pub async fn all_assets(&self) -> ServiceResult<Vec<Asset>> {
        from_rows(self.db.execute(Self::select_newest(Filters::new())).await?)
    }

    pub async fn assets_by_type(&self, asset_type: AssetType) -> ServiceResult<Vec<Asset>> {
        let mut filters = Filters::new();
        filters.insert("type".to_string(), json!(asset_type.as_str()));
        from_rows(self.db.execute(Self::select_newest(filters)).await?)
    }

    pub async fn asset_by_id(&self, id: &str) -> ServiceResult<Asset> {
        let mut filters = Filters::new();
        filters.insert("id".to_string(), json!(id));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "assets".to_string(),
                filters,
                projection: None,
                order: None,
                limit: None,
            })
            .await?;
        let mut assets = from_rows::<Asset>(rows)?;
        if assets.is_empty() {
            return ServiceError::not_found("Asset not found");
        }
        Ok(assets.remove(0))
    }
}
