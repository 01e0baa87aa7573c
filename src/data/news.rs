use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app::{ServiceError, ServiceResult},
    data::{Page, from_rows, paginate},
    proxy::ExternalDb,
    store::{Filters, OrderBy, TableOperation},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Read access to the news feed, newest first.
pub struct NewsService {
    db: Arc<ExternalDb>,
}

impl NewsService {
    pub fn new(db: Arc<ExternalDb>) -> Self {
        Self { db }
    }

    fn select_published(filters: Filters) -> TableOperation {
        TableOperation::Select {
            table: "news".to_string(),
            filters,
            projection: None,
            order: Some(OrderBy {
                column: "published_at".to_string(),
                ascending: Some(false),
            }),
            limit: None,
        }
    }

    pub async fn all_news(&self) -> ServiceResult<Vec<NewsArticle>> {
        from_rows(self.db.execute(Self::select_published(Filters::new())).await?)
    }

    pub async fn news_page(&self, page: usize, page_size: usize) -> ServiceResult<Page<NewsArticle>> {
        Ok(paginate(self.all_news().await?, page, page_size))
    }

    pub async fn all_news_by_category(&self, category: &str) -> ServiceResult<Vec<NewsArticle>> {
        let mut filters = Filters::new();
        filters.insert("category".to_string(), json!(category));
        from_rows(self.db.execute(Self::select_published(filters)).await?)
    }

    pub async fn news_by_category(
        &self,
        category: &str,
        page: usize,
        page_size: usize,
    ) -> ServiceResult<Page<NewsArticle>> {
        Ok(paginate(
            self.all_news_by_category(category).await?,
            page,
            page_size,
        ))
    }

    /// Case-insensitive substring match on the article title, done over the
    /// full table. A blank query short-circuits to an empty result.
    pub async fn search_news(&self, query: &str) -> ServiceResult<Vec<NewsArticle>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let articles = self.all_news().await?;
        Ok(articles
            .into_iter()
            .filter(|article| article.title.to_lowercase().contains(&query))
            .collect())
    }

    pub async fn news_by_id(&self, id: &str) -> ServiceResult<NewsArticle> {
        let mut filters = Filters::new();
        filters.insert("id".to_string(), json!(id));
        let rows = self
            .db
            .execute(TableOperation::Select {
                table: "news".to_string(),
                filters,
                projection: None,
                order: None,
                limit: None,
            })
            .await?;
        let mut articles = from_rows::<NewsArticle>(rows)?;
        if articles.is_empty() {
            return ServiceError::not_found("News article not found");
        }
        Ok(articles.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::store::{Row, memory::MemoryExternalStore};

    fn article_row(id: usize, title: &str, category: &str, day: u32) -> Row {
        json!({
            "id": format!("news-{}", id),
            "title": title,
            "category": category,
            "excerpt": "excerpt",
            "content": "content",
            "image_url": null,
            "author_id": null,
            "published_at": format!("2024-04-{:02}T12:00:00Z", day),
            "created_at": format!("2024-04-{:02}T09:00:00Z", day),
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn service_with(rows: Vec<Row>) -> NewsService {
        let store = Arc::new(MemoryExternalStore::new());
        store.seed("news", rows);
        NewsService::new(Arc::new(ExternalDb::new(store)))
    }

    #[tokio::test]
    async fn test_news_page_newest_first() {
        let service = service_with(vec![
            article_row(1, "Patch 1.1", "updates", 1),
            article_row(2, "Tournament finals", "esports", 15),
            article_row(3, "Patch 1.2", "updates", 20),
        ]);

        let page = service.news_page(1, 2).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].title, "Patch 1.2");
        assert_eq!(page.items[1].title, "Tournament finals");
    }

    #[tokio::test]
    async fn test_news_by_category_filters() {
        let service = service_with(vec![
            article_row(1, "Patch 1.1", "updates", 1),
            article_row(2, "Tournament finals", "esports", 15),
            article_row(3, "Patch 1.2", "updates", 20),
        ]);

        let page = service.news_by_category("updates", 1, 10).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert!(page.items.iter().all(|a| a.category == "updates"));
    }

    #[tokio::test]
    async fn test_search_news_by_title() {
        let service = service_with(vec![
            article_row(1, "Patch 1.1", "updates", 1),
            article_row(2, "Tournament finals", "esports", 15),
            article_row(3, "PATCH 1.2 hotfix", "updates", 20),
        ]);

        let found = service.search_news("patch").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(service.search_news("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_news_by_id_not_found() {
        let service = service_with(vec![article_row(1, "Patch 1.1", "updates", 1)]);

        assert_eq!(
            service.news_by_id("news-1").await.unwrap().title,
            "Patch 1.1"
        );
        let err = service.news_by_id("news-404").await.unwrap_err();
        assert_eq!(err.message(), "News article not found");
    }
}
