use async_trait::async_trait;

use super::client::{to_body, RemoteClient};
use super::schema::{narrow_category, widen_category, CategoriesEnvelope, CreatedId, RemoteCategory};
use crate::models::Category;
use crate::repository::{existing_id, CategoryRepository, RepositoryError, Result};

/// Categories over HTTP.
///
/// Membership lives on the category (`habits` list), so changing the
/// categories of one habit rewrites every category whose membership changes.
pub struct RemoteCategoryRepository {
    client: RemoteClient,
}

impl RemoteCategoryRepository {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    async fn fetch_all(&self) -> Result<Vec<RemoteCategory>> {
        let envelope: CategoriesEnvelope = self.client.get("categories", &[]).await?;
        Ok(envelope.categories)
    }

    async fn write(&self, id: i64, category: &RemoteCategory) -> Result<()> {
        let body = to_body(category)?;
        self.client
            .post(&format!("categories/update/{}", id), &[], Some(body))
            .await
    }
}

#[async_trait]
impl CategoryRepository for RemoteCategoryRepository {
    async fn get_all(&self) -> Result<Vec<Category>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .map(widen_category)
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .find(|c| c.id == Some(id))
            .map(widen_category))
    }

    async fn create(&self, category: &Category) -> Result<i64> {
        let mut remote = narrow_category(category);
        remote.id = None;
        let created: CreatedId = self
            .client
            .post_for("categories/add", to_body(&remote)?)
            .await?;

        created.id.ok_or_else(|| RepositoryError::IdentityUnresolved {
            title: category.name.clone(),
        })
    }

    async fn update(&self, category: &Category) -> Result<()> {
        let id = existing_id(category.id, "Category")?;
        if self.find_by_id(id).await?.is_none() {
            return Err(RepositoryError::not_found("Category", id));
        }
        self.write(id, &narrow_category(category)).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if self.find_by_id(id).await?.is_none() {
            tracing::debug!("Category {} not on remote; nothing to delete", id);
            return Ok(());
        }
        self.client
            .post(&format!("categories/delete/{}", id), &[], None)
            .await
    }

    async fn get_for_habit(&self, habit_id: i64) -> Result<Vec<Category>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .map(widen_category)
            .filter(|c| c.contains(habit_id))
            .collect())
    }

    async fn set_categories_for_habit(&self, habit_id: i64, category_ids: &[i64]) -> Result<()> {
        let categories = self.fetch_all().await?;

        for wanted in category_ids {
            if !categories.iter().any(|c| c.id == Some(*wanted)) {
                return Err(RepositoryError::not_found("Category", wanted));
            }
        }

        for mut category in categories {
            let Some(id) = category.id else { continue };
            let is_member = category.habits.contains(&habit_id);
            let should_be = category_ids.contains(&id);

            if is_member == should_be {
                continue;
            }
            if should_be {
                category.habits.push(habit_id);
            } else {
                category.habits.retain(|h| *h != habit_id);
            }
            self.write(id, &category).await?;
        }
        Ok(())
    }
}
