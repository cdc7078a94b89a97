use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::models::Category;
use crate::repository::{existing_id, CategoryRepository, RepositoryError, Result};

pub struct LocalCategoryRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

impl LocalCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn replace_members(
        tx: &mut Transaction<'_, Sqlite>,
        category_id: i64,
        habit_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM habit_categories WHERE category_id = ?")
            .bind(category_id)
            .execute(&mut **tx)
            .await?;

        for habit_id in habit_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO habit_categories (habit_id, category_id) VALUES (?, ?)",
            )
            .bind(habit_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn hydrate_category(&self, row: CategoryRow) -> Result<Category> {
        let members: Vec<(i64,)> = sqlx::query_as(
            "SELECT habit_id FROM habit_categories WHERE category_id = ? ORDER BY habit_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Category {
            id: Some(row.id),
            name: row.name,
            habit_ids: members.into_iter().map(|(id,)| id).collect(),
        })
    }

    async fn hydrate_all(&self, rows: Vec<CategoryRow>) -> Result<Vec<Category>> {
        let mut categories = Vec::with_capacity(rows.len());
        for row in rows {
            categories.push(self.hydrate_category(row).await?);
        }
        Ok(categories)
    }
}

#[async_trait]
impl CategoryRepository for LocalCategoryRepository {
    async fn get_all(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_all(rows).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => self.hydrate_category(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn create(&self, category: &Category) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(&category.name)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        Self::replace_members(&mut tx, id, &category.habit_ids).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update(&self, category: &Category) -> Result<()> {
        let id = existing_id(category.id, "Category")?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(&category.name)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Category", id));
        }

        Self::replace_members(&mut tx, id, &category.habit_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            "DELETE FROM habit_categories WHERE category_id = ?",
            "DELETE FROM categories WHERE id = ?",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_for_habit(&self, habit_id: i64) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.name FROM categories c
            INNER JOIN habit_categories hc ON c.id = hc.category_id
            WHERE hc.habit_id = ?
            ORDER BY c.id
            "#,
        )
        .bind(habit_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_all(rows).await
    }

    async fn set_categories_for_habit(&self, habit_id: i64, category_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM habit_categories WHERE habit_id = ?")
            .bind(habit_id)
            .execute(&mut *tx)
            .await?;

        for category_id in category_ids {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(RepositoryError::not_found("Category", category_id));
            }

            sqlx::query(
                "INSERT OR IGNORE INTO habit_categories (habit_id, category_id) VALUES (?, ?)",
            )
            .bind(habit_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup;

    #[tokio::test]
    async fn test_create_and_find_category() {
        let db = setup().await;
        let repo = LocalCategoryRepository::new(db.pool.clone());

        let id = repo
            .create(&Category::new("Health").with_habits(vec![2, 1]))
            .await
            .unwrap();

        let fetched = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Health");
        assert_eq!(fetched.habit_ids, vec![1, 2]);
        assert!(repo.find_by_id(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_category_is_not_found() {
        let db = setup().await;
        let repo = LocalCategoryRepository::new(db.pool.clone());

        let mut category = Category::new("Ghost");
        category.id = Some(77);
        assert!(repo.update(&category).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_set_categories_for_habit() {
        let db = setup().await;
        let repo = LocalCategoryRepository::new(db.pool.clone());

        let health = repo.create(&Category::new("Health")).await.unwrap();
        let work = repo.create(&Category::new("Work")).await.unwrap();
        let home = repo.create(&Category::new("Home")).await.unwrap();

        repo.set_categories_for_habit(5, &[health, work]).await.unwrap();
        let names: Vec<String> = repo
            .get_for_habit(5)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Health", "Work"]);

        repo.set_categories_for_habit(5, &[home]).await.unwrap();
        let categories = repo.get_for_habit(5).await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, Some(home));
    }

    #[tokio::test]
    async fn test_set_unknown_category_is_not_found_and_keeps_links() {
        let db = setup().await;
        let repo = LocalCategoryRepository::new(db.pool.clone());

        let health = repo.create(&Category::new("Health")).await.unwrap();
        repo.set_categories_for_habit(5, &[health]).await.unwrap();

        let err = repo.set_categories_for_habit(5, &[999]).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(repo.get_for_habit(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_category_drops_links() {
        let db = setup().await;
        let repo = LocalCategoryRepository::new(db.pool.clone());

        let id = repo
            .create(&Category::new("Temp").with_habits(vec![1]))
            .await
            .unwrap();
        repo.delete(id).await.unwrap();
        repo.delete(id).await.unwrap();

        assert!(repo.get_for_habit(1).await.unwrap().is_empty());
        let (links,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM habit_categories")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(links, 0);
    }
}
