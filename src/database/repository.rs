use sqlx::SqlitePool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Drink, DrinkRow, Ingredient};

/// Single-statement CRUD access to the `drinks` table
#[derive(Clone)]
pub struct DrinkRepository {
    pool: SqlitePool,
}

impl DrinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn select_all(&self) -> Result<Vec<Drink>, DatabaseError> {
        let rows = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Drink::try_from(row).map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_one(&self, id: i64) -> Result<Option<Drink>, DatabaseError> {
        let row = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Drink::try_from).transpose().map_err(DatabaseError::from)
    }

    pub async fn select_404(&self, id: i64) -> Result<Drink, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("drink {}", id)))
    }

    pub async fn insert(&self, title: &str, recipe: &[Ingredient]) -> Result<Drink, DatabaseError> {
        let encoded = serde_json::to_string(recipe)?;
        let row = sqlx::query_as::<_, DrinkRow>(
            "INSERT INTO drinks (title, recipe) VALUES (?, ?) RETURNING id, title, recipe",
        )
        .bind(title)
        .bind(&encoded)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, title))?;

        Ok(Drink::try_from(row)?)
    }

    /// Overwrite title and recipe of an existing drink
    pub async fn update(&self, drink: &Drink) -> Result<Drink, DatabaseError> {
        let encoded = serde_json::to_string(&drink.recipe)?;
        let row = sqlx::query_as::<_, DrinkRow>(
            "UPDATE drinks SET title = ?, recipe = ? WHERE id = ? RETURNING id, title, recipe",
        )
        .bind(&drink.title)
        .bind(&encoded)
        .bind(drink.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, &drink.title))?
        .ok_or_else(|| DatabaseError::NotFound(format!("drink {}", drink.id)))?;

        Ok(Drink::try_from(row)?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("drink {}", id)));
        }
        Ok(())
    }
}

fn classify(err: sqlx::Error, title: &str) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::Conflict(format!("a drink titled '{}' already exists", title))
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::manager::DatabaseManager;

    async fn repository() -> DrinkRepository {
        let config = AppConfig::for_testing("example.auth0.com", "drinks");
        let pool = DatabaseManager::connect(&config.database).await.unwrap();
        DatabaseManager::ensure_schema(&pool).await.unwrap();
        DrinkRepository::new(pool)
    }

    fn water() -> Vec<Ingredient> {
        vec![Ingredient { name: "Water".into(), color: "blue".into(), parts: 1 }]
    }

    #[tokio::test]
    async fn insert_then_select_round_trips_recipe() {
        let repo = repository().await;
        let created = repo.insert("Water", &water()).await.unwrap();

        let fetched = repo.select_404(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.recipe, water());
    }

    #[tokio::test]
    async fn duplicate_title_is_a_conflict() {
        let repo = repository().await;
        repo.insert("Water", &water()).await.unwrap();
        let err = repo.insert("Water", &[]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn update_missing_drink_is_not_found() {
        let repo = repository().await;
        let ghost = Drink { id: 42, title: "Ghost".into(), recipe: vec![] };
        assert!(matches!(repo.update(&ghost).await, Err(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_row_and_ids_are_not_reused() {
        let repo = repository().await;
        let first = repo.insert("Water", &water()).await.unwrap();
        repo.delete(first.id).await.unwrap();

        assert!(repo.select_one(first.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(first.id).await, Err(DatabaseError::NotFound(_))));

        let second = repo.insert("Water", &water()).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn select_all_orders_by_id() {
        let repo = repository().await;
        repo.insert("B", &[]).await.unwrap();
        repo.insert("A", &water()).await.unwrap();
        let titles: Vec<String> = repo.select_all().await.unwrap().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["B".to_string(), "A".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_recipe_surfaces_as_serialization_error() {
        let repo = repository().await;
        sqlx::query("INSERT INTO drinks (title, recipe) VALUES ('Broken', '{oops')")
            .execute(repo.pool())
            .await
            .unwrap();
        assert!(matches!(repo.select_all().await, Err(DatabaseError::Serialization(_))));
    }
}
