//! Settings manager for application settings and feature flags

use async_trait::async_trait;
use nimbus_transfers::{Feature, FeatureFlagRepository};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use tracing::{debug, info};

use crate::entities::settings;
use crate::error::Result;

/// Settings manager for storing and retrieving application settings
pub struct SettingsManager {
    db: DatabaseConnection,
}

impl SettingsManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a setting value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        debug!("Getting setting: {}", key);

        let result = settings::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?;

        Ok(result.map(|model| model.value))
    }

    /// Set a setting value
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        upsert(&txn, key, value).await?;
        txn.commit().await?;

        info!("Setting '{}' updated", key);
        Ok(())
    }

    /// Set multiple settings in one transaction
    pub async fn set_many(&self, items: &[(String, String)]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        for (key, value) in items {
            upsert(&txn, key, value).await?;
        }
        txn.commit().await?;

        info!("Set {} settings", items.len());
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = settings::Entity::delete_by_id(key.to_string())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn get_all(&self) -> Result<Vec<(String, String)>> {
        let settings = settings::Entity::find().all(&self.db).await?;

        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }

    /// Unset flags read as disabled; any value other than "true" counts as off
    pub async fn is_feature_enabled(&self, feature: Feature) -> Result<bool> {
        Ok(self.get(feature.key()).await?.as_deref() == Some("true"))
    }

    pub async fn set_feature(&self, feature: Feature, enabled: bool) -> Result<()> {
        self.set(feature.key(), if enabled { "true" } else { "false" })
            .await
    }
}

async fn upsert<C: sea_orm::ConnectionTrait>(db: &C, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();

    let existing = settings::Entity::find_by_id(key.to_string()).one(db).await?;

    if let Some(model) = existing {
        let mut active_model: settings::ActiveModel = model.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_setting = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
        };
        match new_setting.insert(db).await {
            Ok(_) | Err(DbErr::RecordNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[async_trait]
impl FeatureFlagRepository for SettingsManager {
    async fn is_enabled(&self, feature: Feature) -> nimbus_transfers::Result<bool> {
        Ok(self.is_feature_enabled(feature).await?)
    }
}
