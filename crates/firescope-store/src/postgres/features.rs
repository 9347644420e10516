use async_trait::async_trait;
use firescope_core::error::{FirescopeError, Result};
use firescope_core::models::{Feature, FeatureId, FeatureSet, Geometry, TableName};
use firescope_core::ports::FeatureStore;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;

use super::{db_error, is_undefined_table, PostgresStore};

pub(crate) fn create_feature_table_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE {} (oid BIGINT PRIMARY KEY, shape JSONB, attributes JSONB NOT NULL DEFAULT '{{}}'::jsonb)",
        table.quoted()
    )
}

fn to_oid(id: FeatureId) -> Result<i64> {
    i64::try_from(id.0).map_err(|_| FirescopeError::InvalidIdentifier {
        value: id.to_string(),
        reason: "feature id does not fit in BIGINT".to_string(),
    })
}

fn to_oids(ids: &[FeatureId]) -> Result<Vec<i64>> {
    ids.iter().copied().map(to_oid).collect()
}

fn from_oid(oid: i64) -> Result<FeatureId> {
    u64::try_from(oid).map(FeatureId).map_err(|_| FirescopeError::InvalidIdentifier {
        value: oid.to_string(),
        reason: "feature id must not be negative".to_string(),
    })
}

fn feature_from_row(row: &PgRow) -> Result<Feature> {
    let oid: i64 = row.try_get("oid").map_err(|e| db_error("Failed to read oid", e))?;
    let shape: Option<serde_json::Value> =
        row.try_get("shape").map_err(|e| db_error("Failed to read shape", e))?;
    let attributes: serde_json::Value =
        row.try_get("attributes").map_err(|e| db_error("Failed to read attributes", e))?;

    let geometry = shape.map(serde_json::from_value::<Geometry>).transpose()?;
    let properties: HashMap<String, serde_json::Value> = serde_json::from_value(attributes)?;

    Ok(Feature { id: from_oid(oid)?, geometry, properties })
}

impl PostgresStore {
    fn map_set_error(set: &TableName, context: &str, e: sqlx::Error) -> FirescopeError {
        if is_undefined_table(&e) {
            FirescopeError::FeatureSetNotFound { name: set.to_string() }
        } else {
            db_error(context, e)
        }
    }
}

#[async_trait]
impl FeatureStore for PostgresStore {
    async fn create_feature_set(&self, set: &FeatureSet) -> Result<TableName> {
        let table = TableName::parse(&set.name)?;
        let mut tx =
            self.pool.begin().await.map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.quoted()))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to drop feature set", e))?;

        sqlx::query(&create_feature_table_sql(&table))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to create feature set", e))?;

        let insert = format!(
            "INSERT INTO {} (oid, shape, attributes) VALUES ($1, $2, $3)",
            table.quoted()
        );
        for feature in &set.features {
            let shape = feature.geometry.as_ref().map(serde_json::to_value).transpose()?;
            sqlx::query(&insert)
                .bind(to_oid(feature.id)?)
                .bind(shape)
                .bind(serde_json::to_value(&feature.properties)?)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                        FirescopeError::DuplicateFeature { set: set.name.clone(), id: feature.id.0 }
                    } else {
                        db_error("Failed to insert feature", e)
                    }
                })?;
        }

        tx.commit().await.map_err(|e| db_error("Failed to commit feature set", e))?;
        tracing::debug!(feature_set = %table, features = set.features.len(), "Feature set stored");
        Ok(table)
    }

    async fn list_features(&self, set: &TableName) -> Result<Vec<Feature>> {
        let rows = sqlx::query(&format!(
            "SELECT oid, shape, attributes FROM {} ORDER BY oid",
            set.quoted()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::map_set_error(set, "Failed to list features", e))?;

        rows.iter().map(feature_from_row).collect()
    }

    async fn get_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<Vec<Feature>> {
        let rows = sqlx::query(&format!(
            "SELECT oid, shape, attributes FROM {} WHERE oid = ANY($1) ORDER BY oid",
            set.quoted()
        ))
        .bind(to_oids(ids)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::map_set_error(set, "Failed to get features", e))?;

        rows.iter().map(feature_from_row).collect()
    }

    async fn update_geometry(
        &self,
        set: &TableName,
        id: FeatureId,
        geometry: &Geometry,
    ) -> Result<()> {
        let result = sqlx::query(&format!("UPDATE {} SET shape = $2 WHERE oid = $1", set.quoted()))
            .bind(to_oid(id)?)
            .bind(serde_json::to_value(geometry)?)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_set_error(set, "Failed to update geometry", e))?;

        if result.rows_affected() == 0 {
            return Err(FirescopeError::FeatureNotFound { set: set.to_string(), id: id.0 });
        }
        Ok(())
    }

    async fn delete_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<usize> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE oid = ANY($1)", set.quoted()))
            .bind(to_oids(ids)?)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_set_error(set, "Failed to delete features", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn feature_count(&self, set: &TableName) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", set.quoted()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_set_error(set, "Failed to count features", e))?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sql_quotes_name() {
        let table = TableName::parse("fire.fhsz_sra").unwrap();
        let sql = create_feature_table_sql(&table);
        assert!(sql.starts_with("CREATE TABLE \"fire\".\"fhsz_sra\" (oid BIGINT PRIMARY KEY"));
        assert!(sql.contains("'{}'::jsonb"));
    }

    #[test]
    fn test_oid_range() {
        assert_eq!(to_oid(FeatureId(7)).unwrap(), 7);
        assert!(to_oid(FeatureId(u64::MAX)).is_err());
        assert_eq!(to_oids(&[FeatureId(1), FeatureId(2)]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_negative_oid_is_rejected() {
        assert_eq!(from_oid(42).unwrap(), FeatureId(42));
        assert!(matches!(from_oid(-1), Err(FirescopeError::InvalidIdentifier { .. })));
    }
}
