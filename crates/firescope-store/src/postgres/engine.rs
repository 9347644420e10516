use async_trait::async_trait;
use firescope_core::error::{FirescopeError, Result};
use firescope_core::models::{
    BoundedScan, BuildingAttributes, BuildingRecord, Geometry, RemoteDataset, TableName,
    BUILDING_COLUMNS,
};
use firescope_core::ports::TableEngine;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{db_error, is_undefined_table, PostgresStore};

/// PostgreSQL type of each materialized building column, in table order
const BUILDING_COLUMN_TYPES: [(&str, &str); 21] = [
    ("id", "TEXT"),
    ("source", "TEXT"),
    ("subtype", "TEXT"),
    ("class", "TEXT"),
    ("level", "INTEGER"),
    ("has_parts", "BOOLEAN"),
    ("height", "DOUBLE PRECISION"),
    ("is_underground", "BOOLEAN"),
    ("num_floors", "INTEGER"),
    ("num_floors_underground", "INTEGER"),
    ("min_height", "DOUBLE PRECISION"),
    ("min_floor", "INTEGER"),
    ("facade_color", "TEXT"),
    ("facade_material", "TEXT"),
    ("roof_material", "TEXT"),
    ("roof_shape", "TEXT"),
    ("roof_direction", "DOUBLE PRECISION"),
    ("roof_orientation", "TEXT"),
    ("roof_color", "TEXT"),
    ("roof_height", "DOUBLE PRECISION"),
    ("geom", "geometry"),
];

fn quoted_columns() -> String {
    BUILDING_COLUMNS.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
}

pub(crate) fn create_building_table_sql(target: &TableName) -> String {
    let columns = BUILDING_COLUMN_TYPES
        .iter()
        .map(|(name, ty)| format!("\"{}\" {}", name, ty))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", target.quoted(), columns)
}

/// `INSERT … SELECT` copying strictly contained rows from `source`
///
/// Binds `$1..$4` as the box `xmin, ymin, xmax, ymax`. The `source` column is
/// the `dataset` of the first `sources` entry; every other column is copied
/// as is, `geometry` landing in `geom`.
pub(crate) fn insert_scan_sql(target: &TableName, source: &TableName) -> String {
    let projection = BUILDING_COLUMNS
        .iter()
        .map(|column| match *column {
            "source" => "(\"sources\"::jsonb -> 0 ->> 'dataset')".to_string(),
            "geom" => "\"geometry\"".to_string(),
            other => format!("\"{}\"", other),
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} \
         WHERE (\"bbox\").xmin > $1 AND (\"bbox\").xmax < $3 \
         AND (\"bbox\").ymin > $2 AND (\"bbox\").ymax < $4",
        target.quoted(),
        quoted_columns(),
        projection,
        source.quoted()
    )
}

fn building_from_row(row: &PgRow) -> Result<BuildingRecord> {
    fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get(column).map_err(|e| db_error(&format!("Failed to read {}", column), e))
    }

    let geom: serde_json::Value = get(row, "geom")?;
    Ok(BuildingRecord {
        id: get(row, "id")?,
        source: get(row, "source")?,
        attributes: BuildingAttributes {
            subtype: get(row, "subtype")?,
            class: get(row, "class")?,
            level: get(row, "level")?,
            has_parts: get(row, "has_parts")?,
            height: get(row, "height")?,
            is_underground: get(row, "is_underground")?,
            num_floors: get(row, "num_floors")?,
            num_floors_underground: get(row, "num_floors_underground")?,
            min_height: get(row, "min_height")?,
            min_floor: get(row, "min_floor")?,
            facade_color: get(row, "facade_color")?,
            facade_material: get(row, "facade_material")?,
            roof_material: get(row, "roof_material")?,
            roof_shape: get(row, "roof_shape")?,
            roof_direction: get(row, "roof_direction")?,
            roof_orientation: get(row, "roof_orientation")?,
            roof_color: get(row, "roof_color")?,
            roof_height: get(row, "roof_height")?,
        },
        geom: serde_json::from_value::<Geometry>(geom)?,
    })
}

impl PostgresStore {
    fn map_table_error(table: &TableName, context: &str, e: sqlx::Error) -> FirescopeError {
        if is_undefined_table(&e) {
            FirescopeError::TableNotFound { name: table.to_string() }
        } else {
            db_error(context, e)
        }
    }
}

#[async_trait]
impl TableEngine for PostgresStore {
    async fn replace_from_scan(&self, target: &TableName, scan: &BoundedScan) -> Result<u64> {
        let source = match &scan.source {
            RemoteDataset::Relation(table) => table,
            RemoteDataset::Uri(uri) => {
                return Err(FirescopeError::UnsupportedDataset {
                    reference: uri.clone(),
                    engine: "PostgreSQL".to_string(),
                })
            }
        };

        let mut tx =
            self.pool.begin().await.map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", target.quoted()))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to drop target table", e))?;

        sqlx::query(&create_building_table_sql(target))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to create target table", e))?;

        let inserted = sqlx::query(&insert_scan_sql(target, source))
            .bind(scan.bbox.xmin)
            .bind(scan.bbox.ymin)
            .bind(scan.bbox.xmax)
            .bind(scan.bbox.ymax)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_undefined_table(&e) {
                    FirescopeError::DatasetNotFound { reference: source.to_string() }
                } else {
                    db_error("Failed to copy bounded rows", e)
                }
            })?;

        tx.commit().await.map_err(|e| db_error("Failed to commit extract", e))?;
        Ok(inserted.rows_affected())
    }

    async fn count_rows(&self, table: &TableName) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.quoted()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_table_error(table, "Failed to count rows", e))?;

        Ok(count as u64)
    }

    async fn read_buildings(&self, table: &TableName) -> Result<Vec<BuildingRecord>> {
        let columns = BUILDING_COLUMNS
            .iter()
            .map(|c| match *c {
                "geom" => "ST_AsGeoJSON(\"geom\")::jsonb AS geom".to_string(),
                other => format!("\"{}\"", other),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} ORDER BY \"id\"",
            columns,
            table.quoted()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::map_table_error(table, "Failed to read buildings", e))?;

        rows.iter().map(building_from_row).collect()
    }
}
