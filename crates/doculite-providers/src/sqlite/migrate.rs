//! Schema migrator (spec §4.6). Grounded on
//! `mcb_infrastructure::infrastructure::migration` for the DI-resolved
//! shape, adapted to the `PRAGMA table_info`-driven additive diff this
//! system needs (the teacher delegates to `sea_orm_migration`, which has
//! no document-schema promotion concept to diff against).

use doculite_domain::error::{DatabaseErrorCode, Error, Result};
use doculite_domain::ports::database::{SqlDriver, SqlParam, SqlTransaction};
use doculite_domain::schema::{Schema, SchemaDdlGenerator, SeedHook, UpgradeHook};

use super::ddl::{alter_table_add_column, SqliteSchemaDdlGenerator};

/// Metadata table name. Part of the on-disk wire-format contract; never
/// rename it, or existing databases lose their migration history.
pub const MIGRATIONS_TABLE: &str = "_skibbadb_migrations";

/// One promoted column as introspected from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExistingColumn {
    name: String,
    not_null: bool,
}

/// A single planned additive or breaking schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterStep {
    /// `ALTER TABLE ... ADD COLUMN`, for a newly-declared column.
    AddColumn { column: String, ddl: String },
    /// The new schema drops, retypes, or tightens an existing column;
    /// or the table's shape could not be introspected at all.
    Breaking { reason: String },
}

/// Outcome of comparing a collection's stored version against its
/// declared [`Schema::version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationPlan {
    /// Table doesn't exist yet: the DDL generator's `CREATE TABLE`
    /// statements are the entire "migration".
    FreshTable,
    /// Stored version equals declared version: nothing to do.
    UpToDate { version: u32 },
    /// Stored version is ahead of declared (a branch-switch); warn and
    /// no-op rather than attempting to downgrade.
    AheadOfDeclared { stored: u32, declared: u32 },
    /// Stored version is behind declared; `steps` lists the ALTERs
    /// needed to reach it. `has_breaking` mirrors
    /// `steps.iter().any(is Breaking)` for convenient refusal checks.
    Pending {
        stored: u32,
        declared: u32,
        steps: Vec<AlterStep>,
    },
}

impl MigrationPlan {
    /// True if applying this plan would be refused.
    #[must_use]
    pub fn is_breaking(&self) -> bool {
        matches!(
            self,
            Self::Pending { steps, .. } if steps.iter().any(|s| matches!(s, AlterStep::Breaking { .. }))
        )
    }
}

async fn stored_version(driver: &dyn SqlDriver, collection: &str) -> Result<Option<u32>> {
    ensure_metadata_table(driver).await?;
    let rows = driver
        .query(
            &format!("SELECT version FROM {MIGRATIONS_TABLE} WHERE collection_name = ?"),
            &[SqlParam::Text(collection.to_owned())],
        )
        .await?;
    rows.first()
        .map(|row| {
            row.try_get_i64("version")?
                .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "migrations row missing 'version'"))
                .map(|v| u32::try_from(v).unwrap_or(0))
        })
        .transpose()
}

/// Idempotent: tolerates being invoked inside an enclosing transaction
/// where the table was already created (spec §5, "metadata table
/// initialization ... tolerates nested-transaction errors").
async fn ensure_metadata_table(driver: &dyn SqlDriver) -> Result<()> {
    driver
        .exec(
            &format!(
                "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (\
                 collection_name TEXT PRIMARY KEY, \
                 version INTEGER NOT NULL, \
                 completed_alters TEXT NOT NULL DEFAULT '[]', \
                 created_at TEXT, \
                 updated_at TEXT)"
            ),
            &[],
        )
        .await?;
    Ok(())
}

async fn introspect_table(driver: &dyn SqlDriver, table: &str) -> Result<Vec<ExistingColumn>> {
    let sql = format!("PRAGMA table_info({table})");
    let rows = driver.query(&sql, &[]).await?;
    rows.iter()
        .map(|row| {
            Ok(ExistingColumn {
                name: row
                    .try_get_string("name")?
                    .ok_or_else(|| Error::database(DatabaseErrorCode::Other, "table_info row missing 'name'"))?,
                not_null: row.try_get_i64("notnull")?.unwrap_or(0) != 0,
            })
        })
        .collect()
}

fn diff_columns(existing: &[ExistingColumn], schema: &Schema) -> Vec<AlterStep> {
    let mut steps = Vec::new();
    let existing_names: std::collections::HashSet<&str> =
        existing.iter().map(|c| c.name.as_str()).collect();

    for removed in existing_names
        .iter()
        .filter(|name| !schema.table.columns.iter().any(|c| &c.name == **name))
    {
        steps.push(AlterStep::Breaking {
            reason: format!("column '{removed}' was removed from the schema"),
        });
    }

    for column in &schema.table.columns {
        match existing.iter().find(|c| c.name == column.name) {
            None => steps.push(AlterStep::AddColumn {
                column: column.name.clone(),
                ddl: alter_table_add_column(&schema.table.name, column),
            }),
            Some(found) if !found.not_null && !column.nullable => steps.push(AlterStep::Breaking {
                reason: format!("column '{}' tightened from nullable to NOT NULL", column.name),
            }),
            Some(_) => {}
        }
    }

    steps
}

/// Diff a collection's stored migration state against its declared
/// [`Schema`]. Never mutates anything; pure planning.
///
/// # Errors
///
/// Propagates any driver error from metadata-table or `PRAGMA
/// table_info` reads.
pub async fn plan_migration(driver: &dyn SqlDriver, schema: &Schema) -> Result<MigrationPlan> {
    let existing_columns = introspect_table(driver, &schema.table.name).await?;
    if existing_columns.is_empty() {
        return Ok(MigrationPlan::FreshTable);
    }

    let stored = stored_version(driver, &schema.table.name).await?.unwrap_or(0);
    let declared = schema.version;

    if stored == declared {
        return Ok(MigrationPlan::UpToDate { version: declared });
    }
    if stored > declared {
        return Ok(MigrationPlan::AheadOfDeclared { stored, declared });
    }

    let steps = diff_columns(&existing_columns, schema);
    Ok(MigrationPlan::Pending { stored, declared, steps })
}

/// Apply a non-fresh, non-breaking [`MigrationPlan::Pending`] inside its
/// own transaction, then update the metadata row. No-ops for
/// [`MigrationPlan::UpToDate`] and [`MigrationPlan::AheadOfDeclared`]
/// (the latter only warns).
///
/// `upgrade`, if declared, is called once per intermediate version
/// between `stored` and `declared`. `seed`, if declared, is called once
/// when `stored == 0` (spec §4.6).
///
/// # Errors
///
/// Returns [`DatabaseErrorCode::BreakingMigration`] if the plan is
/// breaking, and propagates any driver error otherwise.
pub async fn apply_plan(
    driver: &dyn SqlDriver,
    collection: &str,
    plan: &MigrationPlan,
    upgrade: Option<&UpgradeHook>,
    seed: Option<&SeedHook>,
) -> Result<()> {
    match plan {
        MigrationPlan::FreshTable | MigrationPlan::UpToDate { .. } => Ok(()),
        MigrationPlan::AheadOfDeclared { stored, declared } => {
            tracing::warn!(
                collection,
                stored,
                declared,
                "doculite.migrate stored version ahead of declared; no-op"
            );
            Ok(())
        }
        MigrationPlan::Pending { stored, declared, steps } => {
            if plan.is_breaking() {
                return Err(Error::database(
                    DatabaseErrorCode::BreakingMigration,
                    format!(
                        "refusing migration for '{collection}': {}",
                        describe_steps(steps)
                    ),
                ));
            }
            let mut tx = driver.begin().await?;
            for step in steps {
                if let AlterStep::AddColumn { ddl, .. } = step {
                    tx.exec(ddl, &[]).await?;
                }
            }
            if let Some(upgrade) = upgrade {
                for version in (*stored + 1)..=*declared {
                    upgrade(version)?;
                }
            }
            if *stored == 0 {
                if let Some(seed) = seed {
                    seed()?;
                }
            }
            record_version(&mut *tx, collection, *declared, steps).await?;
            tx.commit().await
        }
    }
}

async fn record_version(
    tx: &mut dyn SqlTransaction,
    collection: &str,
    version: u32,
    steps: &[AlterStep],
) -> Result<()> {
    let completed: Vec<&str> = steps
        .iter()
        .filter_map(|s| match s {
            AlterStep::AddColumn { column, .. } => Some(column.as_str()),
            AlterStep::Breaking { .. } => None,
        })
        .collect();
    let completed_json = serde_json::to_string(&completed).unwrap_or_else(|_| "[]".to_owned());
    let now = chrono::Utc::now().to_rfc3339();
    tx.exec(
        &format!(
            "INSERT INTO {MIGRATIONS_TABLE} (collection_name, version, completed_alters, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(collection_name) DO UPDATE SET version = excluded.version, \
             completed_alters = excluded.completed_alters, updated_at = excluded.updated_at"
        ),
        &[
            SqlParam::Text(collection.to_owned()),
            SqlParam::Integer(i64::from(version)),
            SqlParam::Text(completed_json),
            SqlParam::Text(now.clone()),
            SqlParam::Text(now),
        ],
    )
    .await?;
    Ok(())
}

/// Human-readable rendering of a plan, used by print-plan mode
/// (`DOCULITE_MIGRATION_MODE=plan`) and in breaking-migration error text.
#[must_use]
pub fn describe_steps(steps: &[AlterStep]) -> String {
    steps
        .iter()
        .map(|s| match s {
            AlterStep::AddColumn { column, ddl } => format!("ADD COLUMN {column}: {ddl}"),
            AlterStep::Breaking { reason } => format!("BREAKING: {reason}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Create the table (and its sidecars/indexes) if it doesn't exist yet,
/// else plan and apply the version diff. Entry point used by collection
/// registration (spec §4.1/§4.6).
///
/// `upgrade`/`seed` are the hooks declared on the collection's schema, if
/// any; see [`apply_plan`] for when each runs.
///
/// # Errors
///
/// Propagates [`DatabaseErrorCode::BreakingMigration`] from
/// [`apply_plan`], and any driver error from DDL execution.
pub async fn ensure_schema(
    driver: &dyn SqlDriver,
    schema: &Schema,
    upgrade: Option<&UpgradeHook>,
    seed: Option<&SeedHook>,
) -> Result<MigrationPlan> {
    let plan = plan_migration(driver, schema).await?;

    if std::env::var("DOCULITE_MIGRATION_MODE").as_deref() == Ok("plan") {
        let would_seed_on_fresh = matches!(&plan, MigrationPlan::FreshTable)
            || matches!(&plan, MigrationPlan::Pending { stored, .. } if *stored == 0);
        tracing::info!(
            collection = %schema.table.name,
            plan = ?plan,
            would_upgrade = upgrade.is_some(),
            would_seed = seed.is_some() && would_seed_on_fresh,
            "doculite.migrate plan (dry run)"
        );
        return Ok(plan);
    }

    match &plan {
        MigrationPlan::FreshTable => {
            for ddl in SqliteSchemaDdlGenerator.generate_ddl(schema) {
                driver.exec(&ddl, &[]).await?;
            }
            record_fresh_table(driver, &schema.table.name, schema.version).await?;
            if let Some(seed) = seed {
                seed()?;
            }
        }
        _ => apply_plan(driver, &schema.table.name, &plan, upgrade, seed).await?,
    }

    Ok(plan)
}

async fn record_fresh_table(driver: &dyn SqlDriver, collection: &str, version: u32) -> Result<()> {
    ensure_metadata_table(driver).await?;
    let now = chrono::Utc::now().to_rfc3339();
    driver
        .exec(
            &format!(
                "INSERT INTO {MIGRATIONS_TABLE} (collection_name, version, completed_alters, created_at, updated_at) \
                 VALUES (?, ?, '[]', ?, ?) \
                 ON CONFLICT(collection_name) DO NOTHING"
            ),
            &[
                SqlParam::Text(collection.to_owned()),
                SqlParam::Integer(i64::from(version)),
                SqlParam::Text(now.clone()),
                SqlParam::Text(now),
            ],
        )
        .await?;
    Ok(())
}
