use std::time::Instant;

use billing_db::Db;

use crate::context::RunContext;
use crate::file::{BatchPosition, ingest_file};
use crate::refresh::refresh_derived;
use crate::sources::{ObjectStore, PriceLookup};
use crate::types::{FileOutcome, IngestError, IngestIssue, LoadSummary, Result, RunReport};

/// Loads every listed file newer than the tenant's watermark, one at a time,
/// in name order.
pub fn run_incremental_load(
    db: &mut Db,
    store: &dyn ObjectStore,
    ctx: &RunContext,
) -> Result<LoadSummary> {
    let shape = ctx.shape;
    let watermark = db.max_loaded_file_name(shape, &ctx.tenant)?;
    if watermark.is_empty() {
        log::info!("no {} files loaded yet for {}", shape.file_type.as_str(), ctx.tenant);
    } else {
        log::info!("resuming {} after {}", ctx.tenant, watermark);
    }

    let mut files = store
        .list_objects(shape.prefix, &watermark)
        .map_err(|err| IngestError::external(format!("list {}", shape.prefix), err))?;
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut summary = LoadSummary {
        watermark: watermark.clone(),
        files_listed: files.len(),
        ..LoadSummary::default()
    };
    log::info!("{} candidate files under {}", files.len(), shape.prefix);

    let total = files.len();
    for (index, file) in files.iter().enumerate() {
        let position = BatchPosition {
            id: index + 1,
            total,
        };
        match ingest_file(db, store, ctx, file, &watermark, position)? {
            FileOutcome::Loaded {
                rows,
                malformed_tags,
            } => {
                summary.files_loaded += 1;
                summary.rows_loaded += rows;
                if malformed_tags > 0 {
                    log::warn!(
                        "{} rows of {} had unreadable tags",
                        malformed_tags,
                        file.name
                    );
                    summary.issues.push(IngestIssue {
                        file_name: file.name.clone(),
                        message: format!("{} rows with unreadable tags", malformed_tags),
                    });
                }
            }
            FileOutcome::Skipped(_) => summary.files_skipped += 1,
        }
    }
    Ok(summary)
}

/// Full run: incremental load, then the refresh jobs when at least one file
/// was loaded or a refresh is forced.
pub fn run(
    db: &mut Db,
    store: &dyn ObjectStore,
    prices: Option<&dyn PriceLookup>,
    ctx: &RunContext,
) -> Result<RunReport> {
    let started = Instant::now();
    db.check_schema(ctx.shape)?;

    let load = run_incremental_load(db, store, ctx)?;
    log::info!(
        "loaded {} of {} files ({} rows) for {}",
        load.files_loaded,
        load.files_listed,
        load.rows_loaded,
        ctx.tenant
    );

    let refresh = if load.files_loaded > 0 || ctx.force_refresh {
        Some(refresh_derived(db, ctx, prices)?)
    } else {
        log::info!("no new files, refresh skipped");
        None
    };
    log::info!("run finished in {}ms", started.elapsed().as_millis());
    Ok(RunReport { load, refresh })
}
