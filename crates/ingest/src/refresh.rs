use std::time::Instant;

use billing_db::Db;

use crate::context::RunContext;
use crate::rates::enrich_public_rates;
use crate::sources::PriceLookup;
use crate::types::{RefreshSummary, Result};

/// Post-load jobs, each committing on its own: stats, rate card, reference
/// values, special tag key names, tenant ids, then public rates unless
/// skipped.
pub fn refresh_derived(
    db: &mut Db,
    ctx: &RunContext,
    prices: Option<&dyn PriceLookup>,
) -> Result<RefreshSummary> {
    let shape = ctx.shape;
    let tenant = ctx.tenant.as_str();
    let mut summary = RefreshSummary::default();

    let timer = Instant::now();
    summary.stats_rows = db.refresh_stats(shape, tenant, &ctx.agent_version)?;
    log::info!(
        "{}: {} rows refreshed in {}ms",
        shape.tables.stats,
        summary.stats_rows,
        timer.elapsed().as_millis()
    );

    let timer = Instant::now();
    summary.rate_card_rows = db.refresh_rate_card(shape, tenant)?;
    log::info!(
        "{}: {} rows refreshed in {}ms",
        shape.tables.rate_card,
        summary.rate_card_rows,
        timer.elapsed().as_millis()
    );

    let timer = Instant::now();
    summary.reference_rows = db.refresh_reference(shape, tenant)?;
    summary.special_tag_keys = db.upsert_special_tag_keys(shape, tenant, &ctx.special_tags)?;
    log::info!(
        "{}: {} values added, {} special tag keys in {}ms",
        shape.tables.reference,
        summary.reference_rows,
        summary.special_tag_keys,
        timer.elapsed().as_millis()
    );

    summary.tenant_ids = db.register_tenant_ids(shape, tenant)?;
    if summary.tenant_ids > 0 {
        log::info!("{} new tenant ids registered", summary.tenant_ids);
    }

    summary.public_rates = match (ctx.skip_rates, prices) {
        (false, Some(prices)) => Some(enrich_public_rates(db, ctx, prices)?),
        (true, _) => {
            log::info!("public rate enrichment skipped");
            None
        }
        (false, None) => None,
    };
    Ok(summary)
}
