use billing_db::Db;

use crate::context::RunContext;
use crate::sources::{LookupError, PriceLookup};
use crate::types::{EnrichSummary, Result};

/// Copies public pay-as-you-go prices onto existing rate-card rows.
///
/// A failed lookup for one SKU is logged and the next SKU is tried. When the
/// price service is unreachable the remaining SKUs are abandoned and the
/// summary is marked aborted; the run itself still succeeds.
pub fn enrich_public_rates(
    db: &mut Db,
    ctx: &RunContext,
    prices: &dyn PriceLookup,
) -> Result<EnrichSummary> {
    let shape = ctx.shape;
    let pairs = db.rate_card_skus(shape, &ctx.tenant)?;
    let mut summary = EnrichSummary::default();
    for (sku, currency) in pairs {
        summary.skus_checked += 1;
        match prices.lookup(&sku, &currency) {
            Ok(Some(rate)) => {
                summary.rows_updated +=
                    db.apply_public_rate(shape, &ctx.tenant, &sku, &currency, &rate)?;
            }
            Ok(None) => log::debug!("no pay-as-you-go price for {} in {}", sku, currency),
            Err(LookupError::Failed(message)) => {
                summary.failures += 1;
                log::warn!("public rate for {} in {}: {}", sku, currency, message);
            }
            Err(LookupError::Unreachable(message)) => {
                summary.aborted = true;
                log::warn!("public price list unreachable, rate enrichment stopped: {}", message);
                break;
            }
        }
    }
    log::info!(
        "public rates: {} of {} skus updated",
        summary.rows_updated,
        summary.skus_checked
    );
    Ok(summary)
}
