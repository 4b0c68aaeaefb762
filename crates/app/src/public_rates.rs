use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use billing_core::PublicRate;
use ingest::{LookupError, PriceLookup};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::PublicRatesConfig;
use crate::error::{AppError, Result};

const PAY_AS_YOU_GO: &str = "PAY_AS_YOU_GO";

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    items: Vec<ProductItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductItem {
    display_name: Option<String>,
    #[serde(default)]
    currency_code_localizations: Vec<Localization>,
}

#[derive(Debug, Deserialize)]
struct Localization {
    #[serde(default)]
    prices: Vec<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    model: String,
    value: Option<f64>,
}

/// Client for the public product price list.
pub struct PublicRateClient {
    client: Client,
    base: Url,
    throttle: Duration,
    last_call: Cell<Option<Instant>>,
}

impl PublicRateClient {
    pub fn new(config: &PublicRatesConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|err| AppError::Config(format!("price list url {}: {}", config.url, err)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base,
            throttle: Duration::from_millis(config.throttle_ms),
            last_call: Cell::new(None),
        })
    }

    pub fn url_for(&self, sku: &str, currency: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("partNumber", sku)
            .append_pair("currencyCode", currency);
        url
    }

    fn wait_turn(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.throttle {
                thread::sleep(self.throttle - elapsed);
            }
        }
        self.last_call.set(Some(Instant::now()));
    }
}

impl PriceLookup for PublicRateClient {
    fn lookup(
        &self,
        sku: &str,
        currency: &str,
    ) -> std::result::Result<Option<PublicRate>, LookupError> {
        self.wait_turn();
        let url = self.url_for(sku, currency);
        let response = self.client.get(url).send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Failed(format!("http status {}", status.as_u16())));
        }
        let body = response.text().map_err(classify)?;
        parse_price(&body).map_err(|err| LookupError::Failed(format!("parse response: {}", err)))
    }
}

fn classify(err: reqwest::Error) -> LookupError {
    if err.is_connect() || err.is_timeout() {
        LookupError::Unreachable(err.to_string())
    } else {
        LookupError::Failed(err.to_string())
    }
}

/// Last pay-as-you-go price in the response. A zero or absent price means
/// none is published.
pub fn parse_price(body: &str) -> serde_json::Result<Option<PublicRate>> {
    let response: ProductsResponse = serde_json::from_str(body)?;
    let mut description = None;
    let mut paygo = None;
    for item in response.items {
        if item.display_name.is_some() {
            description = item.display_name;
        }
        for localization in item.currency_code_localizations {
            for price in localization.prices {
                if price.model == PAY_AS_YOU_GO {
                    paygo = price.value;
                }
            }
        }
    }
    Ok(paygo
        .filter(|price| *price != 0.0)
        .map(|paygo_price| PublicRate {
            description,
            paygo_price,
        }))
}
