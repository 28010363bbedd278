//! Stock quote client for the Alpha Vantage query API.
//!
//! Standalone from the tab store: it fetches a `GLOBAL_QUOTE` and a
//! `TIME_SERIES_DAILY` series and hands the recent closes to
//! [`crate::chart`]. Alpha Vantage reports every number as a string
//! (`"05. price": "189.9800"`), so parsing goes through `serde_json::Value`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::StocksConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: String,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub latest_trading_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

pub struct StockClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StockClient {
    pub fn new(config: &StocksConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("stock API error {}: {}", status, body);
        }
        Ok(response.json().await?)
    }

    /// Latest quote, or `None` if the API has nothing for `symbol`.
    pub async fn quote(&self, symbol: &str) -> Result<Option<StockQuote>> {
        let json = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        parse_quote(symbol, &json)
    }

    /// The last `days` daily closes, oldest first.
    pub async fn daily_closes(&self, symbol: &str, days: usize) -> Result<Option<Vec<DailyClose>>> {
        let json = self
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "compact"),
            ])
            .await?;
        parse_daily(&json, days)
    }
}

fn field_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn field_f64(obj: &Value, key: &str) -> Result<f64> {
    match field_str(obj, key) {
        Some(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("invalid number in '{}': {:?}", key, s)),
        None => Ok(0.0),
    }
}

pub fn parse_quote(symbol: &str, json: &Value) -> Result<Option<StockQuote>> {
    let quote = match json.get("Global Quote") {
        Some(q) if q.as_object().is_some_and(|o| !o.is_empty()) => q,
        _ => return Ok(None),
    };

    let volume = match field_str(quote, "06. volume") {
        Some(s) => s
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid volume: {:?}", s))?,
        None => 0,
    };

    Ok(Some(StockQuote {
        symbol: symbol.to_string(),
        price: field_f64(quote, "05. price")?,
        change: field_f64(quote, "09. change")?,
        change_percent: field_str(quote, "10. change percent")
            .unwrap_or("0%")
            .to_string(),
        high: field_f64(quote, "03. high")?,
        low: field_f64(quote, "04. low")?,
        volume,
        latest_trading_day: field_str(quote, "07. latest trading day")
            .unwrap_or_default()
            .to_string(),
    }))
}

pub fn parse_daily(json: &Value, days: usize) -> Result<Option<Vec<DailyClose>>> {
    let Some(series) = json.get("Time Series (Daily)").and_then(Value::as_object) else {
        return Ok(None);
    };

    let mut closes = Vec::with_capacity(series.len());
    for (date, bar) in series {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid date in time series: {}", date))?;
        closes.push(DailyClose {
            date,
            close: field_f64(bar, "4. close")?,
        });
    }

    closes.sort_by_key(|c| c.date);
    let skip = closes.len().saturating_sub(days);
    Ok(Some(closes.split_off(skip)))
}

/// CLI entry point for `tabr stock`.
pub async fn run_stock(
    config: &StocksConfig,
    symbol: &str,
    chart_path: Option<&std::path::Path>,
    print_base64: bool,
) -> Result<()> {
    let client = StockClient::new(config)?;

    match client.quote(symbol).await? {
        Some(q) => {
            println!("Stock Information for {}:", q.symbol);
            println!("- Price: {}", q.price);
            println!("- Change: {} ({})", q.change, q.change_percent);
            println!("- High: {}", q.high);
            println!("- Low: {}", q.low);
            println!("- Volume: {}", q.volume);
            println!("- Latest Trading Day: {}", q.latest_trading_day);
        }
        None => println!("Could not retrieve stock information."),
    }

    if chart_path.is_none() && !print_base64 {
        return Ok(());
    }

    let points = match client.daily_closes(symbol, config.chart_days).await? {
        Some(points) if points.len() >= 2 => points,
        _ => {
            println!("Could not retrieve price history for a chart.");
            return Ok(());
        }
    };

    let labels = match crate::chart::find_font(config.font_path.as_deref())? {
        Some(font) => Some(crate::chart::ChartLabels::for_symbol(font, symbol, points.len())),
        None => {
            tracing::warn!("no usable font found, drawing the chart without text");
            None
        }
    };

    if let Some(path) = chart_path {
        let png = crate::chart::render_line_chart(&points, labels.as_ref())?;
        std::fs::write(path, &png)
            .with_context(|| format!("failed to write chart to {}", path.display()))?;
        println!(
            "Chart of the last {} trading days written to {}",
            points.len(),
            path.display()
        );
    }
    if print_base64 {
        println!(
            "data:image/png;base64,{}",
            crate::chart::render_base64(&points, labels.as_ref())?
        );
    }

    Ok(())
}
