use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;

pub const DEFAULT_TICKER_ENDPOINT: &str = "https://api.binance.com";
pub const DEFAULT_SYMBOLS: [&str; 4] = ["BTC", "ETH", "XRP", "SOL"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_CHECK_STEP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub endpoint: String,
    pub symbols: Vec<String>,
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TICKER_ENDPOINT.to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            interval: Duration::from_secs(1),
        }
    }
}

// One worker, one snapshot slot. A tick writes the whole snapshot or nothing,
// so readers never see ticks stacked or interleaved.
pub struct PricePoller {
    latest: Arc<Mutex<Vec<Quote>>>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PricePoller {
    pub fn start(config: PollerConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build ticker http client")?;
        let latest = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let latest_for_thread = Arc::clone(&latest);
        let stop_for_thread = Arc::clone(&stop);
        let join =
            thread::spawn(move || run_poll_loop(client, config, latest_for_thread, stop_for_thread));
        Ok(Self {
            latest,
            stop,
            join: Some(join),
        })
    }

    pub fn latest(&self) -> Vec<Quote> {
        self.latest
            .lock()
            .map(|quotes| quotes.clone())
            .unwrap_or_default()
    }

    pub fn wait_for_first_refresh(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.latest().is_empty() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(STOP_CHECK_STEP);
        }
        true
    }
}

impl Drop for PricePoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_poll_loop(
    client: reqwest::blocking::Client,
    config: PollerConfig,
    latest: Arc<Mutex<Vec<Quote>>>,
    stop: Arc<AtomicBool>,
) {
    let mut previous: HashMap<String, f64> = HashMap::new();
    while !stop.load(Ordering::Relaxed) {
        let quotes = fetch_quotes(&client, &config, &previous);
        if !quotes.is_empty() {
            previous = quotes
                .iter()
                .map(|quote| (quote.symbol.clone(), quote.price))
                .collect();
            debug!("price snapshot refreshed for {} symbols", quotes.len());
            if let Ok(mut slot) = latest.lock() {
                *slot = quotes;
            }
        }
        sleep_until_stop(&stop, config.interval);
    }
}

fn sleep_until_stop(stop: &AtomicBool, interval: Duration) {
    let mut remaining = interval;
    while !stop.load(Ordering::Relaxed) && remaining > Duration::ZERO {
        let step = remaining.min(STOP_CHECK_STEP);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}

fn fetch_quotes(
    client: &reqwest::blocking::Client,
    config: &PollerConfig,
    previous: &HashMap<String, f64>,
) -> Vec<Quote> {
    let mut quotes = Vec::with_capacity(config.symbols.len());
    for symbol in &config.symbols {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={symbol}USDT",
            config.endpoint
        );
        match fetch_price(client, &url) {
            Ok(price) => {
                let trend = match previous.get(symbol.as_str()) {
                    Some(last) if price > *last => Trend::Up,
                    Some(last) if price < *last => Trend::Down,
                    _ => Trend::Flat,
                };
                quotes.push(Quote {
                    symbol: symbol.clone(),
                    price,
                    trend,
                });
            }
            Err(err) => warn!("price refresh for {symbol} failed: {err:#}"),
        }
    }
    quotes
}

pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("${price:.2}")
    } else {
        format!("${price:.4}")
    }
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

fn fetch_price(client: &reqwest::blocking::Client, url: &str) -> Result<f64> {
    let ticker: TickerResponse = client
        .get(url)
        .send()
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .context("ticker endpoint rejected the request")?
        .json()
        .context("unparseable ticker response")?;
    ticker
        .price
        .trim()
        .parse::<f64>()
        .with_context(|| format!("unparseable price '{}'", ticker.price))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn ticker_stub(prices: &'static [&'static str]) -> (String, Arc<AtomicUsize>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind stub");
        let port = server.server_addr().to_ip().expect("tcp listener").port();
        let served = Arc::new(AtomicUsize::new(0));
        let served_in_thread = Arc::clone(&served);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let index = served_in_thread.fetch_add(1, Ordering::SeqCst);
                let price = prices[index.min(prices.len() - 1)];
                let body = format!(r#"{{"symbol":"BTCUSDT","price":"{price}"}}"#);
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });
        (format!("http://127.0.0.1:{port}"), served)
    }

    fn one_symbol_config(endpoint: String, interval: Duration) -> PollerConfig {
        PollerConfig {
            endpoint,
            symbols: vec!["BTC".to_string()],
            interval,
        }
    }

    fn test_client() -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("client")
    }

    #[test]
    fn trend_tracks_the_previous_tick() {
        let (endpoint, _served) = ticker_stub(&["100.0", "90.5", "90.5"]);
        let config = one_symbol_config(endpoint, Duration::from_millis(10));
        let client = test_client();

        let first = fetch_quotes(&client, &config, &HashMap::new());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].symbol, "BTC");
        assert_eq!(first[0].price, 100.0);
        assert_eq!(first[0].trend, Trend::Flat);

        let previous: HashMap<String, f64> = first
            .iter()
            .map(|quote| (quote.symbol.clone(), quote.price))
            .collect();
        let second = fetch_quotes(&client, &config, &previous);
        assert_eq!(second[0].trend, Trend::Down);

        let previous: HashMap<String, f64> = second
            .iter()
            .map(|quote| (quote.symbol.clone(), quote.price))
            .collect();
        let third = fetch_quotes(&client, &config, &previous);
        assert_eq!(third[0].trend, Trend::Flat);
    }

    #[test]
    fn large_prices_use_two_decimals_small_ones_four() {
        assert_eq!(format_price(43250.129), "$43250.13");
        assert_eq!(format_price(1000.0), "$1000.00");
        assert_eq!(format_price(0.5312), "$0.5312");
    }

    #[test]
    fn unreachable_endpoint_yields_no_quotes() {
        let config = one_symbol_config(
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(10),
        );
        let quotes = fetch_quotes(&test_client(), &config, &HashMap::new());
        assert!(quotes.is_empty());
    }

    #[test]
    fn ticks_replace_the_snapshot_instead_of_stacking() {
        let (endpoint, served) = ticker_stub(&["100.0"]);
        let poller = PricePoller::start(one_symbol_config(endpoint, Duration::from_millis(20)))
            .expect("poller");
        assert!(poller.wait_for_first_refresh(Duration::from_secs(5)));

        let deadline = Instant::now() + Duration::from_secs(5);
        while served.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(served.load(Ordering::SeqCst) >= 3, "stub saw repeated ticks");

        let snapshot = poller.latest();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].symbol, "BTC");
        assert_eq!(snapshot[0].price, 100.0);
    }

    #[test]
    fn drop_stops_and_joins_the_worker() {
        let (endpoint, served) = ticker_stub(&["100.0"]);
        let poller = PricePoller::start(one_symbol_config(endpoint, Duration::from_millis(20)))
            .expect("poller");
        assert!(poller.wait_for_first_refresh(Duration::from_secs(5)));
        drop(poller);

        // No more ticks once the poller is gone.
        let after_drop = served.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(served.load(Ordering::SeqCst), after_drop);
    }
}
