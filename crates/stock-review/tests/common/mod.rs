//! Fixtures shared by the integration tests

#![allow(dead_code)]

use serde_json::{Value, json};
use stock_review::ReviewConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TICKERS_PATH: &str = "/files/company_tickers.json";
pub const APPLE_FACTS_PATH: &str = "/api/xbrl/companyfacts/CIK0000320193.json";
pub const USER_AGENT: &str = "stock-review-tests ops@example.com";

/// Configuration pointing every upstream at `server`
pub fn config_for(server: &MockServer) -> ReviewConfig {
    ReviewConfig::builder()
        .finnhub_api_key("test-token")
        .finnhub_base_url(server.uri())
        .sec_tickers_url(format!("{}{TICKERS_PATH}", server.uri()))
        .sec_data_base_url(server.uri())
        .sec_user_agent(USER_AGENT)
        .sec_requests_per_second(100)
        .retry(stock_review::RetryPolicy::fast())
        .site_base_url("https://msl.example")
        .build()
        .unwrap()
}

pub fn ticker_directory() -> Value {
    json!({
        "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
        "2": {"cik_str": "1045810", "ticker": "nvda", "title": "NVIDIA CORP"}
    })
}

fn record(start: &str, end: &str, val: f64, fp: &str, form: &str, filed: &str) -> Value {
    json!({
        "start": start, "end": end, "val": val,
        "fy": 2024, "fp": fp, "form": form, "filed": filed
    })
}

/// Three fiscal years and five quarters of an Apple-like filer
pub fn company_facts() -> Value {
    json!({
        "cik": 320193,
        "entityName": "Apple Inc.",
        "facts": {
            "dei": {},
            "us-gaap": {
                "RevenueFromContractWithCustomerExcludingAssessedTax": {
                    "label": "Revenue",
                    "units": {"USD": [
                        record("2020-09-27", "2021-09-25", 365_817_000_000.0, "FY", "10-K", "2021-10-29"),
                        record("2021-09-26", "2022-09-24", 394_328_000_000.0, "FY", "10-K", "2022-10-28"),
                        record("2021-09-26", "2022-09-24", 394_328_000_000.0, "FY", "10-K", "2023-11-03"),
                        record("2023-07-02", "2023-09-30", 89_498_000_000.0, "FY", "10-K", "2023-11-03"),
                        record("2022-09-25", "2023-09-30", 383_290_000_000.0, "FY", "10-K", "2023-11-03"),
                        record("2023-01-01", "2023-04-01", 94_836_000_000.0, "Q2", "10-Q", "2023-05-05"),
                        record("2023-04-02", "2023-07-01", 81_797_000_000.0, "Q3", "10-Q", "2023-08-04"),
                        record("2023-10-01", "2023-12-30", 119_575_000_000.0, "Q1", "10-Q", "2024-02-02"),
                        record("2023-12-31", "2024-03-30", 90_753_000_000.0, "Q2", "10-Q", "2024-05-03"),
                        record("2023-10-01", "2024-06-29", 296_105_000_000.0, "Q3", "10-Q", "2024-08-02"),
                        record("2024-03-31", "2024-06-29", 85_777_000_000.0, "Q3", "10-Q", "2024-08-02")
                    ]}
                },
                "NetIncomeLoss": {
                    "label": "Net Income (Loss)",
                    "units": {"USD": [
                        record("2020-09-27", "2021-09-25", 94_680_000_000.0, "FY", "10-K", "2021-10-29"),
                        record("2021-09-26", "2022-09-24", 99_803_000_000.0, "FY", "10-K", "2022-10-28"),
                        record("2022-09-25", "2023-09-30", 96_990_000_000.0, "FY", "10-K", "2023-11-03")
                    ]}
                },
                "EarningsPerShareDiluted": {
                    "label": "EPS diluted",
                    "units": {"USD/shares": [
                        record("2021-09-26", "2022-09-24", 6.11, "FY", "10-K", "2022-10-28"),
                        record("2022-09-25", "2023-09-30", 6.13, "FY", "10-K", "2023-11-03")
                    ]}
                },
                "NetCashProvidedByUsedInOperatingActivities": {
                    "units": {"USD": [
                        record("2020-09-27", "2021-09-25", 104_038_000_000.0, "FY", "10-K", "2021-10-29"),
                        record("2021-09-26", "2022-09-24", 122_151_000_000.0, "FY", "10-K", "2022-10-28"),
                        record("2022-09-25", "2023-09-30", 110_543_000_000.0, "FY", "10-K", "2023-11-03")
                    ]}
                },
                "PaymentsToAcquirePropertyPlantAndEquipment": {
                    "units": {"USD": [
                        record("2020-09-27", "2021-09-25", 11_080_000_000.0, "FY", "10-K", "2021-10-29"),
                        record("2021-09-26", "2022-09-24", 10_708_000_000.0, "FY", "10-K", "2022-10-28"),
                        record("2022-09-25", "2023-09-30", 10_959_000_000.0, "FY", "10-K", "2023-11-03")
                    ]}
                }
            }
        }
    })
}

pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount the ticker directory and Apple's company facts
pub async fn mount_sec(server: &MockServer) {
    mount_json(server, TICKERS_PATH, ticker_directory()).await;
    mount_json(server, APPLE_FACTS_PATH, company_facts()).await;
}

/// Mount a healthy set of market-data responses
pub async fn mount_market(server: &MockServer, name: &str, price: f64, target_mean: f64) {
    mount_json(
        server,
        "/quote",
        json!({"c": price, "d": 1.5, "dp": 1.2, "h": price + 1.0, "l": price - 1.0, "o": price, "pc": price - 1.5}),
    )
    .await;
    mount_json(
        server,
        "/stock/profile2",
        json!({
            "name": name,
            "ticker": "AAPL",
            "exchange": "NASDAQ NMS - GLOBAL MARKET",
            "finnhubIndustry": "Technology",
            "weburl": "https://www.apple.com/",
            "logo": "https://static.example/AAPL.png",
            "marketCapitalization": 2_900_000.0,
            "country": "US"
        }),
    )
    .await;
    mount_json(
        server,
        "/stock/recommendation",
        json!([
            {"period": "2024-06-01", "strongBuy": 10, "buy": 5, "hold": 5, "sell": 0, "strongSell": 0},
            {"period": "2024-05-01", "strongBuy": 0, "buy": 0, "hold": 0, "sell": 9, "strongSell": 9}
        ]),
    )
    .await;
    mount_json(
        server,
        "/stock/price-target",
        json!({"targetMean": target_mean, "targetMedian": target_mean, "targetHigh": target_mean + 40.0, "targetLow": target_mean - 40.0}),
    )
    .await;
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got None"));
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
