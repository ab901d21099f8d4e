use kap_core::{Price, PriceLookup, YahooPriceLookup};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn quotes_last_close_for_derived_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ABC.IS"))
        .and(query_param("range", "5d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "regularMarketPrice": 12.5 },
                    "indicators": { "quote": [{ "close": [12.0, 12.3399, null] }] }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let lookup = YahooPriceLookup::with_base(reqwest::Client::new(), server.uri());
    assert_eq!(lookup.lookup(" abc ").await, Price::Quoted("12.34 TL".into()));
}

#[tokio::test]
async fn provider_errors_become_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "chart": { "result": null, "error": { "code": "Not Found" } }
        })))
        .mount(&server)
        .await;

    let lookup = YahooPriceLookup::with_base(reqwest::Client::new(), server.uri());
    assert_eq!(lookup.lookup("NOPE").await, Price::Unavailable);
}

#[tokio::test]
async fn garbage_body_becomes_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let lookup = YahooPriceLookup::with_base(reqwest::Client::new(), server.uri());
    assert_eq!(lookup.lookup("ABC").await, Price::Unavailable);
}
