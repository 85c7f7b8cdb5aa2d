//! HTTP integration contract tests
//!
//! Each client is pointed at a local mock server.

use jarvis::Error;
use jarvis::integrations::{
    ConversationProvider, KnowledgeProvider, NewsApiClient, NewsProvider, OpenAiConversation,
    OpenWeatherClient, WeatherProvider, WikipediaClient,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn key() -> Option<SecretString> {
    Some(SecretString::from("test-key".to_string()))
}

#[tokio::test]
async fn test_weather_report_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "london"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "weather": [{"description": "light rain"}],
            "main": {"temp": 11.2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenWeatherClient::new(server.uri(), key()).unwrap();
    let report = client.fetch("london").await.unwrap();
    assert_eq!(report.description, "light rain");
    assert!((report.temperature_c - 11.2).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_weather_unknown_city() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "city not found"})),
        )
        .mount(&server)
        .await;

    let client = OpenWeatherClient::new(server.uri(), key()).unwrap();
    let err = client.fetch("atlantis").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_weather_without_key_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenWeatherClient::new(server.uri(), None).unwrap();
    let err = client.fetch("london").await.unwrap_err();
    assert!(matches!(err, Error::NotConfigured(_)), "got {err:?}");
}

#[tokio::test]
async fn test_top_headlines_by_country() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(query_param("country", "in"))
        .and(query_param("pageSize", "3"))
        .and(query_param("apiKey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": [
                {"title": "First"},
                {"title": null},
                {"title": "Third"},
                {"title": "Fourth"}
            ]
        })))
        .mount(&server)
        .await;

    let client = NewsApiClient::new(server.uri(), key(), "in").unwrap();
    let headlines = client.headlines(None).await.unwrap();
    assert_eq!(headlines, vec!["First", "No title", "Third"]);
}

#[tokio::test]
async fn test_topic_search_uses_everything_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NewsApiClient::new(server.uri(), key(), "us").unwrap();
    assert!(client.headlines(Some("rust")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_news_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "code": "apiKeyInvalid"
        })))
        .mount(&server)
        .await;

    let client = NewsApiClient::new(server.uri(), key(), "us").unwrap();
    let err = client.headlines(None).await.unwrap_err();
    assert!(matches!(err, Error::Provider(_)), "got {err:?}");
}

#[tokio::test]
async fn test_knowledge_summary_is_trimmed_to_two_sentences() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Albert_Einstein"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "extract": "Albert Einstein was a physicist. He developed relativity. He won a Nobel Prize."
        })))
        .mount(&server)
        .await;

    let client = WikipediaClient::new(server.uri()).unwrap();
    let summary = client.summarize("Albert Einstein").await.unwrap();
    assert_eq!(
        summary,
        "Albert Einstein was a physicist. He developed relativity."
    );
}

#[tokio::test]
async fn test_knowledge_missing_and_ambiguous() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Nowhere"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "disambiguation",
            "extract": "Mercury may refer to:"
        })))
        .mount(&server)
        .await;

    let client = WikipediaClient::new(server.uri()).unwrap();
    let missing = client.summarize("Nowhere").await.unwrap_err();
    assert!(matches!(missing, Error::NotFound(_)), "got {missing:?}");
    let ambiguous = client.summarize("Mercury").await.unwrap_err();
    assert!(matches!(ambiguous, Error::Provider(_)), "got {ambiguous:?}");
}

#[tokio::test]
async fn test_conversation_request_and_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 150
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Hello there.  "}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiConversation::new(server.uri(), key(), "gpt-4o-mini", "Jarvis").unwrap();
    assert_eq!(client.respond("hi").await.unwrap(), "Hello there.");
}

#[tokio::test]
async fn test_conversation_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = OpenAiConversation::new(server.uri(), None, "gpt-4o-mini", "Jarvis").unwrap();
    let err = client.respond("hi").await.unwrap_err();
    assert!(matches!(err, Error::Provider(_)), "got {err:?}");
}
