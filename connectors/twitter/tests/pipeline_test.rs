//! End-to-end runs of the bot against a mock Twitter API.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use twitwi::{
    Bot, BotConfig, ReplyMode, RuleManager, StreamRule, TwitterApiClient, TwitterConfig,
    TwitterError,
};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const RULES: &str = "/2/tweets/search/stream/rules";
const STREAM: &str = "/2/tweets/search/stream";
const TWEETS: &str = "/2/tweets";
const DETAIL: &str = "/1.1/statuses/show.json";

/// Rules endpoint that remembers what was added and deleted.
#[derive(Clone, Default)]
struct FakeRules {
    rules: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<Mutex<u64>>,
}

impl FakeRules {
    fn seeded(rules: &[(&str, &str)]) -> Self {
        let fake = Self::default();
        for (id, value) in rules {
            fake.rules
                .lock()
                .unwrap()
                .push(json!({"id": id, "value": value}));
        }
        fake
    }

    async fn mount(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(RULES))
            .respond_with(ListRules(self.clone()))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(RULES))
            .respond_with(WriteRules(self.clone()))
            .mount(server)
            .await;
    }

    fn values(&self) -> Vec<String> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_str().unwrap().to_string())
            .collect()
    }
}

struct ListRules(FakeRules);

impl Respond for ListRules {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let rules = self.0.rules.lock().unwrap().clone();
        let meta = json!({"sent": "2022-01-01T00:00:00.000Z", "result_count": rules.len()});
        if rules.is_empty() {
            ResponseTemplate::new(200).set_body_json(json!({"meta": meta}))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({"data": rules, "meta": meta}))
        }
    }
}

struct WriteRules(FakeRules);

impl Respond for WriteRules {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let mut rules = self.0.rules.lock().unwrap();

        if let Some(ids) = body["delete"]["ids"].as_array() {
            let before = rules.len();
            rules.retain(|r| !ids.contains(&r["id"]));
            return ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"summary": {"deleted": before - rules.len()}}
            }));
        }

        let mut created = Vec::new();
        for rule in body["add"].as_array().unwrap() {
            let mut next_id = self.0.next_id.lock().unwrap();
            *next_id += 1;
            let mut stored = rule.clone();
            stored["id"] = json!(format!("r{next_id}"));
            created.push(stored.clone());
            rules.push(stored);
        }
        ResponseTemplate::new(201).set_body_json(json!({"data": created}))
    }
}

fn config(server: &MockServer) -> TwitterConfig {
    TwitterConfig {
        consumer_key: "ck".into(),
        consumer_secret: "cs".into(),
        access_token: "at".into(),
        access_token_secret: "ats".into(),
        bearer_token: "bearer".into(),
        api_url: server.uri(),
        ..Default::default()
    }
}

fn bot(server: &MockServer, mode: ReplyMode) -> Bot {
    let bot_config = BotConfig::new("jack", mode)
        .unwrap()
        .with_self_user_id("me");
    Bot::new(config(server), bot_config).unwrap()
}

fn tweet(id: &str, author: &str, included: &[&str]) -> String {
    let tweets: Vec<Value> = included
        .iter()
        .map(|id| json!({"id": id, "text": "original"}))
        .collect();
    json!({
        "data": {"id": id, "text": "look", "author_id": author},
        "includes": {"tweets": tweets},
        "matching_rules": [{"id": "r1", "tag": "from jack"}]
    })
    .to_string()
}

async fn mount_stream(server: &MockServer, lines: &[String]) {
    let mut body = lines.join("\r\n");
    body.push_str("\r\n");
    Mock::given(method("GET"))
        .and(path(STREAM))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn set_rules_are_listed_back() {
    let server = MockServer::start().await;
    let fake = FakeRules::default();
    fake.mount(&server).await;

    let manager = RuleManager::new(Arc::new(TwitterApiClient::new(&config(&server)).unwrap()));
    manager
        .set_rules(&[
            StreamRule::new("from:jack", Some("from jack".into())),
            StreamRule::new("from:ev", None),
        ])
        .await
        .unwrap();

    let listed = manager.list_rules().await.unwrap();
    let mut pairs: Vec<_> = listed
        .iter()
        .map(|r| (r.value.as_str(), r.tag.as_deref()))
        .collect();
    pairs.sort_unstable();
    assert_eq!(
        pairs,
        vec![("from:ev", None), ("from:jack", Some("from jack"))]
    );
}

#[tokio::test]
async fn sync_replaces_existing_rules() {
    let server = MockServer::start().await;
    let fake = FakeRules::seeded(&[("1", "from:old"), ("2", "from:older")]);
    fake.mount(&server).await;

    let manager = RuleManager::new(Arc::new(TwitterApiClient::new(&config(&server)).unwrap()));
    manager
        .sync(&[StreamRule::new("from:jack", Some("from jack".into()))])
        .await
        .unwrap();

    assert_eq!(fake.values(), vec!["from:jack"]);
}

#[tokio::test]
async fn media_relay_posts_first_variant_once() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    mount_stream(&server, &[tweet("1", "other", &["9"])]).await;

    Mock::given(method("GET"))
        .and(path(DETAIL))
        .and(query_param("id", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_str": "9",
            "extended_entities": {"media": [{"type": "video", "video_info": {"variants": [
                {"url": "http://video/1.mp4", "bitrate": 832000, "content_type": "video/mp4"},
                {"url": "http://video/2.mp4", "bitrate": 2176000, "content_type": "video/mp4"}
            ]}}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TWEETS))
        .and(body_json(json!({
            "text": "http://video/1.mp4",
            "reply": {"in_reply_to_tweet_id": "1"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "100", "text": "http://video/1.mp4"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = bot(&server, ReplyMode::MediaRelay).run().await.unwrap();
    assert_eq!(summary.received, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.posted, 1);
}

#[tokio::test]
async fn media_relay_ignores_ambiguous_and_self_authored() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    mount_stream(
        &server,
        &[
            tweet("1", "other", &[]),
            tweet("2", "other", &["8", "9"]),
            tweet("3", "me", &["9"]),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path(DETAIL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let summary = bot(&server, ReplyMode::MediaRelay).run().await.unwrap();
    assert_eq!(summary.received, 3);
    assert_eq!(summary.ignored, 3);
    assert_eq!(summary.dispatched, 0);
}

#[tokio::test]
async fn echo_replies_to_every_foreign_tweet() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    mount_stream(
        &server,
        &[
            tweet("1", "other", &[]),
            tweet("2", "me", &[]),
            tweet("3", "other", &["8", "9"]),
        ],
    )
    .await;

    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "100", "text": "masterclass"}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let summary = bot(&server, ReplyMode::default()).run().await.unwrap();
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.posted, 2);

    let posted: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == TWEETS)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert!(posted.iter().all(|b| b["text"] == "masterclass"));
    let mut targets: Vec<_> = posted
        .iter()
        .map(|b| b["reply"]["in_reply_to_tweet_id"].as_str().unwrap().to_string())
        .collect();
    targets.sort();
    assert_eq!(targets, vec!["1", "3"]);
}

#[tokio::test]
async fn rejected_reply_does_not_stop_the_stream() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    mount_stream(&server, &[tweet("1", "other", &[]), tweet("2", "other", &[])]).await;

    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(2)
        .mount(&server)
        .await;

    let summary = bot(&server, ReplyMode::default()).run().await.unwrap();
    assert_eq!(summary.received, 2);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.posted, 0);
}

#[tokio::test]
async fn malformed_object_ends_the_run() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    mount_stream(
        &server,
        &[
            tweet("1", "other", &[]),
            "{\"data\": oops".to_string(),
            tweet("2", "other", &[]),
        ],
    )
    .await;

    Mock::given(method("POST"))
        .and(path(TWEETS))
        .and(body_json(json!({
            "text": "masterclass",
            "reply": {"in_reply_to_tweet_id": "1"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "100", "text": "masterclass"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = bot(&server, ReplyMode::default()).run().await.unwrap_err();
    assert!(matches!(err, TwitterError::Decode { .. }));
    assert!(err.is_stream_failure());
}

#[tokio::test]
async fn stream_open_failure_is_fatal() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;

    Mock::given(method("GET"))
        .and(path(STREAM))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = bot(&server, ReplyMode::default()).run().await.unwrap_err();
    assert!(matches!(err, TwitterError::Stream(msg) if msg.contains("401")));
}

#[tokio::test]
async fn bounded_in_flight_still_answers_everything() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    let lines: Vec<String> = (1..=5).map(|i| tweet(&i.to_string(), "other", &[])).collect();
    mount_stream(&server, &lines).await;

    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"data": {"id": "100", "text": "masterclass"}}))
                .set_delay(Duration::from_millis(20)),
        )
        .expect(5)
        .mount(&server)
        .await;

    let config = TwitterConfig {
        max_in_flight: Some(1),
        ..config(&server)
    };
    let bot_config = BotConfig::new("jack", ReplyMode::default())
        .unwrap()
        .with_self_user_id("me");
    let summary = Bot::new(config, bot_config).unwrap().run().await.unwrap();
    assert_eq!(summary.posted, 5);
}

#[tokio::test]
async fn slow_replies_run_concurrently() {
    let server = MockServer::start().await;
    FakeRules::default().mount(&server).await;
    let lines: Vec<String> = (1..=5).map(|i| tweet(&i.to_string(), "other", &[])).collect();
    mount_stream(&server, &lines).await;

    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"data": {"id": "100", "text": "masterclass"}}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(5)
        .mount(&server)
        .await;

    let started = Instant::now();
    let summary = bot(&server, ReplyMode::default()).run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.dispatched, 5);
    assert_eq!(summary.posted, 5);
    assert!(
        elapsed < Duration::from_millis(1200),
        "replies ran one after another: {elapsed:?}"
    );
}
