mod common;

use botblock::{ApiField, BotBlockError, LookupClient, RequestHandler, Site};
use common::{bot_info_json, init_tracing, list_json, BOT_ID};
use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};

fn client(server: &Server, strict: bool) -> LookupClient {
    LookupClient::with_handler(
        RequestHandler::with_base_url("botblock-tests", server.url()),
        strict,
    )
}

fn bot_path() -> String {
    format!("/bots/{BOT_ID}")
}

#[tokio::test]
async fn server_count_matches_full_bot_info() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", bot_path().as_str())
        .match_header("user-agent", "botblock-tests")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(bot_info_json().to_string())
        .expect(2)
        .create_async()
        .await;

    let lookup = client(&server, true);
    let info = lookup.get_bot_info(BOT_ID).await.unwrap();
    let count = lookup.get_server_count(BOT_ID.to_string()).await.unwrap();

    assert_eq!(count, info.server_count);
    assert_eq!(count, 1337);
    mock.assert_async().await;
}

#[tokio::test]
async fn field_accessors_project_bot_info() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", bot_path().as_str())
        .with_status(200)
        .with_body(bot_info_json().to_string())
        .expect(10)
        .create_async()
        .await;

    let lookup = client(&server, true);
    assert_eq!(lookup.get_name(BOT_ID).await.unwrap(), "Testbot");
    assert_eq!(lookup.get_discriminator(BOT_ID).await.unwrap(), "0001");
    assert_eq!(
        lookup.get_owners(BOT_ID).await.unwrap(),
        vec!["204232208049766400".to_string()]
    );
    assert_eq!(lookup.get_prefix(BOT_ID).await.unwrap(), "!");
    assert_eq!(lookup.get_library(BOT_ID).await.unwrap(), "serenity");
    assert!(lookup.get_invite(BOT_ID).await.unwrap().contains("oauth2"));
    assert_eq!(
        lookup.get_website(BOT_ID).await.unwrap(),
        "https://testbot.example"
    );
    assert_eq!(
        lookup.get_support_link(BOT_ID).await.unwrap(),
        "https://discord.gg/example"
    );
    assert_eq!(
        lookup.get_github(BOT_ID).await.unwrap(),
        "https://github.com/example/testbot"
    );
    assert_eq!(lookup.get_server_count(BOT_ID).await.unwrap(), 1337);
    mock.assert_async().await;
}

#[tokio::test]
async fn unknown_site_fails_before_any_request() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let lookup = client(&server, false);
    assert!(matches!(
        lookup.get_bot_list(BOT_ID, "not-a-list.example").await,
        Err(BotBlockError::UnknownSite(site)) if site == "not-a-list.example"
    ));
    assert!(matches!(
        lookup.get_bot_list_info_for(BOT_ID, "nope").await,
        Err(BotBlockError::UnknownSite(_))
    ));
    assert!(matches!(
        lookup.get_directory_bot(BOT_ID, String::from("nope")).await,
        Err(BotBlockError::UnknownSite(_))
    ));
    // Known site, but it only accepts posts
    assert!(matches!(
        lookup.get_bot_list_info_for(BOT_ID, Site::DisforgeCom).await,
        Err(BotBlockError::InvalidArgument(_))
    ));
    assert!(matches!(
        lookup.get_bot_info("").await,
        Err(BotBlockError::InvalidArgument(_))
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_always_surfaces() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", bot_path().as_str())
        .with_status(429)
        .with_body(
            json!({
                "error": true,
                "status": 429,
                "retry_after": 12,
                "ratelimit_route": "/api/bots/:id",
                "ratelimit_ip": "127.0.0.1",
                "ratelimit_bot_id": null
            })
            .to_string(),
        )
        .create_async()
        .await;

    for strict in [true, false] {
        match client(&server, strict).get_bot_info(BOT_ID).await {
            Err(BotBlockError::RateLimited(limit)) => {
                assert_eq!(limit.retry_after.as_secs(), 12);
                assert_eq!(limit.route.as_deref(), Some("/api/bots/:id"));
            }
            other => panic!("expected a rate limit, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn best_effort_mode_returns_defaults() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", bot_path().as_str())
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let strict = client(&server, true);
    assert!(matches!(
        strict.get_bot_info(BOT_ID).await,
        Err(BotBlockError::SiteUnreachable { .. })
    ));

    let lenient = client(&server, false);
    assert_eq!(lenient.get_server_count(BOT_ID).await.unwrap(), 0);
    assert!(lenient.get_owners(BOT_ID).await.unwrap().is_empty());
    assert!(lenient.get_bot_list_info(BOT_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_or_garbled_bodies_are_malformed() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", bot_path().as_str())
        .with_status(200)
        .with_body("")
        .create_async()
        .await;
    server
        .mock("GET", "/lists/discord.bots.gg")
        .with_status(200)
        .with_body("{not json")
        .create_async()
        .await;

    let lookup = client(&server, true);
    assert!(matches!(
        lookup.get_bot_info(BOT_ID).await,
        Err(BotBlockError::MalformedResponse(_))
    ));
    assert!(matches!(
        lookup.get_bot_list(BOT_ID, Site::DiscordBotsGg).await,
        Err(BotBlockError::MalformedResponse(_))
    ));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn empty_body_is_returned_not_logged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut server = Server::new_async().await;
    server
        .mock("GET", bot_path().as_str())
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let result = client(&server, true).get_bot_info(BOT_ID).await;
    assert!(matches!(result, Err(BotBlockError::MalformedResponse(_))));

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.is_empty(), "unexpected log output: {output}");
}

#[tokio::test]
async fn list_info_per_site() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", bot_path().as_str())
        .with_status(200)
        .with_body(bot_info_json().to_string())
        .create_async()
        .await;

    let lookup = client(&server, true);
    let all = lookup.get_bot_list_info(BOT_ID).await.unwrap();
    assert_eq!(all.len(), 2);

    let gg = lookup
        .get_bot_list_info_for(BOT_ID, "discord.bots.gg")
        .await
        .unwrap()
        .unwrap();
    assert!(gg.is_success());
    assert_eq!(gg.data()["guildCount"], 1337);

    let yabl = lookup
        .get_bot_list_info_for(BOT_ID, Site::YablXyz)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(yabl.status(), 404);

    assert!(lookup
        .get_bot_list_info_for(BOT_ID, Site::BlistXyz)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn all_lists() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/lists")
        .with_status(200)
        .with_body(
            json!({
                "discord.bots.gg": list_json("discord.bots.gg", None),
                "yabl.xyz": list_json("yabl.xyz", None)
            })
            .to_string(),
        )
        .create_async()
        .await;

    let lists = client(&server, true).get_bot_lists(BOT_ID).await.unwrap();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists["discord.bots.gg"].name, "Discord Bots");
    mock.assert_async().await;
}

#[tokio::test]
async fn filtered_lists() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/lists")
        .match_query(Matcher::UrlEncoded("filter".into(), "true".into()))
        .with_status(200)
        .with_body(json!({"yabl.xyz": list_json("yabl.xyz", None)}).to_string())
        .create_async()
        .await;

    let lists = client(&server, true)
        .get_filtered_bot_lists(BOT_ID)
        .await
        .unwrap();
    assert_eq!(lists.len(), 1);
    assert!(lists.contains_key("yabl.xyz"));
    mock.assert_async().await;
}

#[tokio::test]
async fn single_list_features_and_api_fields() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/lists/discord.bots.gg")
        .with_status(200)
        .with_body(list_json("discord.bots.gg", None).to_string())
        .expect(3)
        .create_async()
        .await;

    let lookup = client(&server, true);
    let list = lookup.get_bot_list(BOT_ID, Site::DiscordBotsGg).await.unwrap();
    assert!(list.discord_only);
    assert!(!list.defunct);

    let features = lookup
        .get_bot_list_features(BOT_ID, "discord.bots.gg")
        .await
        .unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].id, "has_ads");
    assert!(features[0].value);
    assert!(!features[1].value);

    let field = lookup
        .get_api_field(BOT_ID, Site::DiscordBotsGg, ApiField::ServerCount)
        .await
        .unwrap();
    assert_eq!(field.as_deref(), Some("guildCount"));
    mock.assert_async().await;
}

#[tokio::test]
async fn directory_bot_is_read_from_the_site_api() {
    init_tracing();
    let mut server = Server::new_async().await;
    let api_get = format!("{}/directory/bots/:id", server.url());
    server
        .mock("GET", "/lists/discord.bots.gg")
        .with_status(200)
        .with_body(list_json("discord.bots.gg", Some(&api_get)).to_string())
        .create_async()
        .await;
    let directory = server
        .mock("GET", format!("/directory/bots/{BOT_ID}").as_str())
        .with_status(200)
        .with_body(json!({"username": "Testbot", "guildCount": 1337}).to_string())
        .create_async()
        .await;

    let lookup = client(&server, true);
    let raw = lookup
        .get_directory_bot(BOT_ID, Site::DiscordBotsGg)
        .await
        .unwrap();
    assert_eq!(raw["guildCount"], 1337);
    directory.assert_async().await;
}

#[tokio::test]
async fn directory_without_get_endpoint() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/lists/yabl.xyz")
        .with_status(200)
        .with_body(list_json("yabl.xyz", None).to_string())
        .create_async()
        .await;

    assert!(matches!(
        client(&server, true)
            .get_directory_bot(BOT_ID, Site::YablXyz)
            .await,
        Err(BotBlockError::MalformedResponse(_))
    ));
    assert!(client(&server, false)
        .get_directory_bot(BOT_ID, Site::YablXyz)
        .await
        .unwrap()
        .is_null());
}
