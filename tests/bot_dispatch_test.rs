//! End-to-end dispatch tests: plugins on disk -> Bot -> routed invocations
//! Run with: cargo test --test bot_dispatch_test

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::json;
use tempfile::TempDir;

use blitz::application::{CommandRegistry, Dispatch, COMMAND_FAILURE_MESSAGE};
use blitz::domain::entities::{
    command_action, event_action, ActionResult, Command, CommandInteraction, Event, Responder,
    SlashCommandBuilder, Value,
};
use blitz::domain::traits::{ClientUser, CommandScope, Gateway};
use blitz::domain::client::Client;
use blitz::infrastructure::modules::BuiltinModules;
use blitz::{Bot, BotError, BotOptions, BotState};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Gateway that records command pushes instead of talking to a platform
#[derive(Default)]
struct RecordingGateway {
    pushes: Mutex<Vec<(CommandScope, Vec<serde_json::Value>)>>,
    fail_push: bool,
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn connect(&self, _token: &str, _intents: &[String]) -> Result<ClientUser, BotError> {
        Ok(ClientUser {
            id: "app-1".to_string(),
            username: "blitz".to_string(),
        })
    }

    async fn listen(&self, _client: Arc<Client>) -> Result<(), BotError> {
        Ok(())
    }

    async fn put_commands(
        &self,
        scope: &CommandScope,
        commands: &[serde_json::Value],
    ) -> Result<(), BotError> {
        if self.fail_push {
            return Err(BotError::Network("registration rejected".to_string()));
        }
        self.pushes.lock().unwrap().push((scope.clone(), commands.to_vec()));
        Ok(())
    }
}

/// Responder that records every message sent back to the user
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl Responder for Recorder {
    async fn send(&self, _channel_id: &str, content: &str, ephemeral: bool) -> Result<(), BotError> {
        self.sent.lock().unwrap().push((content.to_string(), ephemeral));
        Ok(())
    }
}

impl Recorder {
    fn messages(&self) -> Vec<(String, bool)> {
        self.sent.lock().unwrap().clone()
    }
}

fn plugin_dir(root: &Path, name: &str, config: Option<&str>) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    if let Some(yaml) = config {
        fs::write(dir.join("blitz.config.yaml"), yaml).unwrap();
    }
    dir
}

fn module_file(plugin: &Path, sub: &str, file: &str) -> PathBuf {
    let dir = plugin.join(sub);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, b"").unwrap();
    path
}

fn bot(root: &TempDir, gateway: Arc<RecordingGateway>, modules: BuiltinModules, server: Option<&str>) -> Bot {
    let options = BotOptions {
        token: "secret".to_string(),
        intents: None,
        plugins_dir: Some(root.path().to_path_buf()),
        server: server.map(str::to_string),
    };
    Bot::new(options, gateway, Arc::new(modules))
}

/// A command that replies with `text`
fn reply_command(name: &'static str, text: &'static str) -> Value {
    Command::new(
        SlashCommandBuilder::new(name).with_description("test"),
        command_action(move |_, interaction, _| async move { interaction.reply(text).await }),
    )
    .into_value()
}

fn crash() -> ActionResult {
    panic!("handler crashed after deferring")
}

fn failing_command(name: &'static str) -> Value {
    Command::new(
        SlashCommandBuilder::new(name).with_description("always fails"),
        command_action(|_, _, _| async { Err(BotError::Plugin("boom".to_string())) }),
    )
    .into_value()
}

async fn invoke(client: &Arc<Client>, name: &str) -> Arc<Recorder> {
    let recorder = Arc::new(Recorder::default());
    let interaction = CommandInteraction::new(name, "chat-1", recorder.clone());
    client.dispatch_interaction(interaction).await;
    recorder
}

#[tokio::test]
async fn test_last_discovered_plugin_wins_command_name() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let a = plugin_dir(root.path(), "a-plugin", None);
    let b = plugin_dir(root.path(), "b-plugin", None);
    let modules = BuiltinModules::new()
        .with_module(module_file(&a, "commands", "ping.mod"), || reply_command("ping", "from a"))
        .with_module(module_file(&b, "commands", "ping.mod"), || reply_command("ping", "from b"));

    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), modules, None);
    bot.start().await.unwrap();

    assert_eq!(bot.plugins().len(), 2);
    assert_eq!(bot.commands().len(), 1);
    assert_eq!(bot.commands().get("ping").unwrap().plugin, "b-plugin");

    let recorder = invoke(&bot.client(), "ping").await;
    assert_eq!(recorder.messages(), vec![("from b".to_string(), false)]);
}

#[tokio::test]
async fn test_failing_handler_is_acknowledged_once() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let tools = plugin_dir(root.path(), "tools", None);
    let modules = BuiltinModules::new()
        .with_module(module_file(&tools, "commands", "broken.mod"), || failing_command("broken"))
        .with_module(module_file(&tools, "commands", "ping.mod"), || reply_command("ping", "pong"));

    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), modules, None);
    bot.start().await.unwrap();
    let client = bot.client();

    let failed = invoke(&client, "broken").await;
    assert_eq!(failed.messages(), vec![(COMMAND_FAILURE_MESSAGE.to_string(), true)]);

    let ok = invoke(&client, "ping").await;
    assert_eq!(ok.messages(), vec![("pong".to_string(), false)]);
}

#[tokio::test]
async fn test_failure_after_deferral_uses_follow_up() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let tools = plugin_dir(root.path(), "tools", None);
    let modules = BuiltinModules::new().with_module(module_file(&tools, "commands", "slow.mod"), || {
        Command::new(
            SlashCommandBuilder::new("slow"),
            command_action(|_, interaction, _| async move {
                interaction.defer_reply().await?;
                crash()
            }),
        )
        .into_value()
    });

    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), modules, None);
    bot.start().await.unwrap();

    let recorder = Arc::new(Recorder::default());
    let interaction = Arc::new(CommandInteraction::new("slow", "chat-1", recorder.clone()));
    let outcome = bot.commands().dispatch(bot.client(), interaction.clone()).await;

    assert_eq!(outcome, Dispatch::Failed);
    assert!(interaction.deferred());
    assert_eq!(recorder.messages(), vec![(COMMAND_FAILURE_MESSAGE.to_string(), true)]);
}

#[tokio::test]
async fn test_unknown_command_is_dropped() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), BuiltinModules::new(), None);
    bot.start().await.unwrap();

    let recorder = Arc::new(Recorder::default());
    let interaction = Arc::new(CommandInteraction::new("nope", "chat-1", recorder.clone()));
    let outcome = bot.commands().dispatch(bot.client(), interaction).await;

    assert_eq!(outcome, Dispatch::Unknown);
    assert!(recorder.messages().is_empty());
}

#[tokio::test]
async fn test_handler_receives_shared_plugin_settings() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let counter = plugin_dir(
        root.path(),
        "counter",
        Some("name: counter\nversion: \"1.0\"\nconfig:\n  greeting: hi\n  count: 0\n"),
    );
    let modules = BuiltinModules::new().with_module(module_file(&counter, "commands", "count.mod"), || {
        Command::new(
            SlashCommandBuilder::new("count"),
            command_action(|_, interaction, settings| async move {
                let reply = {
                    let mut settings = settings.write().await;
                    let count = settings["count"].as_i64().unwrap_or(0) + 1;
                    settings.insert("count".to_string(), json!(count));
                    format!("{} #{}", settings["greeting"].as_str().unwrap_or(""), count)
                };
                interaction.reply(reply).await
            }),
        )
        .into_value()
    });

    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), modules, None);
    bot.start().await.unwrap();
    let client = bot.client();

    assert_eq!(invoke(&client, "count").await.messages()[0].0, "hi #1");
    assert_eq!(invoke(&client, "count").await.messages()[0].0, "hi #2");
}

#[tokio::test]
async fn test_commands_pushed_to_global_scope() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let tools = plugin_dir(root.path(), "tools", None);
    let modules = BuiltinModules::new()
        .with_module(module_file(&tools, "commands", "ping.mod"), || reply_command("ping", "pong"));
    let gateway = Arc::new(RecordingGateway::default());

    let mut bot = bot(&root, gateway.clone(), modules, None);
    bot.start().await.unwrap();

    assert_eq!(bot.state(), BotState::CommandsRegistered);
    let pushes = gateway.pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    assert_eq!(
        pushes[0].0,
        CommandScope::Global {
            application_id: "app-1".to_string()
        }
    );
    assert_eq!(pushes[0].1, vec![json!({"name": "ping", "description": "test"})]);
}

#[tokio::test]
async fn test_commands_pushed_to_deployment_scope() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let gateway = Arc::new(RecordingGateway::default());

    let mut bot = bot(&root, gateway.clone(), BuiltinModules::new(), Some("guild-9"));
    bot.start().await.unwrap();

    let pushes = gateway.pushes.lock().unwrap();
    assert_eq!(
        pushes[0].0,
        CommandScope::Deployment {
            application_id: "app-1".to_string(),
            target: "guild-9".to_string()
        }
    );
    assert!(pushes[0].1.is_empty());
}

#[tokio::test]
async fn test_empty_server_registers_globally() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let gateway = Arc::new(RecordingGateway::default());

    let mut bot = bot(&root, gateway.clone(), BuiltinModules::new(), Some(""));
    bot.start().await.unwrap();

    let pushes = gateway.pushes.lock().unwrap();
    assert_eq!(
        pushes[0].0,
        CommandScope::Global {
            application_id: "app-1".to_string()
        }
    );
}

#[tokio::test]
async fn test_hung_ready_handler_does_not_block_startup() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let stuck = plugin_dir(root.path(), "stuck", None);
    let modules = BuiltinModules::new()
        .with_module(module_file(&stuck, "commands", "ping.mod"), || reply_command("ping", "pong"))
        .with_module(module_file(&stuck, "events", "ready.mod"), || {
            Event::new(
                "ready",
                event_action(|_, _, _| std::future::pending::<ActionResult>()),
            )
            .once()
            .into_value()
        });
    let gateway = Arc::new(RecordingGateway::default());

    let mut bot = bot(&root, gateway.clone(), modules, None);
    let started = tokio::time::timeout(Duration::from_secs(2), bot.start()).await;

    assert!(matches!(started, Ok(Ok(()))));
    assert_eq!(bot.state(), BotState::CommandsRegistered);
    assert_eq!(gateway.pushes.lock().unwrap().len(), 1);

    let recorder = invoke(&bot.client(), "ping").await;
    assert_eq!(recorder.messages(), vec![("pong".to_string(), false)]);
}

#[tokio::test]
async fn test_hung_event_handler_does_not_starve_other_plugins() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let a = plugin_dir(root.path(), "a-stuck", None);
    let b = plugin_dir(root.path(), "b-counter", None);
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let modules = BuiltinModules::new()
        .with_module(module_file(&a, "events", "join.mod"), || {
            Event::new(
                "memberJoin",
                event_action(|_, _, _| std::future::pending::<ActionResult>()),
            )
            .into_value()
        })
        .with_module(module_file(&b, "events", "join.mod"), move || {
            let counter = counter.clone();
            Event::new(
                "memberJoin",
                event_action(move |_, _, _| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .into_value()
        });

    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), modules, None);
    bot.start().await.unwrap();

    let handles = bot.client().emit("memberJoin", Vec::new());
    assert_eq!(handles.len(), 2);

    let mut handles = handles.into_iter();
    let stuck = handles.next().unwrap();
    let counted = handles.next().unwrap();
    tokio::time::timeout(Duration::from_secs(1), counted)
        .await
        .expect("sibling listener should finish")
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!stuck.is_finished());
}

#[tokio::test]
async fn test_failed_registration_keeps_bot_alive() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let tools = plugin_dir(root.path(), "tools", None);
    let modules = BuiltinModules::new()
        .with_module(module_file(&tools, "commands", "ping.mod"), || reply_command("ping", "pong"));
    let gateway = Arc::new(RecordingGateway {
        fail_push: true,
        ..Default::default()
    });

    let mut bot = bot(&root, gateway, modules, None);
    bot.run().await.unwrap();

    assert_eq!(bot.state(), BotState::Running);
    let recorder = invoke(&bot.client(), "ping").await;
    assert_eq!(recorder.messages(), vec![("pong".to_string(), false)]);
}

#[tokio::test]
async fn test_events_subscribed_with_plugin_settings() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let hello = plugin_dir(
        root.path(),
        "hello",
        Some("name: hello\nversion: \"0.1\"\nconfig:\n  channel: lobby\n"),
    );
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let fired_once = Arc::new(AtomicUsize::new(0));

    let seen_by_handler = seen.clone();
    let once_counter = fired_once.clone();
    let modules = BuiltinModules::new()
        .with_module(module_file(&hello, "events", "member.mod"), move || {
            let seen = seen_by_handler.clone();
            Event::new(
                "memberJoin",
                event_action(move |_, settings, args| {
                    let seen = seen.clone();
                    async move {
                        let channel = settings.read().await["channel"].as_str().unwrap_or("").to_string();
                        let who = args.first().and_then(|a| a.as_str()).unwrap_or("").to_string();
                        seen.lock().unwrap().push(format!("{}@{}", who, channel));
                        Ok(())
                    }
                }),
            )
            .into_value()
        })
        .with_module(module_file(&hello, "events", "welcome.mod"), move || {
            let counter = once_counter.clone();
            Event::new(
                "memberJoin",
                event_action(move |_, _, _| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(BotError::Plugin("welcome failed".to_string()))
                    }
                }),
            )
            .once()
            .into_value()
        });

    let mut bot = bot(&root, Arc::new(RecordingGateway::default()), modules, None);
    bot.start().await.unwrap();
    let client = bot.client();

    join_all(client.emit("memberJoin", vec![json!("ana")])).await;
    join_all(client.emit("memberJoin", vec![json!("bo")])).await;

    assert_eq!(*seen.lock().unwrap(), vec!["ana@lobby", "bo@lobby"]);
    assert_eq!(fired_once.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_plugins_root_starts_empty() {
    ensure_init();
    let root = TempDir::new().unwrap();
    let options = BotOptions {
        token: "secret".to_string(),
        intents: None,
        plugins_dir: Some(root.path().join("missing")),
        server: None,
    };
    let mut bot = Bot::new(options, Arc::new(RecordingGateway::default()), Arc::new(BuiltinModules::new()));

    bot.start().await.unwrap();
    assert!(bot.plugins().is_empty());
    assert!(bot.commands().is_empty());
    assert!(bot.start().await.is_err());
}

#[test]
fn test_registry_from_plugins_is_empty_for_no_plugins() {
    assert!(CommandRegistry::from_plugins(&[]).is_empty());
}
