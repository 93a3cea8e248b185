//! Supervisor lifecycle against in-memory collaborators

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{io::Write, sync::Arc, time::Duration};

use megaphone::{ConfigError, Megaphone, MegaphoneConfig, config::find_config_file_from};
use megaphone_common::Signal;
use megaphone_delivery::{
    BroadcastCommand, ChatAdministrator, Collaborators,
    backends::{MemoryDirectory, RecordingSink, ScriptedTransport},
};
use pretty_assertions::assert_eq;

fn supervisor(
    config: MegaphoneConfig,
) -> (Megaphone, Arc<MemoryDirectory>, Arc<ScriptedTransport>) {
    let directory = Arc::new(MemoryDirectory::new());
    let transport = Arc::new(ScriptedTransport::new());

    let megaphone = Megaphone::new(
        config,
        Collaborators {
            directory: directory.clone(),
            transport: transport.clone(),
            capabilities: directory.capabilities(),
        },
    );

    (megaphone, directory, transport)
}

#[tokio::test(start_paused = true)]
async fn test_run_reconciles_and_stops_on_shutdown() {
    let (megaphone, directory, transport) = supervisor(MegaphoneConfig::default());
    directory.set_active_chats([-1]);
    transport.set_administrators(
        -1,
        vec![ChatAdministrator {
            user_id: 77,
            can_manage_video_chats: true,
        }],
    );

    let admins = megaphone.admins();
    let stop = megaphone.shutdown_handle();
    let task = tokio::spawn(megaphone.run());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(admins.is_operator(-1, 77));

    stop.send(Signal::Shutdown).unwrap();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("supervisor should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_orchestrator_is_shared() {
    let config = MegaphoneConfig::from_ron("(broadcast: (chat_batch_size: 1))").unwrap();
    let (megaphone, directory, transport) = supervisor(config);
    directory.set_primary_chats([-1, -2]);

    let sink = RecordingSink::new(-10);
    let command = BroadcastCommand {
        chat_id: -10,
        reply_to: None,
        arguments: Some("hello".to_string()),
    };

    let summary = megaphone
        .orchestrator()
        .broadcast(&command, &sink)
        .await
        .unwrap();

    let chats = summary.chats.unwrap();
    assert_eq!(chats.batches, 2);
    assert_eq!(chats.sent, 2);
    assert_eq!(transport.attempts(-2), 1);
    assert_eq!(megaphone.orchestrator().config().chat_batch_size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconciler_stops_with_the_supervisor_channel() {
    let (megaphone, _directory, _transport) = supervisor(MegaphoneConfig::default());

    let reconciler = megaphone.start_reconciler();
    megaphone.shutdown_handle().send(Signal::Shutdown).unwrap();

    tokio::time::timeout(Duration::from_secs(1), reconciler)
        .await
        .expect("reconciler should stop")
        .unwrap();
}

#[test]
fn test_load_from_discovered_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("megaphone.config.ron");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "(broadcast: (max_rate_limit_wait_secs: Some(120)), reconciler: (interval_secs: 5))"
    )
    .unwrap();

    let missing = dir.path().join("missing.ron");
    let found = find_config_file_from(None, &[missing, path.clone()]).unwrap();
    assert_eq!(found, path);

    let config = MegaphoneConfig::load(&found).unwrap();
    assert_eq!(config.broadcast.max_rate_limit_wait_secs, Some(120));
    assert_eq!(config.reconciler.interval_secs, 5);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = MegaphoneConfig::load(&dir.path().join("absent.ron"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
