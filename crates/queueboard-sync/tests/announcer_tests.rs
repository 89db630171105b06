//! Announcer sequencing and preemption.
//!
//! Most tests use a recording speech engine. The process test runs a small
//! shell script as the TTS program.

#![allow(clippy::unwrap_used)]

mod common;

use common::{PATIENCE, RecordingSpeech, eventually};
use queueboard_sync::{AnnouncementOutcome, Announcer};

#[tokio::test]
async fn second_repetition_starts_after_the_first_ends() {
    let announcer = Announcer::new(RecordingSpeech::default(), 0.6);

    let outcome = announcer.announce("B012", "BILLING").finished().await;

    assert_eq!(outcome, AnnouncementOutcome::Completed);
    assert_eq!(
        announcer.engine().log(),
        vec![
            "cancel",
            "start Now serving B012 at BILLING",
            "end Now serving B012 at BILLING",
            "start Now serving B012 at BILLING",
            "end Now serving B012 at BILLING",
        ]
    );
}

#[tokio::test]
async fn new_announcement_preempts_the_current_one() {
    let announcer = Announcer::new(RecordingSpeech::default(), 0.6);
    announcer.engine().hold(true);

    let first = announcer.announce("L001", "LAB");
    eventually("first utterance to start", || announcer.engine().log().len() == 2).await;

    announcer.engine().hold(false);
    let second = announcer.announce("L002", "LAB");

    assert_eq!(
        tokio::time::timeout(PATIENCE, first.finished()).await.unwrap(),
        AnnouncementOutcome::Preempted
    );
    assert_eq!(
        tokio::time::timeout(PATIENCE, second.finished()).await.unwrap(),
        AnnouncementOutcome::Completed
    );
    assert_eq!(
        announcer.engine().log(),
        vec![
            "cancel",
            "start Now serving L001 at LAB",
            "cancel",
            "start Now serving L002 at LAB",
            "end Now serving L002 at LAB",
            "start Now serving L002 at LAB",
            "end Now serving L002 at LAB",
        ]
    );
}

#[tokio::test]
async fn each_announcement_cancels_the_engine_once() {
    let announcer = Announcer::new(RecordingSpeech::default(), 1.0);
    announcer.announce("C001", "CASHIER").finished().await;
    announcer.announce("C002", "CASHIER").finished().await;

    let log = announcer.engine().log();
    assert_eq!(log.iter().filter(|entry| *entry == "cancel").count(), 2);
    assert_eq!(log.len(), 10);
}

/// A TTS stand-in that logs its start and end, and logs `overlap` if the
/// previous instance is still alive when it starts.
#[cfg(unix)]
fn slow_tts(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("tts.sh");
    let body = format!(
        r#"#!/bin/sh
dir='{}'
for text; do :; done
if [ -f "$dir/pid" ] && kill -0 "$(cat "$dir/pid")" 2>/dev/null; then
  echo "overlap" >> "$dir/log"
fi
echo $$ > "$dir/pid"
echo "start $text" >> "$dir/log"
sleep 1
echo "end $text" >> "$dir/log"
"#,
        dir.display()
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
#[tokio::test]
async fn preempted_tts_process_is_gone_before_the_next_one_starts() {
    use queueboard_sync::CommandSpeech;

    let dir = tempfile::tempdir().unwrap();
    let script = slow_tts(dir.path());
    let log_path = dir.path().join("log");
    let log = || std::fs::read_to_string(&log_path).unwrap_or_default();

    let announcer = Announcer::new(CommandSpeech::new(script.display().to_string()), 1.0);
    let first = announcer.announce("L001", "LAB");
    eventually("first utterance to start", || log().contains("start Now serving L001")).await;

    let second = announcer.announce("L002", "LAB");
    assert_eq!(
        tokio::time::timeout(PATIENCE, first.finished()).await.unwrap(),
        AnnouncementOutcome::Preempted
    );
    assert_eq!(
        tokio::time::timeout(std::time::Duration::from_secs(10), second.finished())
            .await
            .unwrap(),
        AnnouncementOutcome::Completed
    );

    let log = log();
    assert!(!log.contains("overlap"), "two tts processes ran at once:\n{log}");
    assert!(!log.contains("end Now serving L001"), "preempted utterance kept playing:\n{log}");
    assert_eq!(log.matches("end Now serving L002").count(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn cancel_kills_the_running_tts_process() {
    use queueboard_sync::{CommandSpeech, SpeechEngine, SpeechError, Utterance};

    let dir = tempfile::tempdir().unwrap();
    let script = slow_tts(dir.path());
    let log_path = dir.path().join("log");
    let engine = CommandSpeech::new(script.display().to_string());

    let utterance = Utterance::announcement("B012", "BILLING", 1.0);
    let speaking = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.speak(&utterance).await })
    };
    eventually("utterance to start", || {
        std::fs::read_to_string(&log_path).unwrap_or_default().contains("start")
    })
    .await;

    engine.cancel();
    let result = tokio::time::timeout(PATIENCE, speaking).await.unwrap().unwrap();
    assert!(
        matches!(result, Err(SpeechError::Cancelled { .. })),
        "got {result:?}"
    );

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(!log.contains("end"), "cancelled utterance kept playing:\n{log}");
}
