use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use super::debouncer::Debouncer;
use super::types::ChangeKind;
use super::FsActor;

const WINDOW: Duration = Duration::from_millis(100);

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ))
}

#[test]
fn test_debouncer_empty() {
    let mut debouncer = Debouncer::new(WINDOW);
    assert!(!debouncer.is_ready());
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() > Duration::from_secs(60));
}

#[test]
fn test_event_kinds() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add_event(&make_event(vec!["/src/a.scss"], create_kind()));
    debouncer.add_event(&make_event(vec!["/src/b.scss"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/src/c.scss"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("/src/a.scss")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/src/b.scss")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[&PathBuf::from("/src/c.scss")], ChangeKind::Removed);
}

#[test]
fn test_metadata_and_temp_files_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add_event(&make_event(vec!["/src/a.scss"], metadata_kind()));
    debouncer.add_event(&make_event(vec!["/src/.style.scss.swp"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/src/style.scss~"], modify_kind()));

    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_dedup_rules() {
    let mut debouncer = Debouncer::new(WINDOW);

    // First event wins
    debouncer.add_event(&make_event(vec!["/src/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/src/a.js"], modify_kind()));
    // Restored
    debouncer.add_event(&make_event(vec!["/src/b.js"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/src/b.js"], create_kind()));
    // Deleted
    debouncer.add_event(&make_event(vec!["/src/c.js"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/src/c.js"], remove_kind()));
    // Appeared then vanished
    debouncer.add_event(&make_event(vec!["/src/d.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/src/d.js"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("/src/a.js")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/src/b.js")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/src/c.js")], ChangeKind::Removed);
}

#[test]
fn test_ready_after_quiet_window() {
    let mut debouncer = Debouncer::new(Duration::from_millis(30));
    debouncer.add_event(&make_event(vec!["/src/b.js", "/src/a.js"], modify_kind()));
    assert!(!debouncer.is_ready());
    assert!(debouncer.sleep_duration() <= Duration::from_millis(30));

    std::thread::sleep(Duration::from_millis(40));
    let batch = debouncer.take_if_ready().unwrap();
    let paths: Vec<_> = batch.into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths, vec![PathBuf::from("/src/a.js"), PathBuf::from("/src/b.js")]);
    assert!(debouncer.take_if_ready().is_none());
}

#[tokio::test]
async fn test_burst_becomes_one_batch() {
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let (tx, mut rx) = mpsc::channel::<Vec<PathBuf>>(8);
    let actor = FsActor::with_events(notify_rx, tx, |paths| paths, WINDOW);
    let handle = tokio::spawn(actor.run());

    for _ in 0..5 {
        notify_tx
            .send(Ok(make_event(vec!["/src/scss/style.scss"], modify_kind())))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let batch = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch, vec![PathBuf::from("/src/scss/style.scss")]);

    // Nothing else follows the burst.
    let extra = tokio::time::timeout(WINDOW * 3, rx.recv()).await;
    assert!(extra.is_err());

    // Closing the notify side stops the actor.
    drop(notify_tx);
    tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .unwrap()
        .unwrap();
}
