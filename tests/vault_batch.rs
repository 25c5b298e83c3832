// Batch runs and note extraction against a real directory.
use chrono::NaiveDate;
use duebump::batch::{BatchContext, run_batch};
use duebump::config::RecognitionConfig;
use duebump::context::TestContext;
use duebump::extract::run_extract;
use duebump::model::{MARKER, ShiftPolicy};
use duebump::storage::{DocumentHandle, DocumentSink, DocumentSource, FsVault};
use std::fs;

fn today() -> BatchContext {
    BatchContext::at(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
}

#[test]
fn test_overdue_batch_rewrites_only_changed_files() {
    let ctx = TestContext::new();
    let root = ctx.vault_dir();
    fs::create_dir_all(root.join("Projects")).unwrap();
    fs::write(
        root.join("Inbox.md"),
        "# Inbox\n- [ ] Pay rent 📅 2025-03-01\n- [ ] Renew passport 📅 2099-01-01\n",
    )
    .unwrap();
    fs::write(root.join("Projects/Garden.md"), "- [ ] Plant tree 📅 2025-03-10\n").unwrap();
    let garden_before = fs::metadata(root.join("Projects/Garden.md"))
        .unwrap()
        .modified()
        .unwrap();

    let vault = FsVault::new(&root);
    let summary = run_batch(
        &vault,
        &vault,
        ShiftPolicy::AdvanceOverdueToTomorrow,
        &RecognitionConfig::default(),
        today(),
    )
    .unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.changed, vec![DocumentHandle::new("Inbox.md")]);
    assert_eq!(
        fs::read_to_string(root.join("Inbox.md")).unwrap(),
        "# Inbox\n- [ ] Pay rent 📅 2025-03-11\n- [ ] Renew passport 📅 2099-01-01\n"
    );
    let garden_after = fs::metadata(root.join("Projects/Garden.md"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(garden_before, garden_after);
}

#[cfg(unix)]
#[test]
fn test_symlinked_folders_do_not_shift_a_task_twice() {
    use std::os::unix::fs::symlink;

    let ctx = TestContext::new();
    let root = ctx.vault_dir();
    fs::create_dir_all(root.join("Projects")).unwrap();
    fs::write(root.join("a.md"), "- [ ] Buy milk 📅 2023-08-09\n").unwrap();
    fs::write(root.join("Projects/p.md"), "- [ ] Plan 📅 2023-01-15\n").unwrap();
    symlink(&root, root.join("loop")).unwrap();
    symlink(root.join("Projects"), root.join("Archive")).unwrap();

    let vault = FsVault::new(&root);
    let summary = run_batch(
        &vault,
        &vault,
        ShiftPolicy::AdvanceOneYear,
        &RecognitionConfig::default(),
        BatchContext::at(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
    )
    .unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.changed.len(), 2);
    assert_eq!(
        fs::read_to_string(root.join("a.md")).unwrap(),
        "- [ ] Buy milk 📅 2024-08-09\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("Projects/p.md")).unwrap(),
        "- [ ] Plan 📅 2024-01-15\n"
    );
}

#[test]
fn test_unreadable_document_does_not_stop_batch() {
    let ctx = TestContext::new();
    let root = ctx.vault_dir();
    fs::write(root.join("a.md"), [b'-', b' ', 0xff, 0xfe]).unwrap();
    fs::write(root.join("b.md"), "- [ ] Call plumber\n").unwrap();

    let vault = FsVault::new(&root);
    let summary = run_batch(
        &vault,
        &vault,
        ShiftPolicy::SetMissingToToday,
        &RecognitionConfig::default(),
        today(),
    )
    .unwrap();

    assert_eq!(summary.io_failure_count(), 1);
    assert_eq!(summary.changed, vec![DocumentHandle::new("b.md")]);
    assert_eq!(fs::read(root.join("a.md")).unwrap(), vec![b'-', b' ', 0xff, 0xfe]);
    assert_eq!(
        fs::read_to_string(root.join("b.md")).unwrap(),
        "- [ ] Call plumber 📅 2025-03-10\n"
    );
}

#[test]
fn test_marker_bytes_survive_read_compare_write() {
    let ctx = TestContext::new();
    let root = ctx.vault_dir();
    let original = "- [ ] Buy milk \u{1F4C5} 2023-08-09\n- [ ] Other 📅  2023-08-09\n";
    fs::write(root.join("milk.md"), original.as_bytes()).unwrap();

    let vault = FsVault::new(&root);
    let handle = DocumentHandle::new("milk.md");
    let read = vault.read_text(&handle).unwrap();
    assert_eq!(read.as_bytes(), original.as_bytes());
    assert!(read.contains(MARKER));

    vault.write_text(&handle, &read).unwrap();
    assert_eq!(fs::read(root.join("milk.md")).unwrap(), original.as_bytes());

    run_batch(
        &vault,
        &vault,
        ShiftPolicy::AdvanceOneYear,
        &RecognitionConfig::default(),
        today(),
    )
    .unwrap();
    let bytes = fs::read(root.join("milk.md")).unwrap();
    let marker_bytes = [0xF0, 0x9F, 0x93, 0x85];
    let count = bytes.windows(4).filter(|w| *w == marker_bytes).count();
    assert_eq!(count, 2);
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "- [ ] Buy milk 📅 2024-08-09\n- [ ] Other 📅  2023-08-09\n"
    );
}

#[test]
fn test_extract_creates_notes_and_links() {
    let ctx = TestContext::new();
    let root = ctx.vault_dir();
    fs::create_dir_all(root.join("Tasks")).unwrap();
    fs::write(root.join("Tasks/Buy milk.md"), "# Buy milk\n").unwrap();
    fs::write(
        root.join("Daily.md"),
        "# Today\n- [ ] Buy milk 📅 2023-08-09\n- [ ] Call plumber\n- [x] Done already\n",
    )
    .unwrap();

    let vault = FsVault::new(&root);
    let summary = run_extract(&vault, &vault, &DocumentHandle::new("Daily.md"), "Tasks").unwrap();

    assert!(summary.source_updated);
    let created: Vec<&str> = summary.created.iter().map(|h| h.as_str()).collect();
    assert_eq!(created, vec!["Tasks/Buy milk (2).md", "Tasks/Call plumber.md"]);
    assert_eq!(
        fs::read_to_string(root.join("Daily.md")).unwrap(),
        "# Today\n- [ ] [[Buy milk (2)]] 📅 2023-08-09\n- [ ] [[Call plumber]]\n- [x] Done already\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("Tasks/Call plumber.md")).unwrap(),
        "# Call plumber\n\nSource: [[Daily]]\n"
    );
    // Existing note untouched.
    assert_eq!(
        fs::read_to_string(root.join("Tasks/Buy milk.md")).unwrap(),
        "# Buy milk\n"
    );

    // Second run has nothing left to extract.
    let again = run_extract(&vault, &vault, &DocumentHandle::new("Daily.md"), "Tasks").unwrap();
    assert!(again.created.is_empty());
    assert!(!again.source_updated);
}

#[test]
fn test_extract_missing_source_is_an_error() {
    let ctx = TestContext::new();
    let vault = FsVault::new(ctx.vault_dir());
    assert!(run_extract(&vault, &vault, &DocumentHandle::new("nope.md"), "Tasks").is_err());
}
