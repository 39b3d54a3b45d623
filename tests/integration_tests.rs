/// Integration tests for rulesort
///
/// These tests drive the public engine API against real temporary
/// directories, end to end: snapshot, plan, execute, undo and the timer.
///
/// Test categories:
/// 1. Rule-based moves
/// 2. Conflict policies
/// 3. Undo and the persisted journal
/// 4. Catch-all, dated folders and pattern warnings
/// 5. Timer and stop requests
/// 6. Configuration
use chrono::NaiveDate;
use rulesort::executor;
use rulesort::planner;
use rulesort::{
    CatchAll, ConflictPolicy, DelaySettings, Engine, EngineConfig, EngineEvent, Notifier,
    OrganizeError, PatternKind, Recorder, Rule, RuleSet, Settings, Snapshot, SnapshotFilters,
    StopHandle, TimerState, UndoJournal,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary source directory plus helpers to populate and inspect it.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_text_file(&self, rel_path: &str, content: &str) {
        let file_path = self.path().join(rel_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }

    fn create_subdir(&self, name: &str) {
        fs::create_dir_all(self.path().join(name)).expect("Failed to create subdirectory");
    }

    fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.path().join(rel_path)).expect("Failed to read file")
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_file(),
            "File should exist: {}",
            path.display()
        );
    }

    fn assert_dir_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_dir(),
            "Directory should exist: {}",
            path.display()
        );
    }

    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }

    /// Names directly inside the fixture, sorted.
    fn top_level(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path())
            .expect("Failed to read directory")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn engine(&self, rules: Vec<Rule>) -> Engine<Recorder> {
        self.engine_with(rules, |_| {})
    }

    fn engine_with(
        &self,
        rules: Vec<Rule>,
        adjust: impl FnOnce(&mut EngineConfig),
    ) -> Engine<Recorder> {
        let mut config = EngineConfig::new(self.path(), RuleSet::from(rules));
        adjust(&mut config);
        Engine::new(config, Recorder::new())
    }
}

fn ext(pattern: &str, destination: &str) -> Rule {
    Rule::new(pattern, PatternKind::Extension, destination)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 7).expect("valid date")
}

// ============================================================================
// Test Suite 1: Rule-based moves
// ============================================================================

#[test]
fn test_two_rules_move_both_files() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.jpg", "image");
    fixture.create_text_file("b.txt", "text");

    let mut engine = fixture.engine(vec![ext(".jpg", "dirA"), ext(".txt", "dirB")]);
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 2);
    assert_eq!(result.failed_count(), 0);
    fixture.assert_file_exists("dirA/a.jpg");
    fixture.assert_file_exists("dirB/b.txt");
    fixture.assert_not_exists("a.jpg");
    fixture.assert_not_exists("b.txt");

    let batch = engine.journal().peek().expect("one batch");
    assert_eq!(engine.journal().len(), 1);
    assert_eq!(batch.records.len(), 2);
}

#[test]
fn test_first_matching_rule_wins() {
    let fixture = TestFixture::new();
    fixture.create_text_file("invoice_2024.pdf", "pdf");
    fixture.create_text_file("notes.pdf", "pdf");

    let mut engine = fixture.engine(vec![
        Rule::new("invoice", PatternKind::Keyword, "Invoices"),
        ext("pdf", "Documents"),
    ]);
    engine.execute_now().expect("run");

    fixture.assert_file_exists("Invoices/invoice_2024.pdf");
    fixture.assert_file_exists("Documents/notes.pdf");
    fixture.assert_not_exists("Documents/invoice_2024.pdf");
}

#[test]
fn test_reordering_rules_changes_the_winner() {
    let fixture = TestFixture::new();
    fixture.create_text_file("invoice.pdf", "pdf");

    let mut engine = fixture.engine(vec![
        Rule::new("invoice", PatternKind::Keyword, "Invoices"),
        ext(".pdf", "Documents"),
    ]);
    engine.rules_mut().swap(0, 1).expect("swap");
    engine.execute_now().expect("run");

    fixture.assert_file_exists("Documents/invoice.pdf");
}

#[test]
fn test_matching_ignores_case() {
    let fixture = TestFixture::new();
    fixture.create_text_file("PHOTO.JPG", "image");
    fixture.create_text_file("Report-Final.txt", "text");

    let mut engine = fixture.engine(vec![
        ext(".jpg", "Images"),
        Rule::new("report", PatternKind::Keyword, "Reports"),
    ]);
    engine.execute_now().expect("run");

    fixture.assert_file_exists("Images/PHOTO.JPG");
    fixture.assert_file_exists("Reports/Report-Final.txt");
}

#[test]
fn test_folders_move_only_through_directory_marker() {
    let fixture = TestFixture::new();
    fixture.create_text_file("project.txt/readme.md", "nested");
    fixture.create_subdir("holiday");
    fixture.create_text_file("notes.txt", "text");

    let mut engine = fixture.engine(vec![
        ext(".txt", "Text"),
        Rule::new("[folders]", PatternKind::DirectoryMarker, "Folders"),
    ]);
    engine.execute_now().expect("run");

    fixture.assert_file_exists("Text/notes.txt");
    fixture.assert_file_exists("Folders/project.txt/readme.md");
    fixture.assert_dir_exists("Folders/holiday");
}

#[test]
fn test_empty_rule_set_plans_nothing() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let mut engine = fixture.engine(Vec::new());
    let plan = engine.preview().expect("preview");
    assert!(plan.is_empty());

    let result = engine.execute_now().expect("run").expect("ran");
    assert_eq!(result.moved_count(), 0);
    assert_eq!(result.failed_count(), 0);
    assert!(engine.journal().is_empty());
    assert!(engine.notifier().events.contains(&EngineEvent::NothingToMove));
    fixture.assert_file_exists("a.txt");
}

#[test]
fn test_preview_does_not_touch_the_filesystem() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let mut engine = fixture.engine(vec![ext(".txt", "Text")]);
    let first = engine.preview().expect("preview");
    let second = engine.preview().expect("preview");

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(fixture.top_level(), vec!["a.txt".to_string()]);
}

#[test]
fn test_second_run_leaves_sorted_tree_alone() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.jpg", "b");

    let mut engine = fixture.engine(vec![ext(".txt", "Text"), ext(".jpg", "Images")]);
    engine.execute_now().expect("run");
    let again = engine.execute_now().expect("run").expect("ran");

    assert_eq!(again.moved_count(), 0);
    assert_eq!(fixture.top_level(), vec!["Images", "Text"]);
}

#[test]
fn test_content_survives_the_move() {
    let fixture = TestFixture::new();
    fixture.create_text_file("letter.txt", "Dear reader,\nline two\n");

    let mut engine = fixture.engine(vec![ext(".txt", "Letters")]);
    engine.execute_now().expect("run");

    assert_eq!(fixture.read("Letters/letter.txt"), "Dear reader,\nline two\n");
}

#[test]
fn test_absolute_destination_outside_source() {
    let fixture = TestFixture::new();
    let target = TempDir::new().expect("Failed to create temp directory");
    fixture.create_text_file("a.txt", "a");

    let destination = target.path().join("Archive");
    let mut engine = fixture.engine(vec![ext(".txt", &destination.to_string_lossy())]);
    engine.execute_now().expect("run");

    assert!(destination.join("a.txt").is_file());
    fixture.assert_not_exists("a.txt");
}

#[test]
fn test_missing_source_is_reported() {
    let mut engine = Engine::new(
        EngineConfig::new("/non/existent/path", RuleSet::from(vec![ext(".txt", "T")])),
        Recorder::new(),
    );

    assert!(matches!(
        engine.preview(),
        Err(OrganizeError::InvalidSourcePath { .. })
    ));
    assert!(matches!(
        engine.execute_now(),
        Err(OrganizeError::InvalidSourcePath { .. })
    ));
    assert_eq!(engine.state(), TimerState::Idle);
}

// ============================================================================
// Test Suite 2: Conflict policies
// ============================================================================

#[test]
fn test_skip_leaves_conflicting_file_in_place() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.jpg", "new");
    fixture.create_text_file("b.txt", "text");
    fixture.create_text_file("dirA/a.jpg", "old");

    let mut engine = fixture.engine(vec![ext(".jpg", "dirA"), ext(".txt", "dirB")]);
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 1);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.failed[0].name, "a.jpg");
    assert_eq!(result.failed[0].detail, "already exists");
    fixture.assert_file_exists("a.jpg");
    fixture.assert_file_exists("dirB/b.txt");
    assert_eq!(fixture.read("dirA/a.jpg"), "old");
}

#[test]
fn test_overwrite_replaces_existing_file() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "new");
    fixture.create_text_file("Text/a.txt", "old");

    let mut engine = fixture.engine_with(vec![ext(".txt", "Text")], |config| {
        config.policy = ConflictPolicy::Overwrite;
    });
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 1);
    assert_eq!(fixture.read("Text/a.txt"), "new");
    fixture.assert_not_exists("a.txt");
}

#[test]
fn test_rename_picks_unique_names() {
    let fixture = TestFixture::new();
    fixture.create_text_file("f.txt", "third");
    fixture.create_text_file("Text/f.txt", "first");
    fixture.create_text_file("Text/f_1.txt", "second");

    let mut engine = fixture.engine_with(vec![ext(".txt", "Text")], |config| {
        config.policy = ConflictPolicy::Rename;
    });
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 1);
    assert_eq!(fixture.read("Text/f.txt"), "first");
    assert_eq!(fixture.read("Text/f_1.txt"), "second");
    assert_eq!(fixture.read("Text/f_2.txt"), "third");
}

#[test]
fn test_unreachable_destination_fails_only_its_rule() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.txt", "b");
    fixture.create_text_file("c.jpg", "c");
    // A file where the destination directory should be.
    fixture.create_text_file("Blocked", "not a directory");

    let mut engine = fixture.engine(vec![ext(".txt", "Blocked"), ext(".jpg", "Images")]);
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 1);
    assert_eq!(result.failed_count(), 2);
    fixture.assert_file_exists("a.txt");
    fixture.assert_file_exists("b.txt");
    fixture.assert_file_exists("Images/c.jpg");
}

#[test]
fn test_overwrite_never_replaces_a_folder_holding_the_source() {
    let parent = TempDir::new().expect("Failed to create temp directory");
    let source = parent.path().join("Downloads");
    fs::create_dir_all(source.join("Downloads")).expect("mkdir");
    fs::write(source.join("keep.txt"), "keep").expect("write");

    let rules = RuleSet::from(vec![Rule::new(
        "[folders]",
        PatternKind::DirectoryMarker,
        parent.path().to_string_lossy(),
    )]);
    let mut config = EngineConfig::new(&source, rules);
    config.policy = ConflictPolicy::Overwrite;
    let mut engine = Engine::new(config, Recorder::new());
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 0);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(
        result.failed[0].kind,
        rulesort::FailureKind::DestinationContainsSource
    );
    assert!(source.join("keep.txt").is_file());
    assert!(source.join("Downloads").is_dir());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_moved() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fixture = TestFixture::new();
    let raw = OsStr::from_bytes(b"r\xffport.txt");
    fs::write(fixture.path().join(raw), "bytes").expect("write");
    // A real file spelled like the lossy form of the same name.
    fixture.create_text_file("r\u{FFFD}port.txt", "lossy");

    let mut engine = fixture.engine(vec![ext(".txt", "docs")]);
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 2);
    assert_eq!(result.failed_count(), 0);
    let moved = fixture.path().join("docs").join(raw);
    assert_eq!(fs::read_to_string(&moved).expect("read"), "bytes");
    assert_eq!(fixture.read("docs/r\u{FFFD}port.txt"), "lossy");

    engine.undo().expect("undo");
    assert!(fixture.path().join(raw).is_file());
}

// ============================================================================
// Test Suite 3: Undo and the persisted journal
// ============================================================================

#[test]
fn test_undo_restores_the_last_run() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.jpg", "image");
    fixture.create_text_file("b.txt", "text");

    let mut engine = fixture.engine(vec![ext(".jpg", "dirA"), ext(".txt", "dirB")]);
    engine.execute_now().expect("run");
    let report = engine.undo().expect("undo");

    assert_eq!(report.restored, 2);
    assert!(report.is_complete_success());
    fixture.assert_file_exists("a.jpg");
    fixture.assert_file_exists("b.txt");
    assert!(engine.journal().is_empty());
}

#[test]
fn test_undo_after_skip_restores_only_what_moved() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "new");
    fixture.create_text_file("b.txt", "b");
    fixture.create_text_file("Text/a.txt", "old");

    let mut engine = fixture.engine(vec![ext(".txt", "Text")]);
    engine.execute_now().expect("run");
    let report = engine.undo().expect("undo");

    assert_eq!(report.restored, 1);
    assert_eq!(fixture.read("a.txt"), "new");
    assert_eq!(fixture.read("b.txt"), "b");
    assert_eq!(fixture.read("Text/a.txt"), "old");
}

#[test]
fn test_undo_after_rename_uses_renamed_path() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "new");
    fixture.create_text_file("Text/a.txt", "old");

    let mut engine = fixture.engine_with(vec![ext(".txt", "Text")], |config| {
        config.policy = ConflictPolicy::Rename;
    });
    engine.execute_now().expect("run");
    fixture.assert_file_exists("Text/a_1.txt");

    let report = engine.undo().expect("undo");
    assert_eq!(report.restored, 1);
    assert_eq!(fixture.read("a.txt"), "new");
    assert_eq!(fixture.read("Text/a.txt"), "old");
    fixture.assert_not_exists("Text/a_1.txt");
}

#[test]
fn test_undo_reports_entries_moved_away_since() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.txt", "b");

    let mut engine = fixture.engine(vec![ext(".txt", "Text")]);
    engine.execute_now().expect("run");
    fs::remove_file(fixture.path().join("Text/a.txt")).expect("remove");

    let report = engine.undo().expect("undo");
    assert_eq!(report.restored, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].detail, "not found at expected location");
    fixture.assert_file_exists("b.txt");
    assert!(engine.journal().is_empty());
}

#[test]
fn test_undo_pops_batches_in_reverse_order() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let mut engine = fixture.engine(vec![ext(".txt", "Text")]);
    engine.execute_now().expect("run");
    fixture.create_text_file("b.txt", "b");
    engine.execute_now().expect("run");
    assert_eq!(engine.journal().len(), 2);

    engine.undo().expect("undo");
    fixture.assert_file_exists("b.txt");
    fixture.assert_file_exists("Text/a.txt");

    engine.undo().expect("undo");
    fixture.assert_file_exists("a.txt");
    assert!(matches!(engine.undo(), Err(OrganizeError::NoHistory)));
}

#[test]
fn test_journal_survives_a_restart() {
    let fixture = TestFixture::new();
    let history = TempDir::new().expect("Failed to create temp directory");
    let journal_path = history.path().join("history.json");
    fixture.create_text_file("a.txt", "a");

    {
        let mut engine = fixture.engine(vec![ext(".txt", "Text")]);
        engine.execute_now().expect("run");
        engine.journal().save(&journal_path).expect("save");
    }

    let journal = UndoJournal::load(&journal_path).expect("load");
    assert_eq!(journal.len(), 1);
    let mut engine = fixture.engine(Vec::new()).with_journal(journal);
    let report = engine.undo().expect("undo");

    assert_eq!(report.restored, 1);
    fixture.assert_file_exists("a.txt");
}

#[test]
fn test_missing_journal_file_loads_empty() {
    let fixture = TestFixture::new();
    let journal = UndoJournal::load(&fixture.path().join("absent.json")).expect("load");
    assert!(journal.is_empty());
}

#[test]
fn test_journal_file_is_never_planned() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.json", "{}");
    fixture.create_text_file("history.json", "[]");

    let mut engine = fixture.engine_with(vec![ext(".json", "Data")], |config| {
        config.filters = SnapshotFilters::default().exclude_name("history.json");
    });
    engine.execute_now().expect("run");

    fixture.assert_file_exists("Data/a.json");
    fixture.assert_file_exists("history.json");
}

// ============================================================================
// Test Suite 4: Catch-all, dated folders and pattern warnings
// ============================================================================

#[test]
fn test_catch_all_takes_unmatched_entries() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.bin", "b");
    fixture.create_subdir("folder");

    let mut engine = fixture.engine_with(vec![ext(".txt", "Text")], |config| {
        config.plan.catch_all = CatchAll::to("Misc");
    });
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 3);
    fixture.assert_file_exists("Text/a.txt");
    fixture.assert_file_exists("Misc/b.bin");
    fixture.assert_dir_exists("Misc/folder");
    // Destinations created by the run are not swept into the catch-all.
    fixture.assert_dir_exists("Text");
}

#[test]
fn test_catch_all_leaves_earlier_rule_folders_alone() {
    let fixture = TestFixture::new();
    fixture.create_text_file("images/old.jpg", "from an earlier run");
    fixture.create_text_file("notes", "plain");

    let mut engine = fixture.engine_with(vec![ext(".jpg", "images")], |config| {
        config.plan.catch_all = CatchAll::to("misc");
    });
    engine.execute_now().expect("run");

    fixture.assert_file_exists("images/old.jpg");
    fixture.assert_file_exists("misc/notes");
    fixture.assert_not_exists("misc/images");
}

#[test]
fn test_dated_subfolder_expands_tokens() {
    let fixture = TestFixture::new();
    fixture.create_text_file("scan.pdf", "pdf");
    fixture.create_text_file("README", "plain");

    let mut engine = fixture.engine_with(
        vec![
            ext(".pdf", "Archive/{year}/{month}"),
            Rule::new("readme", PatternKind::Keyword, "ByType/{ext}"),
        ],
        |config| config.plan.dated_subfolder = true,
    );
    let plan = engine.preview_on(day()).expect("preview");

    let destinations: Vec<PathBuf> = plan.moves.iter().map(|m| m.destination_dir.clone()).collect();
    assert_eq!(
        destinations,
        vec![
            fixture.path().join("Archive/2024/03"),
            fixture.path().join("ByType/other"),
        ]
    );
}

#[test]
fn test_invalid_regex_warns_once_and_matches_nothing() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a(1).txt", "a");
    fixture.create_text_file("b.txt", "b");

    let mut engine = fixture.engine(vec![
        Rule::new("a(", PatternKind::Regex, "Broken"),
        Rule::new(r"^b\.txt$", PatternKind::Regex, "Regex"),
    ]);
    let plan = engine.preview_on(day()).expect("preview");

    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].index, 0);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.moves[0].entry.name, "b.txt");

    let warnings = engine
        .notifier()
        .events
        .iter()
        .filter(|event| matches!(event, EngineEvent::PatternWarning(_)))
        .count();
    assert_eq!(warnings, 1);
}

#[test]
fn test_survey_counts_extensions() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.TXT", "b");
    fixture.create_text_file("c.jpg", "c");
    fixture.create_text_file("Makefile", "all:");

    let snapshot =
        Snapshot::take(fixture.path(), &SnapshotFilters::default()).expect("snapshot");
    let survey = snapshot.survey();

    assert_eq!(survey.total, 4);
    assert_eq!(survey.counts.get(".txt"), Some(&2));
    assert_eq!(survey.counts.get(".jpg"), Some(&1));

    let suggested = survey.suggested_rules("Sorted", 10);
    assert!(suggested.iter().any(|rule| rule.pattern == ".txt"));
}

// ============================================================================
// Test Suite 5: Timer and stop requests
// ============================================================================

#[test]
fn test_start_waits_for_countdown() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let mut engine = fixture.engine_with(vec![ext(".txt", "Text")], |config| {
        config.delays = DelaySettings {
            start_delay_secs: 3,
            close_delay_secs: 0,
            exit_after_run: false,
        };
    });

    assert!(engine.start().expect("start").is_none());
    assert!(engine.tick().expect("tick").is_none());
    assert!(engine.tick().expect("tick").is_none());
    fixture.assert_file_exists("a.txt");

    let result = engine.tick().expect("tick").expect("ran");
    assert_eq!(result.moved_count(), 1);
    assert_eq!(engine.state(), TimerState::Completed);
}

#[test]
fn test_delays_are_clamped_and_reported() {
    let fixture = TestFixture::new();
    let engine = fixture.engine_with(Vec::new(), |config| {
        config.delays = DelaySettings {
            start_delay_secs: 30,
            close_delay_secs: 2,
            exit_after_run: false,
        };
    });

    let clamps: Vec<String> = engine
        .notifier()
        .events
        .iter()
        .filter(|event| matches!(event, EngineEvent::DelayClamped(_)))
        .map(ToString::to_string)
        .collect();
    assert_eq!(clamps.len(), 2);

    let mut engine = engine;
    engine.start().expect("start");
    assert_eq!(engine.state(), TimerState::CountdownToMove { remaining: 5 });
}

#[test]
fn test_exit_after_run_terminates() {
    let fixture = TestFixture::new();
    let mut engine = fixture.engine_with(Vec::new(), |config| {
        config.delays = DelaySettings {
            start_delay_secs: 0,
            close_delay_secs: 0,
            exit_after_run: true,
        };
    });

    engine.execute_now().expect("run");
    assert_eq!(engine.state(), TimerState::Terminated);
    assert!(engine.execute_now().expect("no-op").is_none());
}

/// Asks the run to stop as soon as the first entry has moved.
struct StopAfterFirstMove {
    stop: StopHandle,
}

impl Notifier for StopAfterFirstMove {
    fn notify(&mut self, event: &EngineEvent) {
        if matches!(event, EngineEvent::Moved { .. }) {
            self.stop.request();
        }
    }
}

#[test]
fn test_stop_between_entries_keeps_completed_moves() {
    let fixture = TestFixture::new();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fixture.create_text_file(name, name);
    }

    let rules = RuleSet::from(vec![ext(".txt", "Text")]);
    let snapshot =
        Snapshot::take(fixture.path(), &SnapshotFilters::default()).expect("snapshot");
    let plan = planner::plan(&snapshot, &rules, &Default::default(), day());
    let stop = StopHandle::new();
    let mut notifier = StopAfterFirstMove { stop: stop.clone() };
    let mut journal = UndoJournal::default();

    let result = executor::execute(
        &plan,
        ConflictPolicy::Skip,
        &mut journal,
        &stop,
        &mut notifier,
    );

    assert!(result.cancelled);
    assert_eq!(result.moved_count(), 1);
    assert_eq!(result.not_attempted, 2);
    assert_eq!(journal.len(), 1);

    let mut recorder = Recorder::new();
    let report = journal.undo(&mut recorder).expect("undo");
    assert_eq!(report.restored, 1);
    assert_eq!(fixture.top_level().len(), 4);
}

#[test]
fn test_stop_request_cancels_countdown() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");

    let mut engine = fixture.engine_with(vec![ext(".txt", "Text")], |config| {
        config.delays = DelaySettings {
            start_delay_secs: 2,
            close_delay_secs: 0,
            exit_after_run: false,
        };
    });
    engine.start().expect("start");
    engine.stop_handle().request();

    engine.tick().expect("tick");
    assert_eq!(engine.state(), TimerState::Idle);
    engine.tick().expect("tick");
    engine.tick().expect("tick");
    fixture.assert_file_exists("a.txt");

    // A new start is not affected by the old request.
    engine.start().expect("start");
    engine.tick().expect("tick");
    engine.tick().expect("tick");
    fixture.assert_file_exists("Text/a.txt");
}

// ============================================================================
// Test Suite 6: Configuration
// ============================================================================

#[test]
fn test_settings_file_drives_a_run() {
    let fixture = TestFixture::new();
    let config_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_dir.path().join("rulesort.toml");
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("photo.jpg", "b");
    fixture.create_text_file("random.bin", "c");

    let toml = format!(
        r#"
source = {source:?}
conflict = "rename"

[[rules]]
pattern = ".txt"
destination = "Text"

[[rules]]
pattern = "jpg"
destination = "Images"

[catch_all]
enabled = true
destination = "Misc"
"#,
        source = fixture.path().to_string_lossy()
    );
    fs::write(&config_path, toml).expect("write config");

    let settings = Settings::load(Some(&config_path)).expect("load");
    let config = settings.validate().expect("validate");
    assert_eq!(config.policy, ConflictPolicy::Rename);
    assert_eq!(config.rules.len(), 2);

    let mut engine = Engine::new(config, Recorder::new());
    let result = engine.execute_now().expect("run").expect("ran");

    assert_eq!(result.moved_count(), 3);
    fixture.assert_file_exists("Text/a.txt");
    fixture.assert_file_exists("Images/photo.jpg");
    fixture.assert_file_exists("Misc/random.bin");
}

#[test]
fn test_hidden_entries_are_skipped_by_default() {
    let fixture = TestFixture::new();
    fixture.create_text_file(".secret.txt", "hidden");
    fixture.create_text_file("visible.txt", "shown");

    let mut engine = fixture.engine(vec![ext(".txt", "Text")]);
    engine.execute_now().expect("run");

    fixture.assert_file_exists(".secret.txt");
    fixture.assert_file_exists("Text/visible.txt");
}
