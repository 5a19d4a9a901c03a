//! End-to-end tests driving the CLI against temporary draft and database files.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};
use tenderkit::cli::{Cli, execute, load_draft};
use tenderkit::config::Settings;
use tenderkit_core::{
    Catalog, CategoryId, Composition, ExportFormat, OwnerId, Renderer, Session, SubIndex,
    TenderError, decode_entries, import_canonical,
};

// =============================================================================
// HARNESS
// =============================================================================

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    /// A temp dir with a config file pointing draft and database inside it.
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let config = dir.path().join("tenderkit.toml");
        let body = format!(
            "database = {:?}\ndraft = {:?}\nowner = \"alice\"\n",
            dir.path().join("snapshots.db"),
            dir.path().join("draft.json"),
        );
        std::fs::write(&config, body).unwrap();
        Self { dir, config }
    }

    fn run(&self, args: &[&str]) -> Result<(), TenderError> {
        let mut argv = vec![
            "tenderkit".to_string(),
            "--quiet".to_string(),
            "--config".to_string(),
            self.config.to_string_lossy().into_owned(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        execute(Cli::try_parse_from(argv).unwrap())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn draft(&self) -> Composition {
        load_draft(&self.path("draft.json")).unwrap()
    }

    fn draft_bytes(&self) -> Vec<u8> {
        std::fs::read(self.path("draft.json")).unwrap()
    }
}

fn order(composition: &Composition) -> Vec<&str> {
    composition
        .category_order()
        .iter()
        .map(CategoryId::as_str)
        .collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// EDITING
// =============================================================================

#[test]
fn compose_and_reorder() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it", "--title", "Data centre"]).unwrap();
    ws.run(&["toggle", "C3", "2"]).unwrap();
    ws.run(&["toggle", "C1", "0", "3"]).unwrap();
    ws.run(&["toggle", "C9", "1"]).unwrap();
    ws.run(&["move-category", "C1", "0"]).unwrap();
    ws.run(&["move-sub", "C1", "3", "0"]).unwrap();

    let draft = ws.draft();
    assert_eq!(draft.title(), "Data centre");
    assert_eq!(order(&draft), vec!["C1", "C3", "C9"]);
    assert_eq!(
        draft.subcriteria_order(&CategoryId::new("C1")),
        &[SubIndex(3), SubIndex(0)]
    );

    ws.run(&["toggle", "C9", "1"]).unwrap();
    ws.run(&["remove", "C3"]).unwrap();
    assert_eq!(order(&ws.draft()), vec!["C1"]);

    ws.run(&["clear"]).unwrap();
    assert!(ws.draft().is_empty());
}

#[test]
fn new_refuses_to_overwrite_without_force() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C1", "0"]).unwrap();

    let err = ws.run(&["new", "--sector", "retail"]).unwrap_err();
    assert!(matches!(err, TenderError::InvalidOperation(_)));
    assert_eq!(ws.draft().sector().as_str(), "it");

    ws.run(&["new", "--sector", "retail", "--force"]).unwrap();
    assert_eq!(ws.draft().sector().as_str(), "retail");
    assert!(ws.draft().is_empty());
}

#[test]
fn unknown_reference_is_refused_and_draft_kept() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C1", "0"]).unwrap();
    let before = ws.draft_bytes();

    let err = ws.run(&["toggle", "C1", "99"]).unwrap_err();
    assert!(matches!(err, TenderError::CatalogMismatch(_, _, Some(SubIndex(99)))));
    let err = ws.run(&["toggle", "NOPE", "0"]).unwrap_err();
    assert!(matches!(err, TenderError::CatalogMismatch(_, _, None)));
    // The valid index before the bad one is not applied either.
    ws.run(&["toggle", "C2", "1", "99"]).unwrap_err();

    assert_eq!(ws.draft_bytes(), before);
}

#[test]
fn not_found_edits_leave_draft_untouched() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C1", "0"]).unwrap();
    let before = ws.draft_bytes();

    assert!(ws.run(&["move-category", "C5", "0"]).unwrap_err().is_not_found());
    assert!(ws.run(&["move-sub", "C1", "4", "0"]).unwrap_err().is_not_found());
    assert!(ws.run(&["remove", "C5"]).unwrap_err().is_not_found());

    assert_eq!(ws.draft_bytes(), before);
}

#[test]
fn inconsistent_draft_is_refused() {
    let ws = Workspace::new();
    std::fs::write(
        ws.path("draft.json"),
        r#"{ "sector": "it", "selection": { "C1": [0], "C2": [1] }, "categoryOrder": ["C1"] }"#,
    )
    .unwrap();

    let err = ws.run(&["move-category", "C1", "0"]).unwrap_err();
    assert!(matches!(err, TenderError::InvalidOperation(_)));
    let err = ws.run(&["export", "-t", "pdf", "-o", &path_arg(&ws.path("x.pdf"))]).unwrap_err();
    assert!(matches!(err, TenderError::InvalidOperation(_)));
}

#[test]
fn arrange_applies_sector_template() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    for category in ["C9", "C5", "C1", "C3"] {
        ws.run(&["toggle", category, "0"]).unwrap();
    }
    ws.run(&["arrange"]).unwrap();

    let catalog = Catalog::builtin().unwrap();
    let priority = &catalog.sectors().find(|s| s.id.as_str() == "it").unwrap().priority;
    let arranged = ws.draft();
    let ranks: Vec<usize> = arranged
        .category_order()
        .iter()
        .map(|id| priority.iter().position(|p| p == id).unwrap_or(priority.len()))
        .collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);
    assert_eq!(arranged.category_count(), 4);
}

// =============================================================================
// EXPORT
// =============================================================================

#[test]
fn exports_match_the_draft_in_every_format() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C3", "2"]).unwrap();
    ws.run(&["toggle", "C1", "0", "3"]).unwrap();

    let catalog = Catalog::builtin().unwrap();
    let expected = Renderer::new(&catalog)
        .document(&ws.draft(), chrono::Utc::now())
        .entries();
    assert_eq!(expected.len(), 3);

    for format in ExportFormat::ALL {
        let output = ws.path(&format.file_name());
        ws.run(&["export", "-t", &format.to_string(), "-o", &path_arg(&output)])
            .unwrap();
        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(decode_entries(format, &bytes).unwrap(), expected, "format {}", format);
    }

    let canonical = std::fs::read(ws.path("tender_criteria.json")).unwrap();
    assert_eq!(import_canonical(&canonical).unwrap().entries(), expected);
    ws.run(&["verify"]).unwrap();
    ws.run(&["verify", "--input", &path_arg(&ws.path("tender_criteria.json"))])
        .unwrap();
}

#[test]
fn unknown_export_format_is_rejected() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    let err = ws.run(&["export", "-t", "docx"]).unwrap_err();
    assert!(matches!(err, TenderError::InvalidOperation(_)));
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

#[test]
fn save_open_and_delete() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C2", "1"]).unwrap();
    ws.run(&["toggle", "C1", "0"]).unwrap();
    ws.run(&["save", "--title", "Network refresh", "--draft"]).unwrap();

    let saved = ws.draft();
    assert_eq!(saved.title(), "Network refresh");
    assert!(saved.is_draft());

    ws.run(&["clear"]).unwrap();
    ws.run(&["history"]).unwrap();
    ws.run(&["open", "1"]).unwrap();
    assert_eq!(order(&ws.draft()), vec!["C2", "C1"]);

    ws.run(&["delete", "1"]).unwrap();
    assert!(ws.run(&["open", "1"]).unwrap_err().is_not_found());
}

#[test]
fn owner_flag_overrides_config() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C1", "0"]).unwrap();
    ws.run(&["save"]).unwrap();

    // Saved as "alice" from the config file; "bob" sees nothing.
    let err = ws.run(&["--owner", "bob", "delete", "1"]).unwrap_err();
    assert!(matches!(err, TenderError::SnapshotNotFound(_)));

    let settings = Settings {
        owner: OwnerId::new("alice"),
        database: ws.path("snapshots.db"),
        draft: ws.path("draft.json"),
        catalog: None,
    };
    let session =
        Session::with_redb(settings.owner.clone(), ws.draft(), &settings.database).unwrap();
    let history = session.history().unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].title.starts_with("Tender "));
}

#[test]
fn stats_over_saved_snapshots() {
    let ws = Workspace::new();
    ws.run(&["new", "--sector", "it"]).unwrap();
    ws.run(&["toggle", "C1", "0"]).unwrap();
    ws.run(&["save", "--draft"]).unwrap();
    ws.run(&["save"]).unwrap();
    ws.run(&["stats"]).unwrap();
    ws.run(&["--json-mode", "stats"]).unwrap();
}

#[test]
fn init_refuses_existing_database_without_force() {
    let ws = Workspace::new();
    ws.run(&["init"]).unwrap();
    let err = ws.run(&["init"]).unwrap_err();
    assert!(matches!(err, TenderError::InvalidOperation(_)));
    ws.run(&["init", "--force"]).unwrap();
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = path_arg(&dir.path().join("absent.toml"));
    let cli = Cli::try_parse_from(["tenderkit", "--config", missing.as_str(), "sectors"]).unwrap();
    assert!(matches!(execute(cli), Err(TenderError::ConfigError(_))));
}
