//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! The working composition lives in the draft file between invocations.
//! Editing commands load it, validate it, apply one reorder operation and
//! write it back only when the operation succeeded.

use crate::config::Settings;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tenderkit_core::{
    Catalog, CatalogProvider, CanonicalTender, CategoryId, Composition, ExportFormat, RedbStore,
    ReorderEngine, Renderer, SectorId, Session, SnapshotId, SubIndex, TenderDocument, TenderError,
    Toggle, import_canonical, primitives::MAX_DECODE_SIZE, verify_consistency,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum draft file size (16 MB).
const MAX_DRAFT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum canonical JSON file size accepted by `verify`.
const MAX_IMPORT_FILE_SIZE: u64 = MAX_DECODE_SIZE as u64;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TenderError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        TenderError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    if metadata.len() > max_size {
        return Err(TenderError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an output path: its directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, TenderError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TenderError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(TenderError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| TenderError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// CATALOG COMMANDS
// =============================================================================

/// List catalog sectors.
pub fn cmd_sectors(settings: &Settings, json_mode: bool) -> Result<(), TenderError> {
    let catalog = settings.load_catalog()?;

    if json_mode {
        let sectors: Vec<serde_json::Value> = catalog
            .sectors()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "priority": s.priority,
                    "ownCategories": s.categories.len(),
                })
            })
            .collect();
        return print_json(&sectors);
    }

    println!("Sectors");
    println!("=======");
    for sector in catalog.sectors() {
        println!("  {:<16} {}", sector.id, sector.name);
    }
    Ok(())
}

/// List the categories a sector offers, marking the draft's selection.
pub fn cmd_catalog(
    settings: &Settings,
    json_mode: bool,
    sector: Option<&str>,
) -> Result<(), TenderError> {
    let catalog = settings.load_catalog()?;
    let draft = if settings.draft.is_file() {
        Some(load_draft(&settings.draft)?)
    } else {
        None
    };

    let sector = match (sector, &draft) {
        (Some(id), _) => SectorId::new(id),
        (None, Some(composition)) => composition.sector().clone(),
        (None, None) => catalog.default_sector().clone(),
    };
    // Selection marks only make sense against the draft's own sector.
    let selection = draft.filter(|c| *c.sector() == sector);
    let is_selected = |category: &CategoryId, index: usize| {
        selection
            .as_ref()
            .is_some_and(|c| c.is_selected(category, SubIndex(index)))
    };

    let categories = catalog.categories_for(&sector);

    if json_mode {
        let listing: Vec<serde_json::Value> = categories
            .iter()
            .map(|category| {
                let subcriteria: Vec<serde_json::Value> = category
                    .subcriteria
                    .iter()
                    .enumerate()
                    .map(|(index, sub)| {
                        serde_json::json!({
                            "index": index,
                            "label": sub.label,
                            "description": sub.description,
                            "selected": is_selected(&category.id, index),
                        })
                    })
                    .collect();
                serde_json::json!({
                    "id": category.id,
                    "title": category.title,
                    "subcriteria": subcriteria,
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "sector": sector,
            "name": catalog.sector_name(&sector),
            "categories": listing,
        }));
    }

    println!("Catalog: {} ({})", catalog.sector_name(&sector), sector);
    for category in categories {
        println!();
        println!("{}  {}", category.id, category.title);
        for (index, sub) in category.subcriteria.iter().enumerate() {
            let mark = if is_selected(&category.id, index) { '*' } else { ' ' };
            println!("  {} [{}] {}", mark, index, sub.label);
        }
    }
    Ok(())
}

// =============================================================================
// EDITING COMMANDS
// =============================================================================

/// Start a new, empty draft.
pub fn cmd_new(
    settings: &Settings,
    sector: &str,
    title: Option<&str>,
    force: bool,
) -> Result<(), TenderError> {
    if settings.draft.exists() && !force {
        return Err(TenderError::InvalidOperation(format!(
            "Draft '{}' already exists. Use --force to overwrite.",
            settings.draft.display()
        )));
    }

    let catalog = settings.load_catalog()?;
    let sector = SectorId::new(sector);
    if !catalog.has_sector(&sector) {
        tracing::warn!(
            sector = %sector,
            "Unknown sector, only global categories will resolve"
        );
    }

    let mut composition = Composition::new(sector);
    if let Some(title) = title {
        composition.set_title(title.trim());
    }
    write_draft(&settings.draft, &composition)?;

    println!(
        "Started draft for {} at {:?}",
        catalog.sector_name(composition.sector()),
        settings.draft
    );
    Ok(())
}

/// Select or deselect sub-criteria of one category.
///
/// Selecting a reference the catalog cannot resolve is refused; an
/// already selected reference can always be deselected.
pub fn cmd_toggle(
    settings: &Settings,
    json_mode: bool,
    category: &str,
    indices: &[usize],
) -> Result<(), TenderError> {
    let catalog = settings.load_catalog()?;
    let category = CategoryId::new(category);

    let (composition, outcomes) = edit_draft(settings, |composition| {
        let sector = composition.sector().clone();
        let mut outcomes = Vec::with_capacity(indices.len());
        for &index in indices {
            let index = SubIndex(index);
            if !composition.is_selected(&category, index) {
                catalog.resolve(&sector, &category, index)?;
            }
            let outcome = ReorderEngine::toggle_subcriterion(composition, &category, index)?;
            outcomes.push((index, outcome));
        }
        Ok(outcomes)
    })?;

    if json_mode {
        let results: Vec<serde_json::Value> = outcomes
            .iter()
            .map(|(index, outcome)| {
                serde_json::json!({
                    "category": category,
                    "index": index,
                    "result": toggle_name(*outcome),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "results": results,
            "categoryOrder": composition.category_order(),
        }));
    }

    for (index, outcome) in &outcomes {
        match outcome {
            Toggle::Selected => println!("Selected {}[{}]", category, index),
            Toggle::Deselected => println!("Deselected {}[{}]", category, index),
            Toggle::CategoryRemoved => {
                println!("Deselected {}[{}], category removed", category, index)
            }
        }
    }
    print_order(&composition);
    Ok(())
}

/// Move a category to a new position.
pub fn cmd_move_category(
    settings: &Settings,
    category: &str,
    position: usize,
) -> Result<(), TenderError> {
    let category = CategoryId::new(category);
    let (composition, ()) = edit_draft(settings, |composition| {
        ReorderEngine::move_category(composition, &category, position)
    })?;

    println!("Moved category {}", category);
    print_order(&composition);
    Ok(())
}

/// Move a sub-criterion within its category.
pub fn cmd_move_sub(
    settings: &Settings,
    category: &str,
    index: usize,
    position: usize,
) -> Result<(), TenderError> {
    let category = CategoryId::new(category);
    let (composition, ()) = edit_draft(settings, |composition| {
        ReorderEngine::move_subcriterion(composition, &category, SubIndex(index), position)
    })?;

    let refs: Vec<String> = composition
        .subcriteria_order(&category)
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("{}: [{}]", category, refs.join(", "));
    Ok(())
}

/// Remove a category and all its sub-criteria.
pub fn cmd_remove(settings: &Settings, category: &str) -> Result<(), TenderError> {
    let category = CategoryId::new(category);
    let (composition, ()) = edit_draft(settings, |composition| {
        ReorderEngine::remove_category(composition, &category)
    })?;

    println!("Removed category {}", category);
    print_order(&composition);
    Ok(())
}

/// Remove every category.
pub fn cmd_clear(settings: &Settings) -> Result<(), TenderError> {
    edit_draft(settings, |composition| {
        ReorderEngine::clear_all(composition);
        Ok(())
    })?;

    println!("Cleared all categories");
    Ok(())
}

/// Order categories by the sector's priority template.
pub fn cmd_arrange(settings: &Settings) -> Result<(), TenderError> {
    let catalog = settings.load_catalog()?;
    let (composition, ()) = edit_draft(settings, |composition| {
        let priority = catalog
            .sector(composition.sector())
            .map(|s| s.priority.clone())
            .unwrap_or_default();
        if priority.is_empty() {
            tracing::info!(sector = %composition.sector(), "Sector has no priority template");
        }
        ReorderEngine::arrange_by_priority(composition, &priority);
        Ok(())
    })?;

    print_order(&composition);
    Ok(())
}

// =============================================================================
// PREVIEW / EXPORT COMMANDS
// =============================================================================

/// Preview the draft.
pub fn cmd_show(settings: &Settings, json_mode: bool) -> Result<(), TenderError> {
    let catalog = settings.load_catalog()?;
    let document = draft_document(settings, &catalog)?;

    if json_mode {
        return print_json(&CanonicalTender::from_document(&document));
    }

    print!("{}", document.preview());
    Ok(())
}

/// Export the draft.
pub fn cmd_export(
    settings: &Settings,
    json_mode: bool,
    format: &str,
    output: Option<&Path>,
) -> Result<(), TenderError> {
    let format: ExportFormat = format.parse()?;
    let catalog = settings.load_catalog()?;
    let composition = load_draft(&settings.draft)?;

    let artifact = Renderer::new(&catalog).render(&composition, format)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(artifact.file_name()));
    let validated_output = validate_output_path(&path)?;

    std::fs::write(&validated_output, &artifact.bytes)
        .map_err(|e| TenderError::IoError(format!("Write file: {}", e)))?;
    tracing::info!(format = %format, path = %validated_output.display(), "Exported draft");

    let digest = artifact.digest();
    if json_mode {
        return print_json(&serde_json::json!({
            "format": format,
            "path": validated_output.to_string_lossy(),
            "mediaType": artifact.media_type(),
            "bytes": artifact.bytes.len(),
            "blake3": digest,
            "substituted": artifact.substituted.iter().collect::<String>(),
        }));
    }

    println!("BLAKE3: {}", digest);
    if !artifact.is_lossless() {
        println!(
            "Warning: {} cannot carry {:?}; written as '?'",
            format,
            artifact.substituted.iter().collect::<String>()
        );
    }
    println!(
        "Exported {} bytes to {:?}",
        artifact.bytes.len(),
        validated_output
    );
    Ok(())
}

/// Check that every export format carries the same entries.
///
/// Fails when any format disagrees.
pub fn cmd_verify(
    settings: &Settings,
    json_mode: bool,
    input: Option<&Path>,
) -> Result<(), TenderError> {
    let document = match input {
        Some(path) => {
            validate_file_size(path, MAX_IMPORT_FILE_SIZE)?;
            let data = std::fs::read(path)
                .map_err(|e| TenderError::IoError(format!("Read file: {}", e)))?;
            import_canonical(&data)?
        }
        None => {
            let catalog = settings.load_catalog()?;
            draft_document(settings, &catalog)?
        }
    };

    let report = verify_consistency(&document);

    if json_mode {
        print_json(&serde_json::json!({
            "consistent": report.is_consistent(),
            "report": report,
        }))?;
    } else {
        println!("Expected entries: {}", report.expected_entries);
        for check in &report.checks {
            let status = if check.consistent { "ok" } else { "MISMATCH" };
            println!(
                "  {:<12} {:<8} {} entries",
                check.format.to_string(),
                status,
                check.decoded_entries
            );
            if let Some(detail) = &check.detail {
                println!("    {}", detail);
            }
        }
    }

    if !report.is_consistent() {
        return Err(TenderError::SerializationError(
            "Export formats disagree".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// SNAPSHOT COMMANDS
// =============================================================================

/// Save the draft as a snapshot.
pub fn cmd_save(
    settings: &Settings,
    json_mode: bool,
    title: Option<&str>,
    is_draft: bool,
) -> Result<(), TenderError> {
    let composition = load_draft(&settings.draft)?;
    let title = title.unwrap_or(composition.title()).to_string();

    let mut session = Session::with_redb(settings.owner.clone(), composition, &settings.database)?;
    let id = session.save(&title, is_draft)?;
    write_draft(&settings.draft, session.composition())?;

    if json_mode {
        return print_json(&serde_json::json!({
            "id": id,
            "title": session.composition().title(),
            "isDraft": is_draft,
        }));
    }

    println!(
        "Saved snapshot {} \"{}\"{}",
        id,
        session.composition().title(),
        if is_draft { " (draft)" } else { "" }
    );
    Ok(())
}

/// List saved snapshots, newest first.
pub fn cmd_history(settings: &Settings, json_mode: bool) -> Result<(), TenderError> {
    let session = snapshot_session(settings)?;
    let history = session.history()?;

    if json_mode {
        return print_json(&history);
    }

    if history.is_empty() {
        println!("No saved snapshots");
        return Ok(());
    }

    println!(
        "{:>6}  {:<10}  {:<5}  {:<16}  {:>10}  Title",
        "ID", "Saved", "Draft", "Sector", "Categories"
    );
    for summary in &history {
        let saved = summary
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:<10}  {:<5}  {:<16}  {:>10}  {}",
            summary.id,
            saved,
            if summary.is_draft { "yes" } else { "no" },
            summary.sector.as_str(),
            summary.category_count,
            summary.title
        );
    }
    Ok(())
}

/// Replace the draft with a saved snapshot.
pub fn cmd_open(settings: &Settings, id: u64) -> Result<(), TenderError> {
    let mut session = snapshot_session(settings)?;
    session.open(SnapshotId(id))?;
    write_draft(&settings.draft, session.composition())?;

    println!(
        "Opened snapshot {} \"{}\" into {:?}",
        id,
        session.composition().title(),
        settings.draft
    );
    Ok(())
}

/// Delete a saved snapshot.
pub fn cmd_delete(settings: &Settings, id: u64) -> Result<(), TenderError> {
    let mut session = snapshot_session(settings)?;
    session.delete(SnapshotId(id))?;

    println!("Deleted snapshot {}", id);
    Ok(())
}

/// Show history statistics.
pub fn cmd_stats(settings: &Settings, json_mode: bool) -> Result<(), TenderError> {
    let session = snapshot_session(settings)?;
    let stats = session.stats(Utc::now())?;

    if json_mode {
        return print_json(&stats);
    }

    let catalog = settings.load_catalog()?;
    println!("Snapshot Statistics");
    println!("===================");
    println!("Total:        {}", stats.total);
    println!("Drafts:       {}", stats.drafts);
    println!("Finalized:    {}", stats.finalized);
    println!("Last 7 days:  {}", stats.last_7_days);
    println!("This month:   {}", stats.this_month);
    if let Some((category, count)) = stats.favourite_category() {
        println!("Most used:    {} ({} snapshots)", category, count);
    }
    if !stats.top_sectors.is_empty() {
        println!();
        println!("Top sectors:");
        for usage in &stats.top_sectors {
            println!(
                "  {:<32} {}",
                catalog.sector_name(&usage.sector),
                usage.count
            );
        }
    }
    Ok(())
}

/// Initialize a new empty snapshot database.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), TenderError> {
    let db_path = &settings.database;
    if db_path.exists() {
        if !force {
            return Err(TenderError::InvalidOperation(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| TenderError::IoError(format!("Remove database: {}", e)))?;
    }

    let _store = RedbStore::open(db_path)?;
    println!("Initialized new snapshot database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load and validate the draft composition.
pub fn load_draft(path: &Path) -> Result<Composition, TenderError> {
    if !path.is_file() {
        return Err(TenderError::IoError(format!(
            "No draft at '{}'. Start one with `tenderkit new --sector <id>`",
            path.display()
        )));
    }
    validate_file_size(path, MAX_DRAFT_FILE_SIZE)?;

    let data =
        std::fs::read(path).map_err(|e| TenderError::IoError(format!("Read draft: {}", e)))?;
    let composition: Composition = serde_json::from_slice(&data)
        .map_err(|e| TenderError::SerializationError(format!("Parse draft: {}", e)))?;
    composition.validate()?;
    Ok(composition)
}

/// Write the draft through a temporary sibling so a crash never leaves a
/// half-written file.
pub fn write_draft(path: &Path, composition: &Composition) -> Result<(), TenderError> {
    let data = serde_json::to_vec_pretty(composition)
        .map_err(|e| TenderError::SerializationError(e.to_string()))?;

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    std::fs::write(&temp, &data)
        .map_err(|e| TenderError::IoError(format!("Write draft: {}", e)))?;
    std::fs::rename(&temp, path)
        .map_err(|e| TenderError::IoError(format!("Replace draft: {}", e)))?;
    tracing::debug!(path = %path.display(), categories = composition.category_count(), "Wrote draft");
    Ok(())
}

/// Load the draft, apply `edit`, and write it back only on success.
fn edit_draft<T>(
    settings: &Settings,
    edit: impl FnOnce(&mut Composition) -> Result<T, TenderError>,
) -> Result<(Composition, T), TenderError> {
    let mut composition = load_draft(&settings.draft)?;
    let outcome = edit(&mut composition)?;
    write_draft(&settings.draft, &composition)?;
    Ok((composition, outcome))
}

/// Resolve the draft against the catalog as of now.
fn draft_document(settings: &Settings, catalog: &Catalog) -> Result<TenderDocument, TenderError> {
    let composition = load_draft(&settings.draft)?;
    Ok(Renderer::new(catalog).document(&composition, Utc::now()))
}

/// A session for snapshot commands that do not edit the draft.
fn snapshot_session(settings: &Settings) -> Result<Session, TenderError> {
    let placeholder = Composition::new(SectorId::new(tenderkit_core::primitives::DEFAULT_SECTOR));
    Session::with_redb(settings.owner.clone(), placeholder, &settings.database)
}

fn print_order(composition: &Composition) {
    let order: Vec<&str> = composition
        .category_order()
        .iter()
        .map(CategoryId::as_str)
        .collect();
    if order.is_empty() {
        println!("Order: (empty)");
    } else {
        println!("Order: {}", order.join(" > "));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), TenderError> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| TenderError::SerializationError(e.to_string()))?;
    println!("{}", output);
    Ok(())
}

fn toggle_name(outcome: Toggle) -> &'static str {
    match outcome {
        Toggle::Selected => "selected",
        Toggle::Deselected => "deselected",
        Toggle::CategoryRemoved => "categoryRemoved",
    }
}

// =============================================================================
// TESTS
// =============================================================================
