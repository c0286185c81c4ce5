//! Design snapshot files: the layout database as human-readable JSON.
//!
//! Binary mask-layout formats (GDS-II, OASIS) are external collaborators;
//! a snapshot is how a loaded design is persisted and handed to the
//! engine in tests and tooling.

use std::fs;
use std::path::Path;

use verilith_core::LayoutDatabase;

use crate::error::FormatError;

/// Load a design snapshot. A failure here is a load-time failure: fatal,
/// and reported before any rule runs.
pub fn load_design(path: &Path) -> Result<LayoutDatabase, FormatError> {
    let text = fs::read_to_string(path)?;
    let db = LayoutDatabase::from_json(&text)?;
    if db.top_cell.is_none() {
        return Err(FormatError::InvalidDesign(
            "snapshot has no top cell".into(),
        ));
    }
    log::info!(
        "loaded design '{}' with {} cells from {}",
        db.name,
        db.cell_count(),
        path.display()
    );
    Ok(db)
}

pub fn save_design(db: &LayoutDatabase, path: &Path) -> Result<(), FormatError> {
    let json = db.to_json()?;
    fs::write(path, json)?;
    log::info!("wrote design '{}' to {}", db.name, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use verilith_core::{Cell, LayerKey, Shape};

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = std::env::temp_dir().join("verilith_design_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("snapshot.json");

        let mut db = LayoutDatabase::new("demo");
        let mut cell = Cell::new("top");
        cell.add_shape(Shape::rect(LayerKey::new(34, 0), 0, 0, 1000, 1000));
        db.add_cell(cell);

        save_design(&db, &path).unwrap();
        let back = load_design(&path).unwrap();
        assert_eq!(back.name, "demo");
        assert_eq!(back.cell_count(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let path = Path::new("/nonexistent/verilith/design.json");
        assert!(matches!(load_design(path), Err(FormatError::Io(_))));
    }

    #[test]
    fn test_snapshot_without_top_cell_rejected() {
        let dir = std::env::temp_dir().join("verilith_design_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.json");
        let db = LayoutDatabase::new("empty");
        save_design(&db, &path).unwrap();
        assert!(matches!(
            load_design(&path),
            Err(FormatError::InvalidDesign(_))
        ));
        fs::remove_file(&path).unwrap();
    }
}
