//! Violation report files.
//!
//! The result database is written as pretty JSON: one entry per rule id
//! in declaration order with description, severity, skip flag and
//! violation geometry, plus the run summary. Downstream viewers consume
//! this in place of a tool-specific results-database format.

use std::fs;
use std::path::Path;

use verilith_drc::ResultDatabase;

use crate::error::FormatError;

pub fn write_report(db: &ResultDatabase, path: &Path) -> Result<(), FormatError> {
    let json = serde_json::to_string_pretty(db)?;
    fs::write(path, json)?;
    log::info!(
        "DRC report for '{}' written to {} ({} rules, {} violations)",
        db.design,
        path.display(),
        db.rule_count(),
        db.total_violations()
    );
    Ok(())
}

pub fn read_report(path: &Path) -> Result<ResultDatabase, FormatError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verilith_core::Region;
    use verilith_drc::{RuleResult, Severity};

    #[test]
    fn test_report_roundtrip() {
        let dir = std::env::temp_dir().join("verilith_report_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");

        let mut db = ResultDatabase::new("demo", "top");
        db.add(RuleResult {
            rule_id: "M1.1".to_string(),
            description: "M1.1 : Min. metal1 width : 0.23µm".to_string(),
            severity: Severity::Error,
            skipped: false,
            geometry: Region::rect(0, 0, 230, 1000),
        })
        .unwrap();

        write_report(&db, &path).unwrap();
        let back = read_report(&path).unwrap();
        assert_eq!(back.design, "demo");
        assert_eq!(back.rule_count(), 1);
        let bucket = back.get("M1.1").unwrap();
        assert_eq!(bucket.violation_count(), 1);
        assert_eq!(bucket.description, db.get("M1.1").unwrap().description);
        fs::remove_file(&path).unwrap();
    }
}
