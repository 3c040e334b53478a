// Downloadable import template and built-in sample data.

use std::path::Path;

use anyhow::{Context, Result};

pub const TEMPLATE_FILE_NAME: &str = "player_import_template.csv";

pub const TEMPLATE_HEADER: &str = "Name,AgeGroup,Sport,Gender,Season,ParentFirstName,ParentSurname,ParentEmail,ParentPhone,DateOfBirth,Address,Town,Postcode";

pub const TEMPLATE_CSV: &str = "Name,AgeGroup,Sport,Gender,Season,ParentFirstName,ParentSurname,ParentEmail,ParentPhone,DateOfBirth,Address,Town,Postcode
John Smith,U12,GAA Football,Male,2025,Mary,Smith,mary.smith@email.com,0871234567,2013-05-15,123 Main St,Dublin,D01 X123
Emma Johnson,U10,GAA Football,Female,2025,Sarah,Johnson,sarah.johnson@email.com,0869876543,2015-08-22,456 Park Ave,Cork,T12 Y456
";

pub const SAMPLE_CSV: &str = "Name,AgeGroup,Sport,Gender,Season,ParentFirstName,ParentSurname,ParentEmail,ParentPhone,DateOfBirth
John Smith,U12,GAA Football,Male,2025,Mary,Smith,mary.smith@email.com,0871234567,2013-05-15
Emma Johnson,U10,GAA Football,Female,2025,Sarah,Johnson,sarah.johnson@email.com,0869876543,2015-08-22
Liam Murphy,U14,GAA Football,Male,2025,Tom,Murphy,tom.murphy@email.com,0851112223,2011-03-10
Sophie Brown,U12,Hurling,Female,2025,Anne,Brown,anne.brown@email.com,0857654321,2013-11-05";

/// Write the template into `dir` (or to `path` directly when it names a
/// file). Returns the written path.
pub fn write_template(path: &Path) -> Result<std::path::PathBuf> {
    let target = if path.is_dir() {
        path.join(TEMPLATE_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    std::fs::write(&target, TEMPLATE_CSV)
        .with_context(|| format!("failed to write template to {}", target.display()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_import::{parse_players, ParseOptions};

    #[test]
    fn template_starts_with_header() {
        assert!(TEMPLATE_CSV.starts_with(TEMPLATE_HEADER));
    }

    #[test]
    fn template_parses_two_rows() {
        let out = parse_players(TEMPLATE_CSV, &ParseOptions::default()).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[1].town.as_deref(), Some("Cork"));
        assert_eq!(out.rows[0].parent_surname.as_deref(), Some("Smith"));
    }

    #[test]
    fn sample_parses_four_rows() {
        let out = parse_players(SAMPLE_CSV, &ParseOptions::default()).unwrap();
        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn write_template_into_directory() {
        let dir = std::env::temp_dir().join(format!("playerport-template-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let written = write_template(&dir).unwrap();
        assert_eq!(written, dir.join(TEMPLATE_FILE_NAME));
        assert_eq!(std::fs::read_to_string(&written).unwrap(), TEMPLATE_CSV);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
