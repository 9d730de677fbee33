//! Header detection: finds the image and description columns in a table
//! whose header row position is unknown.

use tracing::debug;

use altforge_core::{AltError, AltResult, HeaderInfo, Table};

/// How many leading rows are searched for a header.
pub const HEADER_SCAN_ROWS: usize = 10;

/// Header fragments that mark the image reference column.
pub const IMAGE_ALIASES: &[&str] = &["image_url", "image", "url", "image_link", "imageurl"];

/// Header fragments that mark the description column.
pub const DESCRIPTION_ALIASES: &[&str] =
    &["alt_text", "alt", "description", "alt_description", "alttext"];

/// Label written into a freshly allocated description column.
pub const DESCRIPTION_LABEL: &str = "alt_text";

/// Substring match, so "Product Image URL" and "source_url" both qualify.
fn matches_any(header: &str, aliases: &[&str]) -> bool {
    let lowered = header.to_lowercase();
    aliases.iter().any(|alias| lowered.contains(alias))
}

/// Locate the header row and its semantic columns.
///
/// The first cell (top-to-bottom, left-to-right) in the first
/// [`HEADER_SCAN_ROWS`] rows that matches an image alias fixes both the header
/// row and the image column. The description column is the first other cell in
/// that row matching a description alias; when there is none, a new column is
/// allocated just past the table's populated width.
pub fn locate(table: &Table) -> AltResult<HeaderInfo> {
    let scanned = table.len().min(HEADER_SCAN_ROWS);

    for row_index in 0..scanned {
        let cells = table.row(row_index);
        let Some(image_column_index) = cells
            .iter()
            .position(|cell| matches_any(&cell.as_text(), IMAGE_ALIASES))
        else {
            continue;
        };

        let existing = cells.iter().enumerate().position(|(column, cell)| {
            column != image_column_index && matches_any(&cell.as_text(), DESCRIPTION_ALIASES)
        });

        let info = match existing {
            Some(description_column_index) => HeaderInfo {
                header_row_index: row_index,
                image_column_index,
                description_column_index,
                description_column_is_new: false,
            },
            None => HeaderInfo {
                header_row_index: row_index,
                image_column_index,
                description_column_index: table.populated_width().max(image_column_index + 1),
                description_column_is_new: true,
            },
        };

        debug!(
            header_row = info.header_row_index,
            image_column = info.image_column_index,
            description_column = info.description_column_index,
            new_column = info.description_column_is_new,
            "Located header"
        );
        return Ok(info);
    }

    Err(AltError::NoImageColumnFound { scanned })
}

#[cfg(test)]
mod tests {
    use super::*;
    use altforge_core::CellValue;

    fn table(rows: Vec<Vec<&str>>) -> Table {
        Table::from_strings(rows)
    }

    #[test]
    fn appends_description_column_when_absent() {
        let t = Table::new(vec![
            vec!["id".into(), "image_url".into()],
            vec![CellValue::from(1i64), "https://x/a.jpg".into()],
            vec![CellValue::from(2i64), "".into()],
        ]);
        let info = locate(&t).unwrap();
        assert_eq!(
            info,
            HeaderInfo {
                header_row_index: 0,
                image_column_index: 1,
                description_column_index: 2,
                description_column_is_new: true,
            }
        );
    }

    #[test]
    fn reuses_existing_alt_text_column() {
        let t = table(vec![
            vec!["Alt Text", "SKU", "Image URL"],
            vec!["", "A1", "https://x/a.jpg"],
        ]);
        let info = locate(&t).unwrap();
        assert_eq!(info.image_column_index, 2);
        assert_eq!(info.description_column_index, 0);
        assert!(!info.description_column_is_new);
    }

    #[test]
    fn finds_header_below_title_rows() {
        let t = table(vec![
            vec!["Quarterly catalogue"],
            vec![""],
            vec!["name", "photo link", "notes"],
            vec!["sku", "Image_Link", "description"],
            vec!["a", "https://x/a.jpg", ""],
        ]);
        let info = locate(&t).unwrap();
        assert_eq!(info.header_row_index, 3);
        assert_eq!(info.image_column_index, 1);
        assert_eq!(info.description_column_index, 2);
    }

    #[test]
    fn first_matching_column_wins() {
        let t = table(vec![vec!["thumbnail_url", "image_url", "alt", "description"]]);
        let info = locate(&t).unwrap();
        assert_eq!(info.image_column_index, 0);
        assert_eq!(info.description_column_index, 2);
    }

    #[test]
    fn loose_substring_match_accepts_source_url() {
        let t = table(vec![vec!["source_url", "title"]]);
        assert_eq!(locate(&t).unwrap().image_column_index, 0);
    }

    #[test]
    fn new_column_lands_past_unlabelled_data() {
        let t = table(vec![
            vec!["sku", "image"],
            vec!["a", "https://x/a.jpg", "stray note"],
        ]);
        let info = locate(&t).unwrap();
        assert_eq!(info.description_column_index, 3);
        assert!(info.description_column_is_new);
    }

    #[test]
    fn header_beyond_scan_window_is_not_found() {
        let mut rows: Vec<Vec<&str>> = (0..HEADER_SCAN_ROWS).map(|_| vec!["filler"]).collect();
        rows.push(vec!["image_url"]);
        let err = locate(&table(rows)).unwrap_err();
        assert!(matches!(err, AltError::NoImageColumnFound { scanned: 10 }));
    }

    #[test]
    fn table_without_alias_is_rejected() {
        let t = table(vec![vec!["id", "name"], vec!["1", "widget"]]);
        assert!(matches!(
            locate(&t),
            Err(AltError::NoImageColumnFound { scanned: 2 })
        ));
        assert!(locate(&Table::default()).is_err());
    }
}
