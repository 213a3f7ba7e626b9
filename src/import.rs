use crate::models::ProductDraft;
use std::collections::HashMap;
use thiserror::Error;

/// Column names a product CSV must carry, in export order.
pub const REQUIRED_COLUMNS: [&str; 14] = [
    "title",
    "category",
    "price",
    "currency",
    "unit",
    "stock",
    "minorderqty",
    "keywords",
    "imageurls",
    "shortdescription",
    "description",
    "features",
    "packaging",
    "leadtime",
];

// Quoted newlines are unsupported, so multi-line cells travel pipe-joined.
// Only list and free-text columns decode `|`; other cells fold line breaks
// into spaces on export.
const CELL_LIST_SEPARATOR: &str = "|";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("csv header is missing required columns: {}", missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

/// Splits one CSV line into raw fields.
///
/// Double-quoted fields may contain commas and `""` decodes to a literal
/// quote. Unquoted fields are kept verbatim and a trailing field is always
/// emitted.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

pub fn normalize_header(cell: &str) -> String {
    cell.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses a whole CSV file into drafts. The header is checked before any
/// row is read, so a schema failure yields no drafts at all.
pub fn parse_drafts(content: &str) -> Result<Vec<ProductDraft>, SchemaError> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Err(SchemaError {
            missing: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        });
    };

    let mut positions: HashMap<String, usize> = HashMap::new();
    for (idx, cell) in parse_line(header_line).iter().enumerate() {
        positions.entry(normalize_header(cell)).or_insert(idx);
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !positions.contains_key(**column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError { missing });
    }

    let drafts = lines
        .map(|line| {
            let cells = parse_line(line);
            let cell = |column: &str| -> String {
                positions
                    .get(column)
                    .and_then(|idx| cells.get(*idx))
                    .cloned()
                    .unwrap_or_default()
            };
            ProductDraft {
                title: cell("title"),
                category: cell("category"),
                price: cell("price"),
                currency: cell("currency"),
                unit: cell("unit"),
                stock: cell("stock"),
                min_order_qty: cell("minorderqty"),
                keywords: cell("keywords"),
                image_urls: cell_to_lines(&cell("imageurls")),
                short_description: cell_to_lines(&cell("shortdescription")),
                description: cell_to_lines(&cell("description")),
                features: cell_to_lines(&cell("features")),
                packaging: cell("packaging"),
                lead_time: cell("leadtime"),
            }
        })
        .collect();

    Ok(drafts)
}

/// Writes drafts in the documented column order, one row per draft.
pub fn export_drafts(drafts: &[ProductDraft]) -> String {
    let mut out = REQUIRED_COLUMNS.join(",");
    out.push('\n');
    for draft in drafts {
        let cells: [String; 14] = [
            fold_line_breaks(&draft.title),
            fold_line_breaks(&draft.category),
            fold_line_breaks(&draft.price),
            fold_line_breaks(&draft.currency),
            fold_line_breaks(&draft.unit),
            fold_line_breaks(&draft.stock),
            fold_line_breaks(&draft.min_order_qty),
            fold_line_breaks(&draft.keywords),
            lines_to_cell(&draft.image_urls),
            text_to_cell(&draft.short_description),
            text_to_cell(&draft.description),
            lines_to_cell(&draft.features),
            fold_line_breaks(&draft.packaging),
            fold_line_breaks(&draft.lead_time),
        ];
        let row = cells
            .iter()
            .map(|value| quote_field(value))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn quote_field(value: &str) -> String {
    if value.contains([',', '"']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn cell_to_lines(cell: &str) -> String {
    cell.split(CELL_LIST_SEPARATOR)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Free text keeps its exact line structure, blank lines included.
fn text_to_cell(value: &str) -> String {
    unify_line_breaks(value).replace('\n', CELL_LIST_SEPARATOR)
}

fn fold_line_breaks(value: &str) -> String {
    unify_line_breaks(value).replace('\n', " ")
}

fn unify_line_breaks(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

fn lines_to_cell(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(CELL_LIST_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    const HEADER: &str = "title,category,price,currency,unit,stock,minorderqty,keywords,imageurls,shortdescription,description,features,packaging,leadtime";

    #[test]
    fn parse_line_keeps_commas_inside_quotes() {
        assert_eq!(
            parse_line(r#"Wire,"16 AWG, copper",10"#),
            vec!["Wire", "16 AWG, copper", "10"]
        );
    }

    #[test]
    fn parse_line_decodes_doubled_quotes() {
        assert_eq!(
            parse_line(r#""He said ""hi""",2"#),
            vec![r#"He said "hi""#, "2"]
        );
    }

    #[test]
    fn parse_line_emits_trailing_and_empty_fields() {
        assert_eq!(parse_line("a,,b"), vec!["a", "", "b"]);
        assert_eq!(parse_line("a,b,"), vec!["a", "b", ""]);
        assert_eq!(parse_line(""), vec![""]);
        assert_eq!(parse_line(" spaced , x"), vec![" spaced ", " x"]);
    }

    #[test]
    fn header_is_case_folded_and_whitespace_stripped() {
        assert_eq!(normalize_header(" Min Order Qty "), "minorderqty");
        assert_eq!(normalize_header("ImageURLs"), "imageurls");
    }

    #[test]
    fn columns_are_matched_by_name_not_position() {
        let csv = "LeadTime,Title,category,price,currency,unit,stock,minorderqty,keywords,imageurls,short description,description,features,packaging\n\
                   7 days,Bolt,Hardware,12,INR,piece,100,10,bolt,,Steel bolt,Zinc plated bolt,,Box\n";
        let drafts = parse_drafts(csv).expect("parse");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Bolt");
        assert_eq!(drafts[0].lead_time, "7 days");
        assert_eq!(drafts[0].short_description, "Steel bolt");
        assert_eq!(drafts[0].packaging, "Box");
    }

    #[test]
    fn missing_header_fails_whole_import() {
        let header = HEADER.replace(",leadtime", "");
        let csv = format!("{header}\nWidget,Tools,5,INR,pc,1,1,k,,s,d,,box\n");
        let err = parse_drafts(&csv).expect_err("schema error");
        assert_eq!(err.missing, vec!["leadtime".to_string()]);
        assert!(err.to_string().contains("leadtime"));
    }

    #[test]
    fn schema_error_reports_every_missing_column() {
        let err = parse_drafts("title,price\nA,1\n").expect_err("schema error");
        assert_eq!(err.missing.len(), 12);
        assert!(err.missing.contains(&"category".to_string()));
        assert!(err.missing.contains(&"leadtime".to_string()));
        assert!(!err.missing.contains(&"title".to_string()));
    }

    #[test]
    fn empty_file_is_a_schema_error() {
        let err = parse_drafts("\n  \n").expect_err("schema error");
        assert_eq!(err.missing.len(), REQUIRED_COLUMNS.len());
    }

    #[test]
    fn short_rows_and_blank_lines() {
        let csv = format!("\n{HEADER}\n\nGadget,Electronics,99\n   \n");
        let drafts = parse_drafts(&csv).expect("parse");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Gadget");
        assert_eq!(drafts[0].price, "99");
        assert_eq!(drafts[0].currency, "");
        assert_eq!(drafts[0].lead_time, "");
    }

    #[test]
    fn pipe_separated_cells_become_lines() {
        let csv = format!(
            "{HEADER}\nLamp,Lighting,20,INR,pc,5,1,\"lamp, desk\",https://a/1.jpg|https://a/2.jpg,Desk lamp,LED desk lamp,Dimmable|USB powered,Carton,3 days\n"
        );
        let drafts = parse_drafts(&csv).expect("parse");
        let product = normalize(&drafts[0]);
        assert_eq!(product.keywords, vec!["lamp", "desk"]);
        assert_eq!(product.image_urls, vec!["https://a/1.jpg", "https://a/2.jpg"]);
        assert_eq!(product.features, vec!["Dimmable", "USB powered"]);
    }

    #[test]
    fn export_then_import_preserves_normalized_records() {
        let originals = vec![
            ProductDraft {
                title: "Wire".into(),
                category: "Electrical".into(),
                price: "10".into(),
                currency: "INR".into(),
                unit: "metre".into(),
                stock: "500".into(),
                min_order_qty: "50".into(),
                keywords: "wire, copper, 16 AWG".into(),
                image_urls: "https://cdn.test/w1.jpg\nhttps://cdn.test/w2.jpg".into(),
                short_description: "16 AWG, copper".into(),
                description: r#"Sold as "per metre" lengths"#.into(),
                features: "Flexible\nPVC insulated".into(),
                packaging: "Coil".into(),
                lead_time: "2 days".into(),
            },
            ProductDraft {
                title: "Lamp".into(),
                short_description: "Desk lamp\nwarm white".into(),
                description: "Line one\nLine two\n\nLine four".into(),
                packaging: "Carton".into(),
                ..ProductDraft::default()
            },
            ProductDraft {
                title: "Blank extras".into(),
                description: "Only the basics".into(),
                short_description: "Basics".into(),
                ..ProductDraft::default()
            },
        ];

        let csv = export_drafts(&originals);
        let imported = parse_drafts(&csv).expect("re-import");
        assert_eq!(imported.len(), originals.len());
        for (before, after) in originals.iter().zip(imported.iter()) {
            assert_eq!(normalize(before), normalize(after));
        }
        assert_eq!(imported[1].description, "Line one\nLine two\n\nLine four");
        assert_eq!(imported[1].short_description, "Desk lamp\nwarm white");
        assert_eq!(imported[1].packaging, "Carton");
    }

    #[test]
    fn export_folds_line_breaks_in_single_line_cells() {
        let csv = export_drafts(&[ProductDraft {
            title: "Two\nline title".into(),
            lead_time: "3\r\ndays".into(),
            description: "First\r\nSecond\rThird".into(),
            ..ProductDraft::default()
        }]);
        assert_eq!(csv.lines().count(), 2);
        let imported = parse_drafts(&csv).expect("re-import");
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].title, "Two line title");
        assert_eq!(imported[0].lead_time, "3 days");
        assert_eq!(imported[0].description, "First\nSecond\nThird");
    }
}
