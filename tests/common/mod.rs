use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Ruled table geometry, in PDF points.
const TABLE_LEFT: i64 = 50;
const TABLE_TOP: i64 = 740;
const COLUMN_WIDTH: i64 = 150;
const ROW_HEIGHT: i64 = 30;

/// One page of a synthetic report: a title line and an optional ruled table.
pub struct FixturePage<'a> {
    pub title: &'a str,
    pub table: &'a [&'a [&'a str]],
}

/// Writes an A4 PDF whose tables are drawn with real ruling lines and whose
/// cell text is embedded, so poppler can render and extract it.
pub fn create_report_pdf(path: &Path, pages: &[FixturePage]) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();

    for page in pages {
        let mut operations = text_at(page.title, 12, TABLE_LEFT, 780);
        operations.extend(ruled_table(page.table)?);

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}

fn text_at(text: &str, size: i64, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn line(x0: i64, y0: i64, x1: i64, y1: i64) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![x0.into(), y0.into()]),
        Operation::new("l", vec![x1.into(), y1.into()]),
        Operation::new("S", vec![]),
    ]
}

/// Grid lines around every cell, with each cell's text inset from its
/// top-left corner.
fn ruled_table(rows: &[&[&str]]) -> Result<Vec<Operation>, Box<dyn std::error::Error>> {
    let row_count = i64::try_from(rows.len())?;
    let col_count = i64::try_from(rows.iter().map(|row| row.len()).max().unwrap_or(0))?;
    if row_count == 0 || col_count == 0 {
        return Ok(Vec::new());
    }

    let right = TABLE_LEFT + col_count * COLUMN_WIDTH;
    let bottom = TABLE_TOP - row_count * ROW_HEIGHT;

    let mut operations = vec![Operation::new("w", vec![1.into()])];
    for r in 0..=row_count {
        let y = TABLE_TOP - r * ROW_HEIGHT;
        operations.extend(line(TABLE_LEFT, y, right, y));
    }
    for c in 0..=col_count {
        let x = TABLE_LEFT + c * COLUMN_WIDTH;
        operations.extend(line(x, TABLE_TOP, x, bottom));
    }

    for (r, row) in (0..).zip(rows.iter()) {
        for (c, cell) in (0..).zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            let x = TABLE_LEFT + c * COLUMN_WIDTH + 6;
            let y = TABLE_TOP - r * ROW_HEIGHT - 20;
            operations.extend(text_at(cell, 10, x, y));
        }
    }
    Ok(operations)
}
