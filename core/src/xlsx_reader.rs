//! Reading the first worksheet of an `.xlsx` package into string cells.
//!
//! Cell values are kept as the text stored in the sheet XML: numbers keep
//! their serialized form, shared and inline strings are resolved, booleans
//! become `TRUE`/`FALSE`. Nothing is re-typed or re-formatted.

use crate::addressing::parse_cell_reference;
use crate::container::{ContainerError, XlsxContainer};
use crate::table::{Table, normalize_headers};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Upper bound on `rows * columns` of the grid built from one sheet.
const MAX_GRID_CELLS: usize = 20_000_000;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XlsxReadError {
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),
    #[error("shared string index {0} out of bounds")]
    SharedStringOutOfBounds(usize),
    #[error("workbook.xml missing or unreadable")]
    WorkbookXmlMissing,
    #[error("workbook has no worksheets")]
    NoWorksheets,
    #[error("worksheet XML missing for sheet {0}")]
    WorksheetXmlMissing(String),
    #[error("worksheet has no header row")]
    NoHeaderRow,
    #[error("worksheet spans {rows} rows by {columns} columns, too large to load")]
    SheetTooLarge { rows: usize, columns: usize },
}

struct SheetDescriptor {
    name: String,
    rel_id: Option<String>,
    sheet_id: Option<u32>,
}

struct ParsedCell {
    row: u32,
    col: u32,
    value: String,
}

/// Loads the first worksheet; the first populated row is the header.
pub fn read_first_sheet(path: &Path) -> Result<Table, XlsxReadError> {
    let cells = read_first_sheet_cells(path, None)?;
    build_table(cells)
}

/// Reads only the header row of the first worksheet.
pub fn read_first_sheet_header(path: &Path) -> Result<Vec<String>, XlsxReadError> {
    let cells = read_first_sheet_cells(path, Some(1))?;
    let table = build_table(cells)?;
    Ok(table.into_parts().0)
}

fn read_first_sheet_cells(
    path: &Path,
    max_rows: Option<usize>,
) -> Result<Vec<ParsedCell>, XlsxReadError> {
    let mut container = XlsxContainer::open(path)?;

    let shared_strings = match container.read_part_optional("xl/sharedStrings.xml")? {
        Some(bytes) => parse_shared_strings(&bytes)?,
        None => Vec::new(),
    };

    let workbook_bytes = container
        .read_part("xl/workbook.xml")
        .map_err(|_| XlsxReadError::WorkbookXmlMissing)?;
    let sheets = parse_workbook_xml(&workbook_bytes)?;
    let first = sheets.first().ok_or(XlsxReadError::NoWorksheets)?;

    let relationships = match container.read_part_optional("xl/_rels/workbook.xml.rels")? {
        Some(bytes) => parse_relationships(&bytes)?,
        None => HashMap::new(),
    };

    let target = resolve_sheet_target(first, &relationships);
    let sheet_bytes = container
        .read_part(&target)
        .map_err(|_| XlsxReadError::WorksheetXmlMissing(first.name.clone()))?;

    parse_sheet_cells(&sheet_bytes, &shared_strings, max_rows)
}

/// Lays cells out row by row. Rows with no cells are skipped, and the
/// header is the first populated row.
fn build_table(mut cells: Vec<ParsedCell>) -> Result<Table, XlsxReadError> {
    cells.sort_by_key(|c| (c.row, c.col));
    let width = cells
        .iter()
        .map(|c| c.col as usize + 1)
        .max()
        .ok_or(XlsxReadError::NoHeaderRow)?;
    let height = 1 + cells.windows(2).filter(|w| w[0].row != w[1].row).count();
    if height.saturating_mul(width) > MAX_GRID_CELLS {
        return Err(XlsxReadError::SheetTooLarge {
            rows: height,
            columns: width,
        });
    }

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(height);
    let mut current = None;
    for cell in cells {
        if current != Some(cell.row) {
            grid.push(vec![String::new(); width]);
            current = Some(cell.row);
        }
        if let Some(row) = grid.last_mut() {
            row[cell.col as usize] = cell.value;
        }
    }

    let mut rows = grid.into_iter();
    let header = rows.next().unwrap_or_default();
    Ok(Table::from_rows(normalize_headers(header), rows.collect()))
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, XlsxReadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"si" => {
                current.clear();
                in_si = true;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"t" && in_si => {
                let text = reader.read_text(e.name()).map_err(to_xml_err)?;
                current.push_str(&unescape(&text)?);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::End(e)) if e.name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
                in_si = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn parse_workbook_xml(xml: &[u8]) -> Result<Vec<SheetDescriptor>, XlsxReadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                let name = get_attr_value(&e, b"name")?;
                let rel_id = get_attr_value(&e, b"r:id")?;
                let sheet_id = get_attr_value(&e, b"sheetId")?.and_then(|v| v.parse().ok());
                if let Some(name) = name {
                    sheets.push(SheetDescriptor {
                        name,
                        rel_id,
                        sheet_id,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxReadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                let id = get_attr_value(&e, b"Id")?;
                let target = get_attr_value(&e, b"Target")?;
                let rel_type = get_attr_value(&e, b"Type")?;
                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type)
                    && rel_type.contains("worksheet")
                {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

fn resolve_sheet_target(sheet: &SheetDescriptor, relationships: &HashMap<String, String>) -> String {
    if let Some(rel_id) = &sheet.rel_id
        && let Some(target) = relationships.get(rel_id)
    {
        return normalize_target(target);
    }

    let guessed = format!("xl/worksheets/sheet{}.xml", sheet.sheet_id.unwrap_or(1));
    normalize_target(&guessed)
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_string()
    } else {
        format!("xl/{trimmed}")
    }
}

fn parse_sheet_cells(
    xml: &[u8],
    shared_strings: &[String],
    max_rows: Option<usize>,
) -> Result<Vec<ParsedCell>, XlsxReadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut cells = Vec::new();
    let mut populated_rows = 0usize;
    let mut row_has_cells = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"row" => row_has_cells = false,
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" => {
                if let Some(cell) = parse_cell(&mut reader, e, shared_strings)? {
                    row_has_cells = true;
                    cells.push(cell);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"row" => {
                if row_has_cells {
                    populated_rows += 1;
                    if max_rows.is_some_and(|max| populated_rows >= max) {
                        break;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

/// Returns `None` for cells that carry no value (styled blanks, formulas
/// without a cached result).
fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: BytesStart,
    shared_strings: &[String],
) -> Result<Option<ParsedCell>, XlsxReadError> {
    let reference = get_attr_value(&start, b"r")?
        .ok_or_else(|| XlsxReadError::Xml("cell missing address".into()))?;
    let (row, col) = parse_cell_reference(&reference)
        .ok_or_else(|| XlsxReadError::InvalidAddress(reference.clone()))?;
    let cell_type = get_attr_value(&start, b"t")?;

    let mut value_text: Option<String> = None;
    let mut inline_text: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"v" => {
                let text = reader.read_text(e.name()).map_err(to_xml_err)?;
                value_text = Some(unescape(&text)?);
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"is" => {
                inline_text = Some(read_inline_string(reader)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == start.name().as_ref() => break,
            Ok(Event::Eof) => {
                return Err(XlsxReadError::Xml("unexpected EOF inside cell".into()));
            }
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    let value = match inline_text {
        Some(text) => Some(text),
        None => convert_value(value_text.as_deref(), cell_type.as_deref(), shared_strings)?,
    };

    Ok(value.map(|value| ParsedCell { row, col, value }))
}

fn read_inline_string(reader: &mut Reader<&[u8]>) -> Result<String, XlsxReadError> {
    let mut buf = Vec::new();
    let mut value = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"t" => {
                let text = reader.read_text(e.name()).map_err(to_xml_err)?;
                value.push_str(&unescape(&text)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"is" => break,
            Ok(Event::Eof) => {
                return Err(XlsxReadError::Xml(
                    "unexpected EOF inside inline string".into(),
                ));
            }
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(value)
}

fn convert_value(
    value_text: Option<&str>,
    cell_type: Option<&str>,
    shared_strings: &[String],
) -> Result<Option<String>, XlsxReadError> {
    let Some(raw) = value_text else {
        return Ok(None);
    };

    match cell_type {
        Some("s") => {
            let idx = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| XlsxReadError::Xml(e.to_string()))?;
            let text = shared_strings
                .get(idx)
                .ok_or(XlsxReadError::SharedStringOutOfBounds(idx))?;
            Ok(Some(text.clone()))
        }
        Some("b") => Ok(Some(
            match raw.trim() {
                "1" => "TRUE",
                "0" => "FALSE",
                other => other,
            }
            .to_string(),
        )),
        Some("str") | Some("inlineStr") => Ok(Some(raw.to_string())),
        _ => Ok(Some(raw.trim().to_string())),
    }
}

fn unescape(text: &str) -> Result<String, XlsxReadError> {
    quick_xml::escape::unescape(text)
        .map(|s| s.into_owned())
        .map_err(|e| XlsxReadError::Xml(e.to_string()))
}

fn get_attr_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XlsxReadError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| XlsxReadError::Xml(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(to_xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

fn to_xml_err(err: quick_xml::Error) -> XlsxReadError {
    XlsxReadError::Xml(err.to_string())
}
