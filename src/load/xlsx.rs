// src/load/xlsx.rs
//! Minimal Office Open XML workbook reader.
//!
//! Resolves one worksheet through `xl/workbook.xml` and its relationships,
//! decodes shared, inline and typed cell values, then treats the first
//! non-empty row as the header.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{debug, trace};
use zip::ZipArchive;

use super::{normalize_headers, LoadError};
use crate::table::{CellValue, Table};

type XmlResult<T> = Result<T, String>;

/// Worksheet limits of the file format (`XFD1048576`).
const MAX_ROWS: u32 = 1_048_576;
const MAX_COLS: u32 = 16_384;
/// The dense grid may hold at most this many slots per stored cell
/// (or `MIN_GRID_SLOTS`, whichever is larger).
const MAX_SLOTS_PER_CELL: usize = 64;
const MIN_GRID_SLOTS: usize = 1 << 20;

struct SheetEntry {
    name: String,
    rel_id: Option<String>,
    sheet_id: Option<u32>,
}

struct RawCell {
    row: u32,
    col: u32,
    value: CellValue,
}

/// Load the selected sheet (or the first one) of the workbook at `path`.
pub fn read_workbook(path: &Path, name: &str, sheet: Option<&str>) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::parse(path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| LoadError::parse(path, e))?;

    let workbook = read_part(&mut archive, "xl/workbook.xml")
        .ok_or_else(|| LoadError::parse(path, "missing xl/workbook.xml"))?;
    let sheets = parse_workbook(&workbook).map_err(|e| LoadError::parse(path, e))?;
    let relationships = match read_part(&mut archive, "xl/_rels/workbook.xml.rels") {
        Some(xml) => parse_relationships(&xml).map_err(|e| LoadError::parse(path, e))?,
        None => HashMap::new(),
    };

    let (index, entry) = select_sheet(&sheets, sheet).ok_or_else(|| match sheet {
        Some(s) => LoadError::SheetNotFound {
            path: path.display().to_string(),
            sheet: s.to_string(),
        },
        None => LoadError::parse(path, "workbook has no sheets"),
    })?;
    let target = resolve_target(entry, &relationships, index);
    debug!(sheet = %entry.name, part = %target, "reading worksheet");

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings(&xml).map_err(|e| LoadError::parse(path, e))?,
        None => Vec::new(),
    };
    let sheet_xml = read_part(&mut archive, &target)
        .ok_or_else(|| LoadError::parse(path, format!("missing worksheet part {}", target)))?;
    let cells = parse_sheet(&sheet_xml, &shared).map_err(|e| LoadError::parse(path, e))?;
    trace!(cells = cells.len(), "parsed worksheet cells");

    build_table(name, cells).map_err(|e| LoadError::parse(path, e))
}

fn read_part<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut entry = archive.by_name(name).ok()?;
    // declared sizes are untrusted; let the buffer grow past this
    let mut buf = Vec::with_capacity(entry.size().min(1 << 24) as usize);
    entry.read_to_end(&mut buf).ok()?;
    Some(buf)
}

fn select_sheet<'a>(
    sheets: &'a [SheetEntry],
    selector: Option<&str>,
) -> Option<(usize, &'a SheetEntry)> {
    match selector {
        None => sheets.first().map(|s| (0, s)),
        Some(sel) => sheets
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == sel)
            .or_else(|| {
                // fall back to a zero-based sheet position
                sel.parse::<usize>()
                    .ok()
                    .and_then(|i| sheets.get(i).map(|s| (i, s)))
            }),
    }
}

fn resolve_target(
    sheet: &SheetEntry,
    relationships: &HashMap<String, String>,
    index: usize,
) -> String {
    if let Some(target) = sheet.rel_id.as_ref().and_then(|id| relationships.get(id)) {
        return normalize_target(target);
    }
    let guessed = match sheet.sheet_id {
        Some(id) => format!("xl/worksheets/sheet{}.xml", id),
        None => format!("xl/worksheets/sheet{}.xml", index + 1),
    };
    normalize_target(&guessed)
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_string()
    } else {
        format!("xl/{}", trimmed)
    }
}

fn xml_reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    reader
}

fn get_attr(element: &BytesStart<'_>, key: &[u8]) -> XmlResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn read_text(reader: &mut Reader<&[u8]>, element: &BytesStart<'_>) -> XmlResult<String> {
    let raw = reader
        .read_text(element.name())
        .map_err(|e| e.to_string())?;
    let text = quick_xml::escape::unescape(&raw).map_err(|e| e.to_string())?;
    Ok(text.into_owned())
}

fn parse_workbook(xml: &[u8]) -> XmlResult<Vec<SheetEntry>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                if let Some(name) = get_attr(&e, b"name")? {
                    sheets.push(SheetEntry {
                        name,
                        rel_id: get_attr(&e, b"r:id")?,
                        sheet_id: get_attr(&e, b"sheetId")?.and_then(|s| s.parse().ok()),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_relationships(xml: &[u8]) -> XmlResult<HashMap<String, String>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let id = get_attr(&e, b"Id")?;
                let target = get_attr(&e, b"Target")?;
                let is_sheet = get_attr(&e, b"Type")?
                    .map_or(false, |t| t.contains("worksheet"));
                if let (true, Some(id), Some(target)) = (is_sheet, id, target) {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

fn parse_shared_strings(xml: &[u8]) -> XmlResult<Vec<String>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"si" => {
                    current.clear();
                    in_si = true;
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => current.push_str(&read_text(&mut reader, &e)?),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn parse_sheet(xml: &[u8], shared: &[String]) -> XmlResult<Vec<RawCell>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut cells = Vec::new();
    let mut next_row: u32 = 0;
    let mut row: u32 = 0;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                row = match get_attr(&e, b"r")?.and_then(|r| r.parse::<u32>().ok()) {
                    Some(r) if r > MAX_ROWS => return Err(format!("row {} out of range", r)),
                    Some(r) if r > 0 => r - 1,
                    _ => next_row,
                };
                if row >= MAX_ROWS {
                    return Err(format!("row {} out of range", row + 1));
                }
                next_row = row + 1;
                next_col = 0;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" => {
                let (r, c) = cell_position(&e, row, next_col)?;
                let value = parse_cell(&mut reader, &e, shared)?;
                next_col = c + 1;
                cells.push(RawCell {
                    row: r,
                    col: c,
                    value,
                });
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                let (_, c) = cell_position(&e, row, next_col)?;
                next_col = c + 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

fn cell_position(e: &BytesStart<'_>, row: u32, next_col: u32) -> XmlResult<(u32, u32)> {
    match get_attr(e, b"r")? {
        Some(addr) => address_to_index(&addr).ok_or_else(|| format!("invalid cell address {}", addr)),
        None if next_col >= MAX_COLS => Err(format!("column {} out of range", next_col + 1)),
        None => Ok((row, next_col)),
    }
}

fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    shared: &[String],
) -> XmlResult<CellValue> {
    let cell_type = get_attr(start, b"t")?;
    let mut value: Option<String> = None;
    let mut inline: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"v" => value = Some(read_text(reader, &e)?),
                // formulas are skipped; the cached <v> carries the value
                b"f" => {
                    read_text(reader, &e)?;
                }
                b"is" => inline = Some(String::new()),
                b"t" => {
                    let text = read_text(reader, &e)?;
                    inline.get_or_insert_with(String::new).push_str(&text);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"c" => break,
            Ok(Event::Eof) => return Err("unexpected EOF inside cell".into()),
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    if let Some(text) = inline {
        return Ok(text_value(text));
    }
    convert_value(value.as_deref(), cell_type.as_deref(), shared)
}

fn convert_value(raw: Option<&str>, cell_type: Option<&str>, shared: &[String]) -> XmlResult<CellValue> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(CellValue::Null),
    };
    let trimmed = raw.trim();

    match cell_type {
        Some("s") => {
            let idx = trimmed
                .parse::<usize>()
                .map_err(|e| format!("bad shared string index {}: {}", trimmed, e))?;
            let s = shared
                .get(idx)
                .ok_or_else(|| format!("shared string index {} out of bounds", idx))?;
            Ok(text_value(s.clone()))
        }
        Some("b") => Ok(match trimmed {
            "1" => CellValue::Bool(true),
            "0" => CellValue::Bool(false),
            _ => CellValue::Null,
        }),
        Some("e") | Some("str") | Some("inlineStr") | Some("d") => Ok(text_value(raw.to_string())),
        _ if trimmed.is_empty() => Ok(CellValue::Null),
        _ => Ok(match trimmed.parse::<f64>() {
            Ok(n) => CellValue::from_number(n),
            Err(_) => CellValue::Text(raw.to_string()),
        }),
    }
}

fn text_value(s: String) -> CellValue {
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(s)
    }
}

/// Parse an A1 reference into zero-based (row, col). References outside
/// `A1:XFD1048576` are rejected.
fn address_to_index(a1: &str) -> Option<(u32, u32)> {
    let split = a1.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = a1.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.bytes() {
        col = col
            .checked_mul(26)?
            .checked_add((ch.to_ascii_uppercase() - b'A' + 1) as u32)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS || col > MAX_COLS {
        return None;
    }
    Some((row - 1, col - 1))
}

fn header_text(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

fn build_table(name: &str, cells: Vec<RawCell>) -> XmlResult<Table> {
    let filled: Vec<&RawCell> = cells.iter().filter(|c| !c.value.is_null()).collect();
    let (header_row, last_row, width) = match (
        filled.iter().map(|c| c.row).min(),
        filled.iter().map(|c| c.row).max(),
        filled.iter().map(|c| c.col).max(),
    ) {
        (Some(first), Some(last), Some(max_col)) => (first, last, max_col as usize + 1),
        _ => return Ok(Table::from_rows(name, Vec::new(), Vec::new())),
    };

    let height = (last_row - header_row) as usize;
    let slots = (height + 1).saturating_mul(width);
    let budget = filled.len().saturating_mul(MAX_SLOTS_PER_CELL).max(MIN_GRID_SLOTS);
    if slots > budget {
        return Err(format!(
            "used range of {} rows x {} columns is too sparse for {} cells",
            height + 1,
            width,
            filled.len()
        ));
    }

    let mut raw_headers = vec![String::new(); width];
    let mut rows = vec![vec![CellValue::Null; width]; height];
    for cell in cells {
        if cell.row < header_row || cell.row > last_row || cell.col as usize >= width {
            continue;
        }
        if cell.row == header_row {
            raw_headers[cell.col as usize] = header_text(&cell.value);
        } else {
            rows[(cell.row - header_row - 1) as usize][cell.col as usize] = cell.value;
        }
    }

    Ok(Table::from_rows(name, normalize_headers(raw_headers), rows))
}
