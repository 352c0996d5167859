//! Solid cell fills from an xlsx container.
//!
//! calamine only exposes values, so fills are read straight from the
//! package: `xl/workbook.xml` and its relationships locate each sheet part,
//! `xl/styles.xml` maps style indexes to fills and the sheet parts give each
//! cell's style index.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::utils::parse_cell_reference;

/// `(row, column)` to RGB of every solid-filled cell, per sheet name.
pub type SheetFills = HashMap<String, Vec<((usize, usize), u32)>>;

pub fn read_fills(path: &Path) -> Result<SheetFills> {
    let file = File::open(path).with_context(|| format!("Unable to open {}", path.display()))?;
    read_fills_from(BufReader::new(file))
}

pub fn read_fills_from<R: Read + Seek>(reader: R) -> Result<SheetFills> {
    let mut archive = ZipArchive::new(reader).context("Not a zip container")?;

    let style_fills = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_style_fills(&xml)?,
        None => return Ok(SheetFills::new()),
    };
    if style_fills.iter().all(Option::is_none) {
        return Ok(SheetFills::new());
    }

    let workbook = read_part(&mut archive, "xl/workbook.xml")?
        .context("Missing xl/workbook.xml")?;
    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?
        .context("Missing xl/_rels/workbook.xml.rels")?;
    let targets = parse_relationships(&rels)?;

    let mut fills = SheetFills::new();
    for (name, rel_id) in parse_sheet_entries(&workbook)? {
        let Some(target) = targets.get(&rel_id) else {
            continue;
        };
        let Some(xml) = read_part(&mut archive, &resolve_target(target))? else {
            continue;
        };

        let cells = parse_cell_fills(&xml, &style_fills)?;
        if !cells.is_empty() {
            fills.insert(name, cells);
        }
    }

    Ok(fills)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Unable to open {}", name)),
    };

    let mut content = Vec::new();
    part.read_to_end(&mut content)
        .with_context(|| format!("Unable to read {}", name))?;
    Ok(Some(content))
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.context("XML attribute error")?;
        if attr.key.as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(quick_xml::escape::unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_rgb(value: &str) -> Option<u32> {
    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    // ARGB; the alpha byte is dropped.
    let hex = match value.len() {
        8 => &value[2..],
        6 => value,
        _ => return None,
    };
    u32::from_str_radix(hex, 16).ok()
}

/// Solid fill colour per cell style index (`cellXfs` order).
fn parse_style_fills(xml: &[u8]) -> Result<Vec<Option<u32>>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut fills: Vec<Option<u32>> = Vec::new();
    let mut xf_fill_ids: Vec<usize> = Vec::new();
    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut solid = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"fills" => in_fills = true,
                b"fill" if in_fills => {
                    fills.push(None);
                    solid = false;
                }
                b"patternFill" if in_fills => {
                    solid = attribute(&e, b"patternType")?.as_deref() == Some("solid");
                }
                b"fgColor" if in_fills && solid => {
                    if let Some(last) = fills.last_mut() {
                        *last = attribute(&e, b"rgb")?.as_deref().and_then(parse_rgb);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let fill_id = attribute(&e, b"fillId")?
                        .and_then(|id| id.parse().ok())
                        .unwrap_or(0);
                    xf_fill_ids.push(fill_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"fills" => in_fills = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context("XML parse error in xl/styles.xml"),
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_fill_ids
        .into_iter()
        .map(|id| fills.get(id).copied().flatten())
        .collect())
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context("XML parse error in workbook relationships"),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// `(sheet name, relationship id)` in workbook order.
fn parse_sheet_entries(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attribute(&e, b"name")?, attribute(&e, b"r:id")?) {
                    sheets.push((name, id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context("XML parse error in xl/workbook.xml"),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_cell_fills(xml: &[u8], style_fills: &[Option<u32>]) -> Result<Vec<((usize, usize), u32)>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut cells = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                let style = attribute(&e, b"s")?.and_then(|s| s.parse::<usize>().ok());
                let rgb = style.and_then(|s| style_fills.get(s).copied().flatten());
                let position = attribute(&e, b"r")?.and_then(|r| parse_cell_reference(&r));

                if let (Some(rgb), Some(position)) = (rgb, position) {
                    cells.push((position, rgb));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context("XML parse error in worksheet"),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}
