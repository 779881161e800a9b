//! `svgSprite`: merge `svg/*.svg` into one `<symbol>` sprite.
//!
//! ```text
//! <svg viewBox="0 0 24 24">...</svg>   (svg/close.svg)
//!   ─> <symbol id="close" viewBox="0 0 24 24">...</symbol>
//! ```
//!
//! Comments, declarations, processing instructions, doctypes and
//! `<metadata>` subtrees are dropped. Whitespace between tags is trimmed.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, Event},
};

use crate::config::Config;
use crate::task::{Artifact, Inputs, Task, TaskError};

use super::SVG_SPRITE;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Root attributes carried over to each `<symbol>`.
const SYMBOL_ATTRS: &[&[u8]] = &[b"viewBox", b"preserveAspectRatio"];

pub fn task(config: &Arc<Config>) -> Task {
    let config = Arc::clone(config);
    let inputs = Inputs::glob(&config.source_dir, ["svg/*.svg"]);
    Task::new(SVG_SPRITE, move |input| {
        if input.files.is_empty() {
            return Ok(Vec::new());
        }

        let mut symbols = Vec::new();
        let mut uses_xlink = false;
        for path in input.files {
            let source = input.read_to_string(path)?;
            let symbol = symbol(path, &source)?;
            uses_xlink |= symbol.uses_xlink;
            symbols.extend(symbol.markup);
        }

        let mut sprite = format!("<svg xmlns=\"{SVG_NS}\"").into_bytes();
        if uses_xlink {
            sprite.extend(format!(" xmlns:xlink=\"{XLINK_NS}\"").bytes());
        }
        sprite.push(b'>');
        sprite.extend(symbols);
        sprite.extend(b"</svg>");

        Ok(vec![Artifact::new(format!("img/{}", config.svg.sprite), sprite)])
    })
    .inputs(inputs)
}

struct Symbol {
    markup: Vec<u8>,
    uses_xlink: bool,
}

/// Rewrite one SVG document as a `<symbol>` named after its file stem.
fn symbol(path: &Path, source: &str) -> Result<Symbol, TaskError> {
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(source.len())));
    let write_err = |e: std::io::Error| TaskError::transform(path, e.to_string());

    // Element depth inside the root <svg>, and inside a dropped subtree.
    let mut depth = 0usize;
    let mut skipped = 0usize;
    let mut closed = false;
    let mut uses_xlink = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                #[allow(clippy::cast_possible_truncation)]
                let offset = reader.error_position() as usize;
                return Err(TaskError::transform_at_offset(path, source, offset, e.to_string()));
            }
        };

        match event {
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            _ if closed => {}
            _ if skipped > 0 => match event {
                Event::Start(_) => skipped += 1,
                Event::End(_) => skipped -= 1,
                _ => {}
            },
            Event::Start(elem) if depth == 0 => {
                let start = symbol_start(path, &id, &elem)?;
                writer.write_event(Event::Start(start)).map_err(write_err)?;
                depth = 1;
            }
            Event::Empty(elem) if depth == 0 => {
                let start = symbol_start(path, &id, &elem)?;
                writer.write_event(Event::Empty(start)).map_err(write_err)?;
                closed = true;
            }
            // Stray content outside the root element.
            _ if depth == 0 => {}
            Event::Start(elem) if elem.name().as_ref() == b"metadata" => skipped = 1,
            Event::Empty(elem) if elem.name().as_ref() == b"metadata" => {}
            Event::Start(elem) => {
                uses_xlink |= has_xlink(&elem);
                depth += 1;
                writer.write_event(Event::Start(elem)).map_err(write_err)?;
            }
            Event::Empty(elem) => {
                uses_xlink |= has_xlink(&elem);
                writer.write_event(Event::Empty(elem)).map_err(write_err)?;
            }
            Event::End(elem) => {
                depth -= 1;
                if depth == 0 {
                    writer
                        .write_event(Event::End(BytesEnd::new("symbol")))
                        .map_err(write_err)?;
                    closed = true;
                } else {
                    writer.write_event(Event::End(elem)).map_err(write_err)?;
                }
            }
            other => writer.write_event(other).map_err(write_err)?,
        }
    }

    if !closed {
        let message = if depth == 0 {
            "no <svg> element found"
        } else {
            "unexpected end of file inside <svg>"
        };
        return Err(TaskError::transform(path, message));
    }

    Ok(Symbol {
        markup: writer.into_inner().into_inner(),
        uses_xlink,
    })
}

fn symbol_start(
    path: &Path,
    id: &str,
    svg: &BytesStart<'_>,
) -> Result<BytesStart<'static>, TaskError> {
    if svg.name().as_ref() != b"svg" {
        return Err(TaskError::transform(path, "root element is not <svg>"));
    }

    let mut symbol = BytesStart::new("symbol");
    symbol.push_attribute(("id", id));

    let mut view_box = false;
    let mut width = None;
    let mut height = None;
    for attr in svg.attributes() {
        let attr = attr.map_err(|e| TaskError::transform(path, e.to_string()))?;
        match attr.key.as_ref() {
            b"width" => width = parse_length(&attr.value),
            b"height" => height = parse_length(&attr.value),
            key if SYMBOL_ATTRS.contains(&key) => {
                view_box |= key == b"viewBox";
                symbol.push_attribute(attr);
            }
            _ => {}
        }
    }

    // Without a viewBox the symbol could not be scaled by <use>.
    if !view_box && let (Some(w), Some(h)) = (width, height) {
        symbol.push_attribute(("viewBox", format!("0 0 {w} {h}").as_str()));
    }
    Ok(symbol)
}

fn has_xlink(elem: &BytesStart<'_>) -> bool {
    elem.attributes()
        .flatten()
        .any(|attr| attr.key.as_ref().starts_with(b"xlink:"))
}

/// `24`, `24px` or `1.5` as a number; other units are ignored.
fn parse_length(value: &[u8]) -> Option<f64> {
    let value = std::str::from_utf8(value).ok()?.trim();
    value.strip_suffix("px").unwrap_or(value).parse().ok()
}
