use log::info;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::mapper::SubstitutionMap;
use crate::report::ReplacementReport;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Template file not found: {0}")]
    TemplateNotFound(PathBuf),
    #[error("Failed to read '{path}': the file might be corrupted or not a valid .docx ({source})")]
    InvalidTemplate { path: PathBuf, source: ZipError },
    #[error("Failed to read template part '{part}': {source}")]
    PartIo {
        part: String,
        source: std::io::Error,
    },
    #[error("Malformed XML in part '{part}': {source}")]
    Xml {
        part: String,
        source: quick_xml::Error,
    },
    #[error("Failed to assemble output document: {0}")]
    Assemble(#[from] ZipError),
    #[error("Failed to save document to '{path}': {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Replaces every placeholder occurrence in the template's text parts and
/// writes the result to `output_path`. The template itself is never
/// modified; the output archive is assembled in memory and written in one
/// step, so no partially written file is left behind on failure.
pub fn substitute(
    template_path: &Path,
    map: &SubstitutionMap,
    output_path: &Path,
    expected: Option<u64>,
) -> Result<ReplacementReport, DocumentError> {
    if !template_path.exists() {
        return Err(DocumentError::TemplateNotFound(template_path.to_path_buf()));
    }
    let file = std::fs::File::open(template_path).map_err(|e| DocumentError::InvalidTemplate {
        path: template_path.to_path_buf(),
        source: ZipError::Io(e),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| DocumentError::InvalidTemplate {
        path: template_path.to_path_buf(),
        source: e,
    })?;

    let mut report = ReplacementReport::new(map, expected);
    let mut zip_out = ZipWriter::new(Cursor::new(Vec::new()));

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| DocumentError::InvalidTemplate {
            path: template_path.to_path_buf(),
            source: e,
        })?;
        let name = entry.name().to_string();
        if is_text_part(&name) && !map.is_empty() {
            let mut xml = String::new();
            entry.read_to_string(&mut xml).map_err(|e| DocumentError::PartIo {
                part: name.clone(),
                source: e,
            })?;
            let rewritten = rewrite_part(&xml, &name, map, &mut report)?;
            zip_out.start_file(name, SimpleFileOptions::default())?;
            // An untouched part keeps its original bytes, not a
            // re-serialization.
            match &rewritten {
                Some(bytes) => zip_out.write_all(bytes),
                None => zip_out.write_all(xml.as_bytes()),
            }
            .map_err(|e| DocumentError::Assemble(e.into()))?;
        } else {
            zip_out.raw_copy_file(entry)?;
        }
    }

    let bytes = zip_out.finish()?.into_inner();
    let destination = resolve_output_path(output_path, template_path);
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::Save {
                path: destination.clone(),
                source: e,
            })?;
        }
    }
    std::fs::write(&destination, bytes).map_err(|e| DocumentError::Save {
        path: destination.clone(),
        source: e,
    })?;
    info!("Document saved at: {:?}", destination);

    Ok(report)
}

/// The archive entries whose text content is scanned for placeholders.
fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || name == "word/footnotes.xml"
        || name == "word/endnotes.xml"
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

/// A trailing separator or an existing directory means "keep the
/// template's file name inside that directory".
fn resolve_output_path(output_path: &Path, template_path: &Path) -> PathBuf {
    let raw = output_path.as_os_str().to_string_lossy();
    if raw.ends_with('/') || raw.ends_with('\\') || output_path.is_dir() {
        match template_path.file_name() {
            Some(name) => output_path.join(name),
            None => output_path.to_path_buf(),
        }
    } else {
        output_path.to_path_buf()
    }
}

/// A `w:t` text node inside the event stream: the text event itself and
/// the element's start tag (needed for `xml:space`).
#[derive(Clone, Copy)]
struct TextSlot {
    text: usize,
    elem: usize,
}

/// Rewrites one XML part. Returns `None` when no placeholder matched,
/// so the caller can keep the original bytes.
fn rewrite_part(
    xml: &str,
    part: &str,
    map: &SubstitutionMap,
    report: &mut ReplacementReport,
) -> Result<Option<Vec<u8>>, DocumentError> {
    let xml_err = |e: quick_xml::Error| DocumentError::Xml {
        part: part.to_string(),
        source: e,
    };

    let mut reader = Reader::from_str(xml);
    let mut events: Vec<Event<'static>> = Vec::new();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Eof => break,
            ev => events.push(ev.into_owned()),
        }
    }

    // Group the text slots by enclosing paragraph so a placeholder split
    // across run boundaries can still be matched. Table cells hold
    // ordinary paragraphs, so they need no special casing.
    let mut groups: Vec<Vec<TextSlot>> = Vec::new();
    let mut open: Option<Vec<TextSlot>> = None;
    let mut para_depth = 0usize;
    let mut in_text = false;
    let mut last_elem = 0usize;
    for (i, ev) in events.iter().enumerate() {
        match ev {
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                if para_depth == 0 {
                    open = Some(Vec::new());
                }
                para_depth += 1;
            }
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                para_depth = para_depth.saturating_sub(1);
                if para_depth == 0 {
                    if let Some(group) = open.take() {
                        groups.push(group);
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == b"w:t" => {
                in_text = true;
                last_elem = i;
            }
            Event::End(e) if e.name().as_ref() == b"w:t" => {
                in_text = false;
            }
            Event::Text(_) if in_text => {
                let slot = TextSlot { text: i, elem: last_elem };
                match open.as_mut() {
                    Some(group) => group.push(slot),
                    None => groups.push(vec![slot]),
                }
            }
            _ => {}
        }
    }

    let mut part_counts = vec![0usize; map.len()];
    let mut changed_any = false;
    for group in &groups {
        if group.is_empty() {
            continue;
        }
        let mut fragments = Vec::with_capacity(group.len());
        for slot in group {
            let text = match &events[slot.text] {
                Event::Text(t) => t.unescape().map_err(xml_err)?.into_owned(),
                _ => String::new(),
            };
            fragments.push(text);
        }
        let originals = fragments.clone();
        for (idx, sub) in map.iter().enumerate() {
            part_counts[idx] +=
                replace_across_fragments(&mut fragments, &sub.placeholder, &sub.value);
        }
        for (idx, slot) in group.iter().enumerate() {
            if fragments[idx] == originals[idx] {
                continue;
            }
            changed_any = true;
            let text = &fragments[idx];
            if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                ensure_space_preserved(&mut events[slot.elem]);
            }
            events[slot.text] = Event::Text(BytesText::new(text).into_owned());
        }
    }

    for (idx, sub) in map.iter().enumerate() {
        report.record(&sub.placeholder, part, part_counts[idx]);
    }

    if !changed_any {
        return Ok(None);
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    for ev in events {
        writer.write_event(ev).map_err(|e| DocumentError::Xml {
            part: part.to_string(),
            source: e.into(),
        })?;
    }
    Ok(Some(writer.into_inner().into_inner()))
}

fn ensure_space_preserved(event: &mut Event<'static>) {
    if let Event::Start(start) = event {
        let present = start.try_get_attribute("xml:space").ok().flatten().is_some();
        if !present {
            start.push_attribute(("xml:space", "preserve"));
        }
    }
}

/// Replaces every occurrence of `needle` in the concatenation of
/// `fragments`, redistributing each replacement back into the fragment
/// slots: the fragment where a match starts receives the replacement,
/// later fragments lose only the matched portion. Returns the number of
/// replacements made.
fn replace_across_fragments(fragments: &mut [String], needle: &str, replacement: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut search_from = 0;
    loop {
        let combined = fragments.concat();
        let start = match combined[search_from..].find(needle) {
            Some(rel) => search_from + rel,
            None => break,
        };

        // Locate the fragment containing the match start.
        let mut offset = 0;
        let mut i = 0;
        while offset + fragments[i].len() <= start {
            offset += fragments[i].len();
            i += 1;
        }
        let local_start = start - offset;

        let mut remaining = needle.len();
        let available = fragments[i].len() - local_start;
        let take = available.min(remaining);
        let first = &mut fragments[i];
        let mut rebuilt = String::with_capacity(first.len() + replacement.len());
        rebuilt.push_str(&first[..local_start]);
        rebuilt.push_str(replacement);
        rebuilt.push_str(&first[local_start + take..]);
        *first = rebuilt;
        remaining -= take;

        let mut j = i + 1;
        while remaining > 0 {
            let take = fragments[j].len().min(remaining);
            fragments[j].replace_range(..take, "");
            remaining -= take;
            j += 1;
        }

        count += 1;
        // Resume after the inserted replacement so a replacement that
        // contains the needle is not matched again.
        search_from = start + replacement.len();
    }
    count
}
