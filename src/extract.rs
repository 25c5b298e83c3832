// Turns checklist items of one document into standalone linked notes.
//
//   - [ ] Buy milk 📅 2023-08-09
// becomes
//   - [ ] [[Buy milk]] 📅 2023-08-09
// plus a new note `<folder>/Buy milk.md` pointing back at the source.
use crate::model::{CHECKLIST_PREFIX, MARKER};
use crate::storage::{DocumentHandle, DocumentSink, DocumentSource};
use anyhow::{Context, Result};
use std::collections::HashSet;

// Characters that are not allowed in note file names or break wiki links.
const FORBIDDEN_TITLE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub handle: DocumentHandle,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub notes: Vec<NewNote>,
    pub changed: bool,
}

/// Derives a note title from a checklist description.
///
/// Text from the first marker onwards is ignored; forbidden characters are
/// dropped and whitespace collapsed. Returns `None` if nothing usable is left.
pub fn note_title(description: &str) -> Option<String> {
    let head = match description.find(MARKER) {
        Some(i) => &description[..i],
        None => description,
    };
    let cleaned: String = head
        .chars()
        .filter(|c| !FORBIDDEN_TITLE_CHARS.contains(c))
        .collect();
    let title = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = title.trim_matches('.').to_string();
    if title.is_empty() { None } else { Some(title) }
}

fn note_content(title: &str, source: &str) -> String {
    format!("# {}\n\nSource: [[{}]]\n", title, source)
}

// `notes_folder` comes from the config and may be written with either
// separator.
fn folder_handle(folder: &str, title: &str) -> DocumentHandle {
    let folder = folder.replace('\\', "/");
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        DocumentHandle::new(format!("{}.md", title))
    } else {
        DocumentHandle::new(format!("{}/{}.md", folder, title))
    }
}

/// Splits `text` into lines keeping each line's terminator.
fn split_keep_ends(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split_inclusive('\n').map(|chunk| {
        let body = chunk.trim_end_matches(['\n', '\r']);
        (body, &chunk[body.len()..])
    })
}

/// Pure part of the extraction: computes the new source text and the notes
/// to create. `taken` holds note titles that must not be reused (existing
/// notes); duplicates inside the document get ` (2)`, ` (3)`, ... suffixes.
pub fn extract_notes(
    text: &str,
    source_name: &str,
    notes_folder: &str,
    taken: &dyn Fn(&DocumentHandle) -> bool,
) -> Extraction {
    let mut out = String::with_capacity(text.len());
    let mut notes = Vec::new();
    let mut used: HashSet<String> = HashSet::new();

    for (line, ending) in split_keep_ends(text) {
        let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        let (indent, rest) = line.split_at(indent_len);
        let Some(description) = rest.strip_prefix(CHECKLIST_PREFIX) else {
            out.push_str(line);
            out.push_str(ending);
            continue;
        };
        if description.trim_start().starts_with("[[") {
            out.push_str(line);
            out.push_str(ending);
            continue;
        }
        let Some(base) = note_title(description) else {
            out.push_str(line);
            out.push_str(ending);
            continue;
        };

        let mut title = base.clone();
        let mut n = 1;
        loop {
            let handle = folder_handle(notes_folder, &title);
            if !used.contains(&title.to_lowercase()) && !taken(&handle) {
                break;
            }
            n += 1;
            title = format!("{} ({})", base, n);
        }
        used.insert(title.to_lowercase());

        let tail = description
            .find(MARKER)
            .map(|i| description[i..].trim_end())
            .unwrap_or("");
        out.push_str(indent);
        out.push_str(CHECKLIST_PREFIX);
        out.push_str(&format!("[[{}]]", title));
        if !tail.is_empty() {
            out.push(' ');
            out.push_str(tail);
        }
        out.push_str(ending);

        notes.push(NewNote {
            handle: folder_handle(notes_folder, &title),
            content: note_content(&title, source_name),
            title,
        });
    }

    let changed = !notes.is_empty();
    Extraction {
        text: if changed { out } else { text.to_string() },
        notes,
        changed,
    }
}

/// Outcome of [`run_extract`].
#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    pub created: Vec<DocumentHandle>,
    pub source_updated: bool,
}

/// Extracts the checklist items of `handle` into notes and rewrites it with links.
///
/// Notes are written first; the source is only rewritten once every note
/// exists, so a failure never leaves dangling links.
pub fn run_extract<S, W>(
    source: &S,
    sink: &W,
    handle: &DocumentHandle,
    notes_folder: &str,
) -> Result<ExtractSummary>
where
    S: DocumentSource + ?Sized,
    W: DocumentSink + ?Sized,
{
    let text = source
        .read_text(handle)
        .with_context(|| format!("Cannot extract tasks from {}", handle))?;
    let extraction = extract_notes(&text, handle.note_name(), notes_folder, &|h: &DocumentHandle| {
        h == handle || source.exists(h)
    });

    let mut summary = ExtractSummary::default();
    if !extraction.changed {
        log::info!("No checklist items to extract in {}", handle);
        return Ok(summary);
    }

    for note in &extraction.notes {
        sink.write_text(&note.handle, &note.content)
            .with_context(|| format!("Failed to create note {}", note.handle))?;
        log::debug!("Created note {}", note.handle);
        summary.created.push(note.handle.clone());
    }

    sink.write_text(handle, &extraction.text)
        .with_context(|| format!("Failed to update {}", handle))?;
    summary.source_updated = true;
    log::info!(
        "Extracted {} task(s) from {} into {}",
        summary.created.len(),
        handle,
        notes_folder
    );
    Ok(summary)
}
