//! Paginated session report rendering
//!
//! Lays the loaded session out as a fixed-width, multi-page text document:
//! a centered header band, the candidate/date lines, a boxed session-info
//! panel, a column-aligned TIMINGS table with center-justified cells and
//! word-wrapped notes, a NOTES section, and a footer on every page.
//!
//! Rendering is pure: the report date is an explicit input, so identical
//! inputs yield byte-identical documents.

use chrono::NaiveDate;

use crate::format::{NOT_AVAILABLE, NO_NOTES};
use crate::model::SessionData;

/// Character width of a report page
pub const PAGE_WIDTH: usize = 78;

/// Content lines per page (excluding the 2-line footer)
pub const LINES_PER_PAGE: usize = 44;

/// Footer branding line, centered on every page
const FOOTER: &str = "TRIALOG CLINICAL RECORDS";

/// Table column widths: Block, Start, End, Notes
const COLUMNS: [usize; 4] = [10, 12, 12, 32];

/// A rendered multi-page document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pages: Vec<String>,
}

impl Document {
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenate all pages, separated by form feeds
    pub fn render(&self) -> String {
        self.pages.join("\u{0C}\n")
    }
}

/// Center a string within `width` columns
fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{}", " ".repeat(left), text)
}

/// Word-wrap text to `width`, hard-splitting words longer than a line
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        // Hard-split oversized words
        while word.chars().count() > width {
            let head: String = word.chars().take(width).collect();
            let tail: String = word.chars().skip(width).collect();
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(head);
            word = tail;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

fn table_border() -> String {
    let mut line = String::from("+");
    for width in COLUMNS {
        line.push_str(&"-".repeat(width));
        line.push('+');
    }
    line
}

/// One table row with each cell center-justified in its column
fn table_row(cells: [&str; 4]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(COLUMNS) {
        let centered = center(cell, width);
        line.push_str(&format!("{:<width$}", centered, width = width));
        line.push('|');
    }
    line
}

/// Rows for one block: the first row carries block/start/end, notes wrap
/// across continuation rows with the other cells left blank. Row-height
/// stepping stays consistent: one text line per row.
fn block_rows(index: usize, start: &str, end: &str, notes: &str) -> Vec<String> {
    let label = format!("Block {}", index + 1);
    let note_lines = wrap_text(notes, COLUMNS[3] - 2);
    let mut rows = Vec::with_capacity(note_lines.len());
    for (i, note_line) in note_lines.iter().enumerate() {
        if i == 0 {
            rows.push(table_row([&label, start, end, note_line]));
        } else {
            rows.push(table_row(["", "", "", note_line]));
        }
    }
    rows
}

/// Build the full content line list (unpaginated)
fn content_lines(session: &SessionData, report_date: NaiveDate) -> Vec<String> {
    let band = "=".repeat(PAGE_WIDTH);
    let mut lines = vec![
        band.clone(),
        center("CLINICAL SESSION REPORT", PAGE_WIDTH),
        band,
        String::new(),
        format!("Candidate: {}", session.candidate_name),
        format!("Date: {}", report_date.format("%Y-%m-%d")),
        String::new(),
    ];

    // Session information box
    let info = [
        format!("Session     : {:02}", session.session_number),
        format!("Session ID  : {}", or_na(&session.session_id)),
        format!("High (H)    : {}", or_na(&session.impedance_h)),
        format!("Low (L)     : {}", or_na(&session.impedance_l)),
    ];
    let box_width = info.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
    lines.push(format!("+{}+", "-".repeat(box_width)));
    for entry in &info {
        lines.push(format!("| {:<width$} |", entry, width = box_width - 2));
    }
    lines.push(format!("+{}+", "-".repeat(box_width)));
    lines.push(String::new());

    // TIMINGS table: only blocks with both times become rows; an empty
    // block list still renders the section header and column header
    lines.push("TIMINGS".to_string());
    lines.push(table_border());
    lines.push(table_row(["Block", "Start", "End", "Notes"]));
    lines.push(table_border());
    let mut had_rows = false;
    for (index, block) in session.blocks.iter().enumerate() {
        if block.is_completed() {
            let notes = if block.notes.is_empty() { NO_NOTES } else { &block.notes };
            lines.extend(block_rows(index, &block.start_time, &block.end_time, notes));
            had_rows = true;
        }
    }
    if had_rows {
        lines.push(table_border());
    }
    lines.push(String::new());

    // NOTES section lists every block
    lines.push("NOTES".to_string());
    for (index, block) in session.blocks.iter().enumerate() {
        let notes = if block.notes.is_empty() { NO_NOTES } else { &block.notes };
        let wrapped = wrap_text(notes, PAGE_WIDTH - 10);
        for (i, note_line) in wrapped.iter().enumerate() {
            if i == 0 {
                lines.push(format!("Block {}: {}", index + 1, note_line));
            } else {
                lines.push(format!("         {}", note_line));
            }
        }
    }

    lines
}

/// Render the session into a paginated document
pub fn generate_document(session: &SessionData, report_date: NaiveDate) -> Document {
    let lines = content_lines(session, report_date);
    let total_pages = lines.len().div_ceil(LINES_PER_PAGE).max(1);

    let mut pages = Vec::with_capacity(total_pages);
    for (page_index, chunk) in lines.chunks(LINES_PER_PAGE).enumerate() {
        let mut page = String::new();
        for line in chunk {
            page.push_str(line);
            page.push('\n');
        }
        // Pad to fixed page height so the footer lands at the same position
        for _ in chunk.len()..LINES_PER_PAGE {
            page.push('\n');
        }
        page.push_str(&center(FOOTER, PAGE_WIDTH));
        page.push('\n');
        page.push_str(&center(
            &format!("Page {} of {}", page_index + 1, total_pages),
            PAGE_WIDTH,
        ));
        page.push('\n');
        pages.push(page);
    }

    Document { pages }
}
