//! Task line marker codec.
//!
//! A workflow task is an ordinary checkbox list item whose trailing text
//! carries the workflow markers:
//!
//! ```text
//! - [ ] Ship release #workflow/release
//!     - [x] Review [stage::review]
//!         - [ ] Review (Draft) [stage::review] [substage::draft] [due::2024-05-01]
//! ```
//!
//! The legacy dotted form `[stage::review.draft]` is read as stage `review`
//! with sub-stage `draft`. Write paths only touch the checkbox symbol and the
//! codec's own `[stage::…]`/`[substage::…]` tokens; any other bracketed
//! tokens, links and tags stay exactly where they are.

use once_cell::sync::Lazy;
use regex::Regex;

static TASK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)([-*+]|\d+[.)])\s+\[(.)\]").expect("valid task regex"));

static WORKFLOW_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#workflow/([^/\s\[\]]+)").expect("valid workflow tag regex"));

static STAGE_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[stage::([^\]]+)\]").expect("valid stage marker regex"));

static SUB_STAGE_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[substage::([^\]]+)\]").expect("valid sub-stage marker regex"));

static OWN_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t]*\[(?:stage|substage)::[^\]]*\]").expect("valid marker token regex")
});

/// Separator of the legacy `[stage::<stage>.<sub-stage>]` form.
const LEGACY_SEPARATOR: char = '.';

/// Workflow markers decoded from a task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Leading whitespace
    pub indentation: String,

    /// Symbol inside the checkbox
    pub status: char,

    /// Byte offset of the status symbol in the line
    pub status_offset: usize,

    /// Workflow id from a `#workflow/<id>` tag
    pub workflow_id: Option<String>,

    /// Stage id from `[stage::<id>]`
    pub stage_id: Option<String>,

    /// Sub-stage id from `[substage::<id>]` or the legacy dotted form
    pub sub_stage_id: Option<String>,
}

impl Markers {
    /// Check if the line carries any workflow marker.
    pub fn has_workflow_markers(&self) -> bool {
        self.workflow_id.is_some() || self.stage_id.is_some() || self.sub_stage_id.is_some()
    }

    /// A root task carries a workflow tag but no stage or sub-stage marker.
    pub fn is_root(&self) -> bool {
        self.workflow_id.is_some() && self.stage_id.is_none() && self.sub_stage_id.is_none()
    }
}

/// Decode the markers of a task line.
///
/// Returns `None` if the line is not a checkbox task.
pub fn extract_markers(line: &str) -> Option<Markers> {
    let caps = TASK_REGEX.captures(line)?;
    let status_match = caps.get(3)?;
    let status = status_match.as_str().chars().next()?;

    let workflow_id = WORKFLOW_TAG_REGEX.captures(line).map(|c| c[1].to_string());

    let (mut stage_id, mut sub_stage_id) = (None, None);
    if let Some(c) = STAGE_MARKER_REGEX.captures(line) {
        let value = c[1].trim();
        match value.split_once(LEGACY_SEPARATOR) {
            Some((stage, sub_stage)) => {
                stage_id = Some(stage.to_string());
                sub_stage_id = Some(sub_stage.to_string());
            }
            None => stage_id = Some(value.to_string()),
        }
    }
    if let Some(c) = SUB_STAGE_MARKER_REGEX.captures(line) {
        sub_stage_id = Some(c[1].trim().to_string());
    }

    Some(Markers {
        indentation: caps[1].to_string(),
        status,
        status_offset: status_match.start(),
        workflow_id,
        stage_id: stage_id.filter(|s| !s.is_empty()),
        sub_stage_id: sub_stage_id.filter(|s| !s.is_empty()),
    })
}

/// Render the marker suffix for a stage and optional sub-stage.
pub fn render_markers(stage_id: Option<&str>, sub_stage_id: Option<&str>) -> String {
    match (stage_id, sub_stage_id) {
        (Some(stage), Some(sub_stage)) => format!("[stage::{stage}] [substage::{sub_stage}]"),
        (Some(stage), None) => format!("[stage::{stage}]"),
        (None, Some(sub_stage)) => format!("[substage::{sub_stage}]"),
        (None, None) => String::new(),
    }
}

/// Render a `#workflow/<id>` tag.
pub fn render_workflow_tag(workflow_id: &str) -> String {
    format!("#workflow/{workflow_id}")
}

/// Check if `id` can be written into a stage or sub-stage marker and read
/// back unchanged.
///
/// The legacy separator, whitespace and square brackets are rejected.
pub fn is_valid_marker_id(id: &str) -> bool {
    !id.is_empty()
        && !id.chars().any(|c| c == LEGACY_SEPARATOR || c == '[' || c == ']' || c.is_whitespace())
}

/// Check if a line is a checkbox task.
pub fn is_task_line(line: &str) -> bool {
    TASK_REGEX.is_match(line)
}

/// Leading whitespace of a line.
pub fn indentation(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Indentation width in characters.
pub fn indent_width(line: &str) -> usize {
    indentation(line).chars().count()
}

/// Replace the checkbox symbol of a task line.
///
/// Returns `None` if the line is not a checkbox task.
pub fn set_status(line: &str, symbol: char) -> Option<String> {
    let markers = extract_markers(line)?;
    let end = markers.status_offset + markers.status.len_utf8();
    let mut updated = String::with_capacity(line.len() + symbol.len_utf8());
    updated.push_str(&line[..markers.status_offset]);
    updated.push(symbol);
    updated.push_str(&line[end..]);
    Some(updated)
}

/// Replace the line's stage/sub-stage markers.
///
/// The new markers take the position of the first existing marker token, or
/// are appended when the line had none. Passing `None` for both removes the
/// markers.
pub fn replace_markers(line: &str, stage_id: Option<&str>, sub_stage_id: Option<&str>) -> String {
    let anchor = OWN_TOKEN_REGEX.find(line).map(|m| m.start());
    let mut updated = OWN_TOKEN_REGEX.replace_all(line, "").into_owned();
    let rendered = render_markers(stage_id, sub_stage_id);

    if !rendered.is_empty() {
        let at = anchor.unwrap_or_else(|| {
            let trimmed = updated.trim_end().len();
            updated.truncate(trimmed);
            trimmed
        });
        updated.insert_str(at, &format!(" {rendered}"));
    }

    updated
}

/// Remove the stage/sub-stage markers from a line.
pub fn strip_markers(line: &str) -> String {
    replace_markers(line, None, None)
}

/// Byte offset of the first stage/sub-stage marker token, including the
/// whitespace before it.
pub fn marker_offset(line: &str) -> Option<usize> {
    OWN_TOKEN_REGEX.find(line).map(|m| m.start())
}
