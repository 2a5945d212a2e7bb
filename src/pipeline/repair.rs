//! Response repair: recover structured key points and slides from LLM text.
//!
//! Models are asked for a JSON array but answer in every shape imaginable:
//! fenced or bare, an object instead of an array, an array wrapped in
//! `{"slides": [...]}`, JSON cut off at the token limit, or plain prose with
//! bullet points. Every shape is expected, so nothing here returns an error.
//!
//! ## Tiers
//!
//! ```text
//! Fenced ──▶ Structured ──▶ Lines ──▶ Exhausted
//!   │            │            │           │
//!   │            └─ items ────┴─ items ───┴─▶ placeholder
//!   └─ candidate text
//! ```
//!
//! 1. **Fenced**: take the interior of the first ```` ```json ```` fence, or
//!    of any fence, else the whole response.
//! 2. **Structured**: parse the candidate as JSON. Arrays are used as-is and
//!    objects are coerced one entry per record. When strict parsing fails the
//!    outermost bracketed span is tried, then every complete `{…}` object is
//!    salvaged from the (possibly truncated) text.
//! 3. **Lines**: key points only. Bullet or `Point` lines open a point and
//!    `key: value` lines attach fields to it.
//!
//! Whatever tier produced the values, each element is normalised into the
//! full record shape with defaults. The result carries a [`RepairOutcome`]
//! so callers can tell a clean parse from a degraded one.

use crate::model::{
    KeyPoint, SlideLayout, SlideRecord, DEFAULT_CATEGORY, DEFAULT_IMPORTANCE,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Content of the point returned when nothing could be recovered.
pub const UNANALYZABLE_POINT: &str = "The paper could not be properly analyzed.";
/// Subtitle of a synthesized title slide.
pub const TITLE_SLIDE_SUBTITLE: &str = "Academic Paper Presentation";
/// Speaker notes of a synthesized title slide.
pub const TITLE_SLIDE_NOTES: &str = "Introduction to the paper and its key contributions";

/// How a repaired result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    /// A JSON array (fenced, bare or wrapped) parsed cleanly.
    Parsed,
    /// Valid JSON of the wrong shape was coerced into records.
    Coerced,
    /// Complete objects were recovered from broken or truncated JSON.
    Salvaged,
    /// Records were read from prose lines.
    LineFallback,
    /// Nothing was recoverable; the result is a synthetic placeholder.
    Placeholder,
}

impl RepairOutcome {
    /// True whenever a fallback path was used.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RepairOutcome::Parsed)
    }
}

/// A repaired sequence: never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repaired<T> {
    pub items: Vec<T>,
    pub outcome: RepairOutcome,
}

impl<T> Repaired<T> {
    pub fn is_degraded(&self) -> bool {
        self.outcome.is_degraded()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Recover key points from a model response.
///
/// Always returns at least one point; a single `"error"` point with
/// importance 1 when nothing could be read.
pub fn repair_key_points(raw: &str) -> Repaired<KeyPoint> {
    match run_tiers::<KeyPoint>(raw) {
        Some((items, outcome)) => finish(items, outcome),
        None => finish(
            vec![KeyPoint {
                content: UNANALYZABLE_POINT.to_string(),
                category: "error".to_string(),
                importance: 1,
                source_section: None,
            }],
            RepairOutcome::Placeholder,
        ),
    }
}

/// Recover slides from a model response.
///
/// The deck always holds exactly one title-layout slide. If no slide
/// qualifies (layout `title`, or "title" in its heading) one is prepended
/// using `fallback_title` verbatim.
pub fn repair_slide_content(raw: &str, fallback_title: &str) -> Repaired<SlideRecord> {
    let (mut slides, outcome) =
        run_tiers::<SlideRecord>(raw).unwrap_or((Vec::new(), RepairOutcome::Placeholder));
    if ensure_title_slide(&mut slides, fallback_title) {
        debug!("No title slide in model output; synthesized one");
    }
    finish(slides, outcome)
}

/// The synthesized first slide of a deck.
pub fn title_slide(title: &str) -> SlideRecord {
    SlideRecord {
        title: title.to_string(),
        content: vec![TITLE_SLIDE_SUBTITLE.to_string()],
        notes: Some(TITLE_SLIDE_NOTES.to_string()),
        layout: SlideLayout::Title,
    }
}

/// Make the first qualifying slide the only title-layout slide, prepending
/// one when none qualifies. Returns whether a slide was prepended.
pub fn ensure_title_slide(slides: &mut Vec<SlideRecord>, fallback_title: &str) -> bool {
    match slides.iter().position(SlideRecord::qualifies_as_title) {
        Some(first) => {
            for (i, slide) in slides.iter_mut().enumerate() {
                slide.layout = if i == first {
                    SlideLayout::Title
                } else {
                    SlideLayout::Content
                };
            }
            false
        }
        None => {
            for slide in slides.iter_mut() {
                slide.layout = SlideLayout::Content;
            }
            slides.insert(0, title_slide(fallback_title));
            true
        }
    }
}

fn finish<T>(items: Vec<T>, outcome: RepairOutcome) -> Repaired<T> {
    if outcome.is_degraded() {
        warn!("Model response repaired via {:?} ({} items)", outcome, items.len());
    }
    Repaired { items, outcome }
}

// ── Tier state machine ───────────────────────────────────────────────────────

enum Tier {
    Fenced,
    Structured(String),
    Lines,
    Exhausted,
}

fn run_tiers<T: Repairable>(raw: &str) -> Option<(Vec<T>, RepairOutcome)> {
    let mut tier = Tier::Fenced;
    loop {
        tier = match tier {
            Tier::Fenced => {
                let candidate = fenced_block(raw).unwrap_or(raw).trim().to_string();
                Tier::Structured(candidate)
            }
            Tier::Structured(candidate) => match parse_structured::<T>(&candidate) {
                Some((items, outcome)) if !items.is_empty() => return Some((items, outcome)),
                _ => Tier::Lines,
            },
            Tier::Lines => {
                let items = T::from_lines(raw);
                if !items.is_empty() {
                    return Some((items, RepairOutcome::LineFallback));
                }
                Tier::Exhausted
            }
            Tier::Exhausted => return None,
        };
    }
}

// ── Tier 1: fenced blocks ────────────────────────────────────────────────────

/// Interior of the first json-marked fence, else of the first fence.
///
/// An unterminated fence runs to the end of the text (truncated output).
pub fn fenced_block(raw: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets identical.
    let lower = raw.to_ascii_lowercase();
    let (open, marker_len) = match lower.find("```json") {
        Some(i) => (i, "```json".len()),
        None => (raw.find("```")?, "```".len()),
    };
    let rest = &raw[open + marker_len..];
    let body = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(strip_info_string(body).trim())
}

fn strip_info_string(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, tail)) if is_info_string(first) => tail,
        _ => body,
    }
}

fn is_info_string(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

// ── Tier 2: structured parse ─────────────────────────────────────────────────

fn parse_structured<T: Repairable>(candidate: &str) -> Option<(Vec<T>, RepairOutcome)> {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(records_from_value(value));
    }
    if let Some(value) = bracketed_span(candidate) {
        return Some(records_from_value(value));
    }
    let mut objects = salvage_objects(candidate);
    if objects.is_empty() {
        // A truncated wrapper object hides its records one level deeper.
        if let Some(i) = candidate.find('[').filter(|&i| i > 0) {
            objects = salvage_objects(&candidate[i..]);
        }
    }
    if objects.is_empty() {
        return None;
    }
    let items = objects
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| T::from_element(v, i))
        .collect();
    Some((items, RepairOutcome::Salvaged))
}

fn records_from_value<T: Repairable>(value: Value) -> (Vec<T>, RepairOutcome) {
    match value {
        Value::Array(items) => (
            items
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| T::from_element(v, i))
                .collect(),
            RepairOutcome::Parsed,
        ),
        Value::Object(map) => match unwrap_wrapper(map, T::WRAPPER_KEYS) {
            Ok(items) => records_from_value(Value::Array(items)),
            Err(map) => (
                map.into_iter()
                    .enumerate()
                    .filter_map(|(i, (k, v))| T::from_entry(k, v, i))
                    .collect(),
                RepairOutcome::Coerced,
            ),
        },
        Value::Null => (Vec::new(), RepairOutcome::Coerced),
        Value::String(s) if s.trim().is_empty() => (Vec::new(), RepairOutcome::Coerced),
        scalar => (
            T::from_element(scalar, 0).into_iter().collect(),
            RepairOutcome::Coerced,
        ),
    }
}

/// `{"slides": [...]}` → the inner array, when the single key is a known wrapper.
fn unwrap_wrapper(
    mut map: Map<String, Value>,
    wrapper_keys: &[&str],
) -> Result<Vec<Value>, Map<String, Value>> {
    let key = match map.keys().next() {
        Some(k) if map.len() == 1 && wrapper_keys.contains(&k.to_lowercase().as_str()) => {
            k.clone()
        }
        _ => return Err(map),
    };
    match map.remove(&key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => {
            map.insert(key, other);
            Err(map)
        }
        None => Err(map),
    }
}

/// Parse the span from the first `[`/`{` to the last matching closer, for JSON
/// embedded in prose. Rejected unless it holds something record-like.
fn bracketed_span(text: &str) -> Option<Value> {
    let start = text.find(['[', '{'])?;
    let closer = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(closer)?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let record_like = match &value {
        Value::Object(_) => true,
        Value::Array(items) => items
            .iter()
            .any(|v| matches!(v, Value::Object(_) | Value::String(_))),
        _ => false,
    };
    record_like.then_some(value)
}

/// Every complete `{…}` object that parses, scanning with string awareness.
///
/// Top-level objects and objects directly inside a top-level array are
/// collected; an object cut off by truncation is skipped.
fn salvage_objects(text: &str) -> Vec<Value> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut object_start: Option<(usize, usize)> = None;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => {
                if c == '{' && object_start.is_none() && depth <= 1 {
                    object_start = Some((i, depth));
                }
                depth += 1;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if let Some((start, open_depth)) = object_start {
                    if c == '}' && depth == open_depth {
                        if let Ok(v) = serde_json::from_str::<Value>(&text[start..=i]) {
                            found.push(v);
                        }
                        object_start = None;
                    }
                }
            }
            _ => {}
        }
    }
    found
}

// ── Normalisation ────────────────────────────────────────────────────────────

/// A record shape the repair engine can produce.
trait Repairable: Sized {
    /// Single keys whose array value is the real payload.
    const WRAPPER_KEYS: &'static [&'static str];

    /// Build a record from one array element (`index` is 0-based).
    fn from_element(value: Value, index: usize) -> Option<Self>;

    /// Build a record from one entry of a top-level object.
    fn from_entry(key: String, value: Value, index: usize) -> Option<Self>;

    /// Line-oriented fallback; most shapes have none.
    fn from_lines(_raw: &str) -> Vec<Self> {
        Vec::new()
    }
}

/// Render a JSON value as display text. Arrays of scalars are joined.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// Key-point content: strings verbatim, anything else as [`value_text`].
fn point_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => value_text(other),
    }
}

/// First non-blank text among `keys`.
fn field_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .map(value_text)
        .find(|s| !s.is_empty())
}

/// Integer before any `/`, clamped to 1–10.
pub fn parse_importance(text: &str) -> Option<u8> {
    let head = text.split('/').next()?.trim();
    head.parse::<i64>().ok().map(clamp_importance)
}

fn clamp_importance(n: i64) -> u8 {
    n.clamp(1, 10) as u8
}

fn importance_of(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| clamp_importance(f.round() as i64)),
        Value::String(s) => parse_importance(s),
        _ => None,
    }
}

const CONTENT_KEYS: &[&str] = &[
    "content",
    "point",
    "key_point",
    "text",
    "description",
    "summary",
    "finding",
];
const CATEGORY_KEYS: &[&str] = &["category", "type", "topic"];
const IMPORTANCE_KEYS: &[&str] = &["importance", "score", "weight"];
const SOURCE_KEYS: &[&str] = &["source_section", "section", "source", "from"];

impl Repairable for KeyPoint {
    const WRAPPER_KEYS: &'static [&'static str] =
        &["key_points", "keypoints", "points", "items", "results"];

    fn from_element(value: Value, _index: usize) -> Option<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                // Every scalar keeps its slot; blanks and `null` become their JSON text.
                let text = point_text(&other);
                let content = if text.trim().is_empty() {
                    other.to_string()
                } else {
                    text
                };
                return Some(KeyPoint::new(content));
            }
        };
        let content = CONTENT_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .map(point_text)
            .find(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                // No recognised content field: keep the whole record as text.
                Value::Object(map.clone()).to_string()
            });
        Some(KeyPoint {
            content,
            category: field_text(&map, CATEGORY_KEYS)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            importance: IMPORTANCE_KEYS
                .iter()
                .filter_map(|k| map.get(*k))
                .find_map(importance_of)
                .unwrap_or(DEFAULT_IMPORTANCE),
            source_section: field_text(&map, SOURCE_KEYS),
        })
    }

    fn from_entry(key: String, value: Value, _index: usize) -> Option<Self> {
        let content = point_text(&value);
        if content.trim().is_empty() {
            return None;
        }
        Some(KeyPoint {
            category: key,
            ..KeyPoint::new(content)
        })
    }

    fn from_lines(raw: &str) -> Vec<Self> {
        parse_key_point_lines(raw)
    }
}

const TITLE_KEYS: &[&str] = &["title", "heading", "slide_title", "name"];
const BULLET_KEYS: &[&str] = &["content", "bullets", "bullet_points", "points", "body", "text"];
const NOTES_KEYS: &[&str] = &["notes", "speaker_notes", "note"];

impl Repairable for SlideRecord {
    const WRAPPER_KEYS: &'static [&'static str] = &["slides", "deck", "presentation"];

    fn from_element(value: Value, index: usize) -> Option<Self> {
        let map = match value {
            Value::Object(map) => map,
            Value::String(s) if !s.trim().is_empty() => {
                return Some(SlideRecord::content(s.trim(), Vec::new()))
            }
            _ => return None,
        };
        let title =
            field_text(&map, TITLE_KEYS).unwrap_or_else(|| format!("Slide {}", index + 1));
        let content = BULLET_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .map(bullets)
            .unwrap_or_default();
        let layout = match field_text(&map, &["layout", "type"]) {
            Some(l) if is_title_layout(&l) => SlideLayout::Title,
            _ => SlideLayout::Content,
        };
        Some(SlideRecord {
            title,
            content,
            notes: field_text(&map, NOTES_KEYS),
            layout,
        })
    }

    fn from_entry(key: String, value: Value, index: usize) -> Option<Self> {
        match value {
            Value::Object(mut map) => {
                if field_text(&map, TITLE_KEYS).is_none() {
                    map.insert("title".to_string(), Value::String(key));
                }
                Self::from_element(Value::Object(map), index)
            }
            other => {
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some(SlideRecord::content(key, bullets(&other)))
            }
        }
    }
}

fn is_title_layout(layout: &str) -> bool {
    matches!(
        layout.trim().to_lowercase().replace(['-', ' '], "_").as_str(),
        "title" | "title_slide"
    )
}

/// Slide body as bullet strings.
fn bullets(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => field_text(map, &["text", "content", "point", "title"])
                    .unwrap_or_else(|| item.to_string()),
                other => value_text(other),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(|l| strip_bullet(l.trim()).unwrap_or(l.trim()))
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        other => vec![other.to_string()],
    }
}

// ── Tier 3: line-oriented key points ─────────────────────────────────────────

static RE_POINT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Key\s+)?Point\b\s*\d*\s*[:.)\-]?\s*(.*)$").unwrap());
static RE_NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}[.)]\s+(.*)$").unwrap());

fn strip_bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "• "]
        .iter()
        .find_map(|m| line.strip_prefix(m))
        .map(str::trim)
}

/// Text after a point-opening marker, if the line starts a new point.
fn point_marker(line: &str) -> Option<&str> {
    if let Some(rest) = strip_bullet(line) {
        return Some(rest);
    }
    [&*RE_POINT_PREFIX, &*RE_NUMBERED_ITEM]
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// A recognised `key: value` field line.
enum Field<'a> {
    Content(&'a str),
    Category(&'a str),
    Importance(&'a str),
    Source(&'a str),
}

fn parse_field(line: &str) -> Option<Field<'_>> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().trim_matches('*').trim().to_lowercase();
    let value = value.trim().trim_matches('*').trim();
    match key.as_str() {
        "content" | "point" | "description" | "text" => Some(Field::Content(value)),
        "category" | "type" | "topic" => Some(Field::Category(value)),
        "importance" | "score" | "weight" => Some(Field::Importance(value)),
        "section" | "source" | "from" | "source section" | "source_section" => {
            Some(Field::Source(value))
        }
        _ => None,
    }
}

/// A point under construction in the line parser.
#[derive(Default)]
struct OpenPoint {
    content: String,
    category: Option<String>,
    importance: Option<u8>,
    source_section: Option<String>,
}

impl OpenPoint {
    fn apply(&mut self, field: Field<'_>) {
        match field {
            Field::Content(v) if self.content.is_empty() => self.content = v.to_string(),
            Field::Content(_) => {}
            Field::Category(v) if !v.is_empty() => self.category = Some(v.to_string()),
            Field::Category(_) => {}
            Field::Importance(v) => {
                self.importance = Some(parse_importance(v).unwrap_or(DEFAULT_IMPORTANCE))
            }
            Field::Source(v) if !v.is_empty() => self.source_section = Some(v.to_string()),
            Field::Source(_) => {}
        }
    }

    fn close(self) -> Option<KeyPoint> {
        if self.content.is_empty() {
            return None;
        }
        Some(KeyPoint {
            content: self.content,
            category: self.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            importance: self.importance.unwrap_or(DEFAULT_IMPORTANCE),
            source_section: self.source_section,
        })
    }
}

fn parse_key_point_lines(raw: &str) -> Vec<KeyPoint> {
    let mut points = Vec::new();
    let mut open: Option<OpenPoint> = None;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("```") {
            continue;
        }

        if let Some(rest) = point_marker(line) {
            // "- category: x" under an open point is a field, not a new point.
            if let (Some(point), Some(field)) = (open.as_mut(), parse_field(rest)) {
                point.apply(field);
                continue;
            }
            if let Some(done) = open.take().and_then(OpenPoint::close) {
                points.push(done);
            }
            open = Some(OpenPoint {
                content: rest.to_string(),
                ..OpenPoint::default()
            });
            continue;
        }

        if let (Some(point), Some(field)) = (open.as_mut(), parse_field(line)) {
            point.apply(field);
        }
    }

    if let Some(done) = open.and_then(OpenPoint::close) {
        points.push(done);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Key points ───────────────────────────────────────────────────────

    #[test]
    fn fenced_json_array_round_trips() {
        let raw = "Here you go:\n```json\n[\n {\"content\": \"A\", \"category\": \"finding\", \"importance\": 9, \"source_section\": \"Results\"},\n {\"content\": \"B\", \"category\": \"method\", \"importance\": 4}\n]\n```\nHope this helps.";
        let r = repair_key_points(raw);
        assert_eq!(r.outcome, RepairOutcome::Parsed);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].content, "A");
        assert_eq!(r.items[0].importance, 9);
        assert_eq!(r.items[0].source_section.as_deref(), Some("Results"));
        assert_eq!(r.items[1].content, "B");
        assert_eq!(r.items[1].source_section, None);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let r = repair_key_points(r#"[{"content": "X"}, "bare string", 42, {"point": "Y"}]"#);
        assert_eq!(r.items.len(), 4);
        assert_eq!(r.items[0].category, "general");
        assert_eq!(r.items[0].importance, 5);
        assert_eq!(r.items[1].content, "bare string");
        assert_eq!(r.items[2].content, "42");
        assert_eq!(r.items[3].content, "Y");
    }

    #[test]
    fn list_elements_keep_their_slot_and_text() {
        let r = repair_key_points(r#"["A", null, "", "B"]"#);
        let contents: Vec<&str> = r.items.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, ["A", "null", "\"\"", "B"]);
        assert!(r.items.iter().all(|p| p.category == "general" && p.importance == 5));

        let r = repair_key_points("```json\n[{\"content\": \"  padded point  \"}, null]\n```");
        assert_eq!(r.outcome, RepairOutcome::Parsed);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].content, "  padded point  ");
        assert_eq!(r.items[1].content, "null");
    }

    #[test]
    fn content_synthesized_from_whole_record() {
        let r = repair_key_points(r#"[{"category": "odd", "importance": 7}]"#);
        assert_eq!(r.items.len(), 1);
        assert!(r.items[0].content.contains("odd"));
        assert_eq!(r.items[0].category, "odd");
        assert_eq!(r.items[0].importance, 7);
    }

    #[test]
    fn importance_is_clamped_and_parsed() {
        let r = repair_key_points(
            r#"[{"content": "a", "importance": 15}, {"content": "b", "importance": "3/10"}, {"content": "c", "importance": "high"}, {"content": "d", "importance": 7.6}]"#,
        );
        let imp: Vec<u8> = r.items.iter().map(|p| p.importance).collect();
        assert_eq!(imp, [10, 3, 5, 8]);
    }

    #[test]
    fn mapping_is_coerced_per_entry() {
        let r = repair_key_points(r#"{"methodology": "Uses X", "limitation": "Small data"}"#);
        assert_eq!(r.outcome, RepairOutcome::Coerced);
        assert!(r.is_degraded());
        assert_eq!(r.items.len(), 2);
        let m = r.items.iter().find(|p| p.category == "methodology").unwrap();
        assert_eq!(m.content, "Uses X");
        assert_eq!(m.importance, 5);
    }

    #[test]
    fn wrapper_object_is_unwrapped() {
        let r = repair_key_points(r#"{"key_points": [{"content": "A"}, {"content": "B"}]}"#);
        assert_eq!(r.outcome, RepairOutcome::Parsed);
        assert_eq!(r.items.len(), 2);
    }

    #[test]
    fn line_fallback_reads_fields() {
        let r = repair_key_points("- Finding A\ncategory: methodology\nimportance: 8/10");
        assert_eq!(r.outcome, RepairOutcome::LineFallback);
        assert_eq!(r.items.len(), 1);
        assert_eq!(r.items[0].content, "Finding A");
        assert_eq!(r.items[0].category, "methodology");
        assert_eq!(r.items[0].importance, 8);
    }

    #[test]
    fn line_fallback_handles_point_prefixes_and_aliases() {
        let raw = "Key Point 1: Transformers scale\nType: finding\nScore: nine\nSection: Results\n\nPoint 2: Attention is cheap\nfrom: Method";
        let r = repair_key_points(raw);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].content, "Transformers scale");
        assert_eq!(r.items[0].category, "finding");
        assert_eq!(r.items[0].importance, 5);
        assert_eq!(r.items[0].source_section.as_deref(), Some("Results"));
        assert_eq!(r.items[1].content, "Attention is cheap");
        assert_eq!(r.items[1].source_section.as_deref(), Some("Method"));
    }

    #[test]
    fn bulleted_fields_attach_to_open_point() {
        let raw = "1. Finding A\n   - Category: results\n   - Importance: 9\n2. Finding B";
        let r = repair_key_points(raw);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].category, "results");
        assert_eq!(r.items[0].importance, 9);
        assert_eq!(r.items[1].content, "Finding B");
    }

    #[test]
    fn never_empty_for_any_input() {
        for raw in ["", "   ", "Just prose without any structure.", "[{\"content\": \"tru", "{", "```json\n```", "[]", "null"] {
            let r = repair_key_points(raw);
            assert!(!r.items.is_empty(), "empty for {raw:?}");
            assert!(r.items.iter().all(|p| !p.content.is_empty()), "blank content for {raw:?}");
        }
    }

    #[test]
    fn unparseable_gives_single_error_point() {
        let r = repair_key_points("I cannot help with that.");
        assert_eq!(r.outcome, RepairOutcome::Placeholder);
        assert_eq!(r.items.len(), 1);
        assert_eq!(r.items[0].content, UNANALYZABLE_POINT);
        assert_eq!(r.items[0].category, "error");
        assert_eq!(r.items[0].importance, 1);
    }

    #[test]
    fn truncated_array_salvages_complete_objects() {
        let raw = "```json\n[{\"content\": \"A\", \"importance\": 8}, {\"content\": \"B {with brace}\"}, {\"content\": \"C";
        let r = repair_key_points(raw);
        assert_eq!(r.outcome, RepairOutcome::Salvaged);
        let contents: Vec<&str> = r.items.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, ["A", "B {with brace}"]);
    }

    #[test]
    fn json_embedded_in_prose_is_found() {
        let raw = "Sure! [{\"content\": \"A\"}] Let me know.";
        let r = repair_key_points(raw);
        assert_eq!(r.items.len(), 1);
        assert_eq!(r.items[0].content, "A");
    }

    #[test]
    fn citation_brackets_are_not_json() {
        let r = repair_key_points("- Results hold [1]\nimportance: 6");
        assert_eq!(r.outcome, RepairOutcome::LineFallback);
        assert_eq!(r.items[0].content, "Results hold [1]");
        assert_eq!(r.items[0].importance, 6);
    }

    // ── Fences ───────────────────────────────────────────────────────────

    #[test]
    fn fence_extraction() {
        assert_eq!(fenced_block("a\n```json\n[1]\n```\nb"), Some("[1]"));
        assert_eq!(fenced_block("```JSON\n[2]\n```"), Some("[2]"));
        assert_eq!(fenced_block("```python\n[3]\n```"), Some("[3]"));
        assert_eq!(fenced_block("```[4]```"), Some("[4]"));
        assert_eq!(fenced_block("```json\n[5, 6"), Some("[5, 6"));
        assert_eq!(fenced_block("no fences"), None);
    }

    #[test]
    fn json_fence_preferred_over_earlier_fence() {
        let raw = "```text\nnot this\n```\n```json\n[{\"content\": \"this\"}]\n```";
        let r = repair_key_points(raw);
        assert_eq!(r.items[0].content, "this");
    }

    // ── Slides ───────────────────────────────────────────────────────────

    #[test]
    fn slides_with_title_slide_are_kept() {
        let raw = r#"```json
[
  {"title": "Attention Is All You Need", "content": ["Vaswani et al."], "notes": null, "layout": "title"},
  {"title": "Method", "content": ["Self-attention", "No recurrence"], "notes": "Explain QKV", "layout": "content"}
]
```"#;
        let r = repair_slide_content(raw, "Fallback");
        assert_eq!(r.outcome, RepairOutcome::Parsed);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].layout, SlideLayout::Title);
        assert_eq!(r.items[1].content, ["Self-attention", "No recurrence"]);
        assert_eq!(r.items[1].notes.as_deref(), Some("Explain QKV"));
    }

    #[test]
    fn missing_title_slide_is_prepended_verbatim() {
        let raw = r#"[{"title": "Method", "content": ["a"]}, {"title": "Results", "content": "- x\n- y"}]"#;
        let r = repair_slide_content(raw, "  My Paper: A Study ");
        assert_eq!(r.items.len(), 3);
        assert_eq!(r.items[0].title, "  My Paper: A Study ");
        assert_eq!(r.items[0].layout, SlideLayout::Title);
        assert_eq!(r.items[0].content, [TITLE_SLIDE_SUBTITLE]);
        assert_eq!(r.items[2].content, ["x", "y"]);
    }

    #[test]
    fn title_in_heading_qualifies_and_is_promoted() {
        let raw = r#"[{"title": "Title: Deep Nets", "content": []}, {"title": "Body", "content": ["b"], "layout": "title"}]"#;
        let r = repair_slide_content(raw, "Fallback");
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].layout, SlideLayout::Title);
        assert_eq!(r.items[1].layout, SlideLayout::Content);
    }

    #[test]
    fn exactly_one_title_layout_slide() {
        let raw = r#"[{"title": "A", "layout": "title"}, {"title": "B", "layout": "Title"}, {"title": "C"}]"#;
        let r = repair_slide_content(raw, "F");
        let titles = r.items.iter().filter(|s| s.layout == SlideLayout::Title).count();
        assert_eq!(titles, 1);
        assert_eq!(r.items[0].title, "A");
    }

    #[test]
    fn slide_mapping_is_coerced() {
        let raw = r#"{"Introduction": ["why", "what"], "Slide 2": {"content": ["nested"], "notes": "n"}}"#;
        let r = repair_slide_content(raw, "Paper");
        assert_eq!(r.outcome, RepairOutcome::Coerced);
        assert_eq!(r.items[0].title, "Paper");
        let intro = r.items.iter().find(|s| s.title == "Introduction").unwrap();
        assert_eq!(intro.content, ["why", "what"]);
        let nested = r.items.iter().find(|s| s.title == "Slide 2").unwrap();
        assert_eq!(nested.content, ["nested"]);
        assert_eq!(nested.notes.as_deref(), Some("n"));
    }

    #[test]
    fn slides_wrapper_is_unwrapped() {
        let raw = r#"{"slides": [{"title": "Overview", "bullets": ["a"]}]}"#;
        let r = repair_slide_content(raw, "Paper");
        assert_eq!(r.outcome, RepairOutcome::Parsed);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[1].content, ["a"]);
    }

    #[test]
    fn unparseable_slides_give_title_slide_only() {
        for raw in ["", "Sorry, I can't do that.", "[", "42"] {
            let r = repair_slide_content(raw, "The Paper");
            assert_eq!(r.items.len(), 1, "for {raw:?}");
            assert_eq!(r.items[0].title, "The Paper");
            assert_eq!(r.items[0].layout, SlideLayout::Title);
            assert!(r.is_degraded());
        }
    }

    #[test]
    fn untitled_slides_are_numbered() {
        let r = repair_slide_content(r#"[{"content": ["x"]}, {"content": ["y"]}]"#, "P");
        assert_eq!(r.items[1].title, "Slide 1");
        assert_eq!(r.items[2].title, "Slide 2");
    }

    #[test]
    fn truncated_slides_are_salvaged() {
        let raw = "[{\"title\": \"Intro\", \"content\": [\"a\"]}, {\"title\": \"Meth";
        let r = repair_slide_content(raw, "P");
        assert_eq!(r.outcome, RepairOutcome::Salvaged);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[1].title, "Intro");
    }

    #[test]
    fn parse_importance_rules() {
        assert_eq!(parse_importance("8/10"), Some(8));
        assert_eq!(parse_importance(" 7 "), Some(7));
        assert_eq!(parse_importance("0"), Some(1));
        assert_eq!(parse_importance("8.5"), None);
        assert_eq!(parse_importance(""), None);
    }
}
