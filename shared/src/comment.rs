//! Timeline comments. Comments are a separate entity from canvas annotations;
//! a comment may carry a snapshot of the annotation set that was on the canvas
//! when it was written.

use std::cmp::Ordering;
use std::fmt;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::media::FRAMES_PER_SECOND;

/// Spatial pins show while playback is within this many seconds of the comment.
pub const SPATIAL_WINDOW_SECS: f64 = 2.0;
pub const DEFAULT_AUTHOR: &str = "You";

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CommentId(u64);

impl CommentId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    #[default]
    General,
    Issue,
    Praise,
    Question,
    Replacement,
    Text,
    Drawing,
}

const MARKER_COLORS: [(CommentKind, &str); 3] = [
    (CommentKind::Drawing, "#fbbf24"),
    (CommentKind::Replacement, "#22d3ee"),
    (CommentKind::Text, "#f472b6"),
];
const DEFAULT_MARKER_COLOR: &str = "#4ade80";

impl CommentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentKind::General => "general",
            CommentKind::Issue => "issue",
            CommentKind::Praise => "praise",
            CommentKind::Question => "question",
            CommentKind::Replacement => "replacement",
            CommentKind::Text => "text",
            CommentKind::Drawing => "drawing",
        }
    }

    /// Timeline marker color.
    pub fn marker_color(self) -> &'static str {
        MARKER_COLORS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, color)| *color)
            .unwrap_or(DEFAULT_MARKER_COLOR)
    }

    /// Kind of a comment submitted without an explicit one.
    pub fn for_submission(has_link: bool, has_annotations: bool) -> Self {
        if has_link {
            CommentKind::Replacement
        } else if has_annotations {
            CommentKind::Drawing
        } else {
            CommentKind::General
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub initials: String,
}

impl Author {
    pub fn named(name: &str) -> Self {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_AUTHOR } else { name };
        Self {
            name: name.to_string(),
            avatar: String::new(),
            initials: initials(name),
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::named(DEFAULT_AUTHOR)
    }
}

/// First letter of the first two words, or the first two letters of a
/// single word.
fn initials(name: &str) -> String {
    let words = name.split_whitespace().collect::<Vec<_>>();
    let letters: String = match words.as_slice() {
        [] => String::new(),
        [single] => single.chars().take(2).collect(),
        [first, second, ..] => first.chars().take(1).chain(second.chars().take(1)).collect(),
    };
    letters.to_uppercase()
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    /// Playback position in seconds.
    pub time: f64,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: CommentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Percent of the frame width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Percent of the frame height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub author: Author,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Comment {
    pub fn from_new(id: CommentId, new: NewComment) -> Self {
        let kind = new.kind.unwrap_or_else(|| {
            CommentKind::for_submission(new.link.is_some(), !new.annotations.is_empty())
        });
        Self {
            id,
            time: new.time,
            text: new.text,
            kind,
            link: new.link,
            x: new.x,
            y: new.y,
            resolved: false,
            author: new.author.unwrap_or_default(),
            annotations: new.annotations,
        }
    }

    pub fn is_spatial(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }

    pub fn apply(&mut self, patch: CommentPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(resolved) = patch.resolved {
            self.resolved = resolved;
        }
        if let Some(link) = patch.link {
            self.link = Some(link).filter(|link| !link.is_empty());
        }
        if let Some(annotations) = patch.annotations {
            self.annotations = annotations;
        }
    }
}

/// Body of a create request.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NewComment {
    pub time: f64,
    pub text: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CommentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl NewComment {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches `link` when it is not blank.
    pub fn with_link(mut self, link: &str) -> Self {
        let link = link.trim();
        if !link.is_empty() {
            self.link = Some(link.to_string());
        }
        self
    }

    /// A replacement comment pointing at an attached asset.
    pub fn attachment(time: f64, filename: &str, url: String) -> Self {
        Self {
            kind: Some(CommentKind::Replacement),
            link: Some(url),
            ..Self::new(time, format!("Attached: {filename}"))
        }
    }
}

/// Body of an update request. Absent fields are left alone; an empty link
/// removes it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CommentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CommentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Annotation>>,
}

pub fn sort_by_time(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}

/// Spatial comments close enough to `time` to be pinned on the frame.
pub fn visible_spatial(comments: &[Comment], time: f64) -> Vec<&Comment> {
    comments
        .iter()
        .filter(|comment| comment.is_spatial() && (comment.time - time).abs() < SPATIAL_WINDOW_SECS)
        .collect()
}

fn whole_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// `mm:ss:ff` with 30 frames per second.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = whole_seconds(seconds);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let frames = ((seconds % 1.0) * FRAMES_PER_SECOND).floor() as u64;
    format!("{mins:02}:{secs:02}:{frames:02}")
}

/// `mm:ss`.
pub fn format_clock(seconds: f64) -> String {
    let seconds = whole_seconds(seconds);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{mins:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationId, Shape};
    use crate::geometry::Point;

    fn comment(id: u64, time: f64) -> Comment {
        Comment::from_new(CommentId::new(id), NewComment::new(time, "note"))
    }

    #[test]
    fn kind_follows_attachments() {
        assert_eq!(CommentKind::for_submission(true, true), CommentKind::Replacement);
        assert_eq!(CommentKind::for_submission(false, true), CommentKind::Drawing);
        assert_eq!(CommentKind::for_submission(false, false), CommentKind::General);

        let mut new = NewComment::new(1.0, "look here");
        new.annotations.push(Annotation {
            id: AnnotationId::new(1),
            shape: Shape::Arrow {
                start: Point::new(0.1, 0.1),
                end: Point::new(0.3, 0.3),
                color: "#22d3ee".into(),
            },
        });
        assert_eq!(Comment::from_new(CommentId::new(1), new).kind, CommentKind::Drawing);
    }

    #[test]
    fn typed_link_makes_a_replacement() {
        let blank = NewComment::new(2.0, "no link").with_link("   ");
        assert_eq!(blank.link, None);

        let linked = NewComment::new(2.0, "use this take").with_link("  https://cdn.example/take2.mp4 ");
        assert_eq!(linked.link.as_deref(), Some("https://cdn.example/take2.mp4"));
        let comment = Comment::from_new(CommentId::new(4), linked);
        assert_eq!(comment.kind, CommentKind::Replacement);
    }

    #[test]
    fn marker_colors() {
        assert_eq!(CommentKind::Drawing.marker_color(), "#fbbf24");
        assert_eq!(CommentKind::Replacement.marker_color(), "#22d3ee");
        assert_eq!(CommentKind::Text.marker_color(), "#f472b6");
        assert_eq!(CommentKind::Issue.marker_color(), DEFAULT_MARKER_COLOR);
    }

    #[test]
    fn initials_from_names() {
        assert_eq!(Author::named("You").initials, "YO");
        assert_eq!(Author::named("ada lovelace").initials, "AL");
        assert_eq!(Author::named("  ").name, DEFAULT_AUTHOR);
    }

    #[test]
    fn timecodes() {
        assert_eq!(format_timecode(0.0), "00:00:00");
        assert_eq!(format_timecode(75.5), "01:15:15");
        assert_eq!(format_timecode(f64::NAN), "00:00:00");
        assert_eq!(format_clock(125.9), "02:05");
    }

    #[test]
    fn spatial_window() {
        let mut pinned = comment(1, 10.0);
        pinned.x = Some(50.0);
        pinned.y = Some(25.0);
        let plain = comment(2, 10.0);
        let comments = vec![pinned, plain];
        assert_eq!(visible_spatial(&comments, 11.5).len(), 1);
        assert!(visible_spatial(&comments, 12.0).is_empty());
    }

    #[test]
    fn sorting_is_by_time_then_id() {
        let mut comments = vec![comment(3, 5.0), comment(1, 9.0), comment(2, 5.0)];
        sort_by_time(&mut comments);
        let ids = comments.iter().map(|c| c.id.get()).collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn json_uses_type_field() {
        let value = serde_json::to_value(comment(4, 1.5)).unwrap();
        assert_eq!(value["type"], "general");
        assert_eq!(value["author"]["initials"], "YO");
        assert!(value.get("annotations").is_none());

        let parsed: NewComment =
            serde_json::from_str(r#"{"time": 2, "text": "hi", "type": "issue"}"#).unwrap();
        assert_eq!(parsed.kind, Some(CommentKind::Issue));
    }

    #[test]
    fn patch_applies_present_fields() {
        let mut target = comment(1, 1.0);
        target.link = Some("https://cdn.example/a.mp4".into());
        target.apply(CommentPatch {
            resolved: Some(true),
            link: Some(String::new()),
            ..CommentPatch::default()
        });
        assert!(target.resolved);
        assert_eq!(target.link, None);
        assert_eq!(target.text, "note");
    }
}
