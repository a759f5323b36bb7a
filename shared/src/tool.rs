use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#fbbf24";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pointer,
    Pen,
    Arrow,
    Zoom,
    Text,
    Hand,
    Eraser,
    /// Opens the host's asset picker; never reaches the drawing logic.
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool `{0}`")]
pub struct UnknownTool(pub String);

const TOOL_COLORS: [(Tool, &str); 4] = [
    (Tool::Pen, "#fbbf24"),
    (Tool::Arrow, "#22d3ee"),
    (Tool::Zoom, "#a78bfa"),
    (Tool::Text, "#f472b6"),
];

const TOOL_SHORTCUTS: [(char, Tool); 8] = [
    ('v', Tool::Pointer),
    ('p', Tool::Pen),
    ('a', Tool::Arrow),
    ('z', Tool::Zoom),
    ('t', Tool::Text),
    ('h', Tool::Hand),
    ('e', Tool::Eraser),
    ('l', Tool::Link),
];

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Pointer,
        Tool::Pen,
        Tool::Arrow,
        Tool::Zoom,
        Tool::Text,
        Tool::Hand,
        Tool::Eraser,
        Tool::Link,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pointer => "pointer",
            Tool::Pen => "pen",
            Tool::Arrow => "arrow",
            Tool::Zoom => "zoom",
            Tool::Text => "text",
            Tool::Hand => "hand",
            Tool::Eraser => "eraser",
            Tool::Link => "link",
        }
    }

    pub fn color(self) -> &'static str {
        TOOL_COLORS
            .iter()
            .find(|(tool, _)| *tool == self)
            .map(|(_, color)| *color)
            .unwrap_or(DEFAULT_COLOR)
    }

    pub fn shortcut(self) -> char {
        TOOL_SHORTCUTS
            .iter()
            .find(|(_, tool)| *tool == self)
            .map(|(key, _)| key.to_ascii_uppercase())
            .unwrap_or('?')
    }

    pub fn from_shortcut(key: &str) -> Option<Tool> {
        let mut chars = key.chars();
        let key = chars.next()?.to_ascii_lowercase();
        if chars.next().is_some() {
            return None;
        }
        TOOL_SHORTCUTS
            .iter()
            .find(|(shortcut, _)| *shortcut == key)
            .map(|(_, tool)| *tool)
    }

    /// Drawing tools pause playback when selected.
    pub fn pauses_playback(self) -> bool {
        matches!(self, Tool::Pen | Tool::Arrow | Tool::Zoom | Tool::Text)
    }

    pub fn reaches_engine(self) -> bool {
        self != Tool::Link
    }

    /// Tools under which hovering an annotation highlights it.
    pub fn highlights_hover(self) -> bool {
        matches!(self, Tool::Pointer | Tool::Hand | Tool::Eraser)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownTool(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_tool_names() {
        assert_eq!("pen".parse::<Tool>(), Ok(Tool::Pen));
        assert_eq!(" Eraser ".parse::<Tool>(), Ok(Tool::Eraser));
        assert_eq!("lasso".parse::<Tool>(), Err(UnknownTool("lasso".into())));
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>(), Ok(tool));
        }
    }

    #[test]
    fn colors_come_from_the_table() {
        assert_eq!(Tool::Pen.color(), "#fbbf24");
        assert_eq!(Tool::Arrow.color(), "#22d3ee");
        assert_eq!(Tool::Text.color(), "#f472b6");
        assert_eq!(Tool::Hand.color(), DEFAULT_COLOR);
    }

    #[test]
    fn shortcuts_round_trip() {
        for tool in Tool::ALL {
            let key = tool.shortcut().to_string();
            assert_eq!(Tool::from_shortcut(&key), Some(tool));
        }
        assert_eq!(Tool::from_shortcut("Enter"), None);
    }

    #[test]
    fn only_drawing_tools_pause_playback() {
        assert!(Tool::Pen.pauses_playback());
        assert!(!Tool::Hand.pauses_playback());
        assert!(!Tool::Eraser.pauses_playback());
        assert!(!Tool::Link.reaches_engine());
    }
}
