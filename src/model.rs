use serde::{Deserialize, Deserializer, Serialize};
use std::ops::{Index, Sub};

/// A single quoted passage from the review feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightItem {
    pub text: String,
    #[serde(default = "unknown_title", deserialize_with = "title_or_unknown")]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

fn unknown_title() -> String {
    "unknown".to_string()
}

/// Feeds send `null` for a missing title as often as they omit the key.
fn title_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_title))
}

/// Body of the review endpoint. Fields other than `highlights` are ignored,
/// but `highlights` itself is required.
#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub highlights: Vec<HighlightItem>,
}

/// The items retrieved by one activation, in feed order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightCollection {
    items: Vec<HighlightItem>,
}

impl HighlightCollection {
    pub fn new(items: Vec<HighlightItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HighlightItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HighlightItem> {
        self.items.iter()
    }
}

impl Index<usize> for HighlightCollection {
    type Output = HighlightItem;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl From<ReviewPayload> for HighlightCollection {
    fn from(payload: ReviewPayload) -> Self {
        Self::new(payload.highlights)
    }
}

/// A screen coordinate or offset in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}
