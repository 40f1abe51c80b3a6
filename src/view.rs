use std::fmt;

use crate::fetch::FetchState;
use crate::model::{HighlightItem, Point};

/// Exactly one of these fills the overlay at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayBody {
    Spinner,
    Error(String),
    Highlight(HighlightItem),
}

impl OverlayBody {
    pub fn from_state(state: &FetchState) -> Self {
        match state {
            FetchState::Idle | FetchState::Loading => OverlayBody::Spinner,
            FetchState::Failed(e) => OverlayBody::Error(e.to_string()),
            FetchState::Ready {
                collection,
                selected,
            } => collection
                .get(*selected)
                .cloned()
                .map_or(OverlayBody::Spinner, OverlayBody::Highlight),
        }
    }
}

/// What a visible overlay draws. A hidden overlay has no view at all.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    /// Translation applied to the overlay surface.
    pub offset: Point,
    pub body: OverlayBody,
    /// External review page, opened only on explicit user action.
    pub review_url: String,
}

impl fmt::Display for OverlayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+ highlight @ ({}, {})", self.offset.x, self.offset.y)?;
        match &self.body {
            OverlayBody::Spinner => writeln!(f, "| loading...")?,
            OverlayBody::Error(reason) => writeln!(f, "| error: {reason}")?,
            OverlayBody::Highlight(item) => {
                writeln!(f, "| \"{}\"", item.text)?;
                match &item.author {
                    Some(author) => writeln!(f, "| -- {}, {}", item.title, author)?,
                    None => writeln!(f, "| -- {}", item.title)?,
                }
            }
        }
        write!(f, "+ [r] another  [d] close  [o] {}", self.review_url)
    }
}

/// Text rendering for terminal hosts. Hidden renders as the empty string.
pub fn render_text(view: Option<&OverlayView>) -> String {
    view.map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::HighlightCollection;

    fn item(text: &str, author: Option<&str>) -> HighlightItem {
        HighlightItem {
            text: text.to_string(),
            title: "Walden".to_string(),
            author: author.map(str::to_string),
        }
    }

    #[test]
    fn test_body_follows_fetch_state() {
        assert_eq!(OverlayBody::from_state(&FetchState::Idle), OverlayBody::Spinner);
        assert_eq!(OverlayBody::from_state(&FetchState::Loading), OverlayBody::Spinner);
        assert_eq!(
            OverlayBody::from_state(&FetchState::Failed(FetchError::EmptyResult)),
            OverlayBody::Error("no items returned".to_string())
        );

        let ready = FetchState::Ready {
            collection: HighlightCollection::new(vec![item("A", None), item("B", None)]),
            selected: 1,
        };
        assert_eq!(OverlayBody::from_state(&ready), OverlayBody::Highlight(item("B", None)));
    }

    #[test]
    fn test_hidden_renders_nothing() {
        assert_eq!(render_text(None), "");
    }

    #[test]
    fn test_render_highlight() {
        let view = OverlayView {
            offset: Point::new(30.0, 30.0),
            body: OverlayBody::Highlight(item("Simplify", Some("Thoreau"))),
            review_url: "https://readwise.io/dailyreview".to_string(),
        };
        let text = render_text(Some(&view));
        assert!(text.starts_with("+ highlight @ (30, 30)"));
        assert!(text.contains("| \"Simplify\""));
        assert!(text.contains("| -- Walden, Thoreau"));
        assert!(text.ends_with("https://readwise.io/dailyreview"));
    }
}
