//! Rich text bodies: the wrapper around an external editing surface, the
//! toolbar it exposes and the HTML fragment it produces.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What the editing surface produces for a document with no text.
const EMPTY_FRAGMENT: &str = "<p></p>";

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ToolbarCommand {
    Bold,
    Italic,
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList,
    Align { alignment: Alignment },
    Link { href: String },
    Unlink,
}

impl ToolbarCommand {
    /// Headings outside 1..=3 and links without a target do nothing.
    pub fn is_usable(&self) -> bool {
        match self {
            ToolbarCommand::Heading { level } => (1..=3).contains(level),
            ToolbarCommand::Link { href } => !href.trim().is_empty(),
            _ => true,
        }
    }
}

/// The editing library the wrapper drives.
pub trait EditorSurface {
    fn set_html(&mut self, html: &str);

    fn html(&self) -> String;

    fn apply(&mut self, command: &ToolbarCommand);

    fn is_active(&self, command: &ToolbarCommand) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Shown until the surface is mounted.
    Placeholder,
    Surface(String),
}

type ChangeCallback = Box<dyn FnMut(&str) + Send>;

pub struct RichContentEditor<S> {
    surface: Option<S>,
    content: String,
    on_change: ChangeCallback,
}

impl<S> fmt::Debug for RichContentEditor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichContentEditor")
            .field("mounted", &self.surface.is_some())
            .field("content", &self.content)
            .finish()
    }
}

impl<S: EditorSurface> RichContentEditor<S> {
    pub fn new(content: impl Into<String>, on_change: impl FnMut(&str) + Send + 'static) -> Self {
        Self {
            surface: None,
            content: content.into(),
            on_change: Box::new(on_change),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn mount(&mut self, mut surface: S) {
        surface.set_html(&self.content);
        self.surface = Some(surface);
    }

    pub fn render(&self) -> Rendered {
        match &self.surface {
            None => Rendered::Placeholder,
            Some(surface) => Rendered::Surface(surface.html()),
        }
    }

    pub fn html(&self) -> &str {
        &self.content
    }

    /// Replaces the content from outside, e.g. when another record is loaded. Does not notify.
    pub fn set_content(&mut self, html: &str) {
        if self.content == html {
            return;
        }
        self.content = html.to_string();
        if let Some(surface) = self.surface.as_mut() {
            surface.set_html(html);
        }
    }

    /// Called by the surface after the user changed the document.
    pub fn surface_changed(&mut self) {
        let Some(surface) = &self.surface else {
            return;
        };
        let html = surface.html();
        if html != self.content {
            self.content = html;
            (self.on_change)(&self.content);
        }
    }

    /// Returns false when nothing ran: not mounted yet, or an unusable command.
    pub fn run(&mut self, command: &ToolbarCommand) -> bool {
        if !command.is_usable() {
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        surface.apply(command);
        self.surface_changed();
        true
    }

    pub fn is_active(&self, command: &ToolbarCommand) -> bool {
        self.surface
            .as_ref()
            .is_some_and(|surface| surface.is_active(command))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ToolbarButton {
    pub title: &'static str,
    pub command: ToolbarCommand,
}

/// Settings clients use to set up their editing surface.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub toolbar: Vec<ToolbarButton>,
    pub align_targets: [&'static str; 2],
    pub open_links_on_click: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let align = |alignment| ToolbarCommand::Align { alignment };
        let toolbar = vec![
            ("Bold", ToolbarCommand::Bold),
            ("Italic", ToolbarCommand::Italic),
            ("Paragraph", ToolbarCommand::Paragraph),
            ("Heading 1", ToolbarCommand::Heading { level: 1 }),
            ("Heading 2", ToolbarCommand::Heading { level: 2 }),
            ("Heading 3", ToolbarCommand::Heading { level: 3 }),
            ("Bullet List", ToolbarCommand::BulletList),
            ("Numbered List", ToolbarCommand::OrderedList),
            ("Align Left", align(Alignment::Left)),
            ("Align Center", align(Alignment::Center)),
            ("Align Right", align(Alignment::Right)),
            ("Link", ToolbarCommand::Link { href: String::new() }),
            ("Unlink", ToolbarCommand::Unlink),
        ];
        Self {
            toolbar: toolbar
                .into_iter()
                .map(|(title, command)| ToolbarButton { title, command })
                .collect(),
            align_targets: ["heading", "paragraph"],
            open_links_on_click: false,
        }
    }
}

/// An article body as stored: an HTML fragment, empty when the editor had no text.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub struct RichContent(String);

impl RichContent {
    pub fn from_html(html: &str) -> Self {
        let html = html.trim();
        if html == EMPTY_FRAGMENT {
            return Self::default();
        }
        Self(html.to_string())
    }

    pub fn as_html(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.plain_text().is_empty()
    }

    /// Tags stripped, common entities decoded, whitespace collapsed.
    pub fn plain_text(&self) -> String {
        let text = TAG.replace_all(&self.0, " ");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");
        SPACES.replace_all(text.trim(), " ").into_owned()
    }
}

impl From<String> for RichContent {
    fn from(value: String) -> Self {
        Self::from_html(&value)
    }
}

impl From<RichContent> for String {
    fn from(value: RichContent) -> Self {
        value.0
    }
}
