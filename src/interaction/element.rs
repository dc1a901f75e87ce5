use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Longest text kept for an element, in characters
pub const MAX_TEXT_LEN: usize = 100;

/// Attributes whose presence marks an AJAX-style link or control
const AJAX_ATTRIBUTES: &[&str] = &["data-remote", "data-ajax", "hx-get", "hx-post"];

/// Coarse element category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Button,
    Link,
    Div,
    Span,
    Other,
}

impl ElementType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "button" => Self::Button,
            "a" => Self::Link,
            "div" => Self::Div,
            "span" => Self::Span,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::Div => "div",
            Self::Span => "span",
            Self::Other => "other",
        }
    }
}

/// Why an element was judged interactive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractiveReason {
    /// Navigable href (not `mailto:`/`tel:`)
    Href,
    NativeButton,
    AriaRole(String),
    OnClick,
    TabIndex,
    PointerCursor,
}

impl fmt::Display for InteractiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Href => write!(f, "href"),
            Self::NativeButton => write!(f, "native-button"),
            Self::AriaRole(role) => write!(f, "role:{}", role),
            Self::OnClick => write!(f, "onclick"),
            Self::TabIndex => write!(f, "tabindex"),
            Self::PointerCursor => write!(f, "cursor:pointer"),
        }
    }
}

/// How an element is found again after the DOM re-renders
///
/// Variants are listed in derivation priority. Every variant that can
/// carry text does, so siblings with different text never share a
/// strategy and an `nth` only separates true look-alikes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorStrategy {
    RoleText { role: String, text: String },
    Role { role: String },
    /// Anchors and buttons with visible text
    Text { tag: String, text: String },
    Data {
        /// Every `data-*` attribute, sorted by name
        attributes: Vec<(String, String)>,
        text: String,
    },
    Structural {
        tag: String,
        href: Option<String>,
        onclick: bool,
        id: Option<String>,
        text: String,
    },
}

fn write_text(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if text.is_empty() {
        Ok(())
    } else {
        write!(f, ":text({:?})", text)
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleText { role, text } => write!(f, "role={}[name={:?}]", role, text),
            Self::Role { role } => write!(f, "role={}", role),
            Self::Text { tag, text } => write!(f, "{}:text({:?})", tag, text),
            Self::Data { attributes, text } => {
                for (name, value) in attributes {
                    write!(f, "[{}={:?}]", name, value)?;
                }
                write_text(f, text)
            }
            Self::Structural {
                tag,
                href,
                onclick,
                id,
                text,
            } => {
                write!(f, "{}", tag)?;
                if let Some(href) = href {
                    write!(f, "[href={:?}]", href)?;
                }
                if *onclick {
                    write!(f, "[onclick]")?;
                }
                if let Some(id) = id {
                    write!(f, "#{}", id)?;
                }
                write_text(f, text)
            }
        }
    }
}

/// A strategy plus the index among candidates sharing it, in document order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementSelector {
    pub strategy: SelectorStrategy,
    pub nth: usize,
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.strategy)?;
        if self.nth > 0 {
            write!(f, " >> nth={}", self.nth)?;
        }
        Ok(())
    }
}

impl Serialize for ElementSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An element judged interactive by the classifier
///
/// Recomputed on every classification pass; handles are never kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickableElement {
    pub selector: ElementSelector,

    #[serde(rename = "type")]
    pub element_type: ElementType,

    pub tag: String,

    /// Whitespace-collapsed, truncated text
    pub text: String,

    pub is_visible: bool,

    pub href: Option<String>,

    pub is_interactive: bool,

    pub interactive_reasons: Vec<InteractiveReason>,

    #[serde(skip)]
    pub attributes: BTreeMap<String, String>,
}

impl ClickableElement {
    /// Dedup identity: `type|text|selector|reasons`
    pub fn identity_key(&self) -> String {
        let reasons: Vec<String> = self
            .interactive_reasons
            .iter()
            .map(ToString::to_string)
            .collect();
        format!(
            "{}|{}|{}|{}",
            self.element_type.as_str(),
            self.text,
            self.selector,
            reasons.join(",")
        )
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Marked as an AJAX trigger by attribute or by an API-looking href
    pub fn is_ajax_hint(&self) -> bool {
        if AJAX_ATTRIBUTES.iter().any(|a| self.attributes.contains_key(*a)) {
            return true;
        }
        self.href.as_deref().is_some_and(|href| {
            let href = href.to_ascii_lowercase();
            href.contains("/api/") || href.contains("ajax")
        })
    }
}

/// Collapses whitespace and truncates to [`MAX_TEXT_LEN`] characters
pub fn normalize_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_TEXT_LEN) {
        Some((idx, _)) => collapsed[..idx].to_string(),
        None => collapsed,
    }
}
