use crate::record::LogRecord;
use std::borrow::Cow;
use std::path::{Component, Path, MAIN_SEPARATOR};
use std::str::FromStr;

/// Rendered in place of a field the record cannot provide.
pub const PLACEHOLDER: &str = "<unknown>";

/// Marker standing in for the elided leading directories of a short path.
pub const PARENT_MARKER: &str = "..";

/// Fields a [`Template`] can substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    Asctime,
    Level,
    Target,
    Module,
    Pathname,
    Filename,
    Shortpath,
    Function,
    Line,
    Message,
}

impl FromStr for TemplateField {
    type Err = TemplateError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let field = match name {
            "asctime" => TemplateField::Asctime,
            "level" => TemplateField::Level,
            "target" => TemplateField::Target,
            "module" => TemplateField::Module,
            "pathname" => TemplateField::Pathname,
            "filename" => TemplateField::Filename,
            "shortpath" => TemplateField::Shortpath,
            "function" => TemplateField::Function,
            "line" => TemplateField::Line,
            "message" => TemplateField::Message,
            other => return Err(TemplateError::UnknownField(other.to_string())),
        };
        Ok(field)
    }
}

/// Error returned when a line template cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template field `{0}`")]
    UnknownField(String),

    #[error("unclosed `{{` at byte {0}")]
    Unclosed(usize),

    #[error("unmatched `}}` at byte {0}")]
    UnmatchedClose(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(TemplateField),
}

/// Parsed line template such as `{level} {shortpath}:{function}:{line} {message}`.
///
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = src.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::Unclosed(pos)),
                        }
                    }

                    let field = name.trim().parse::<TemplateField>()?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::UnmatchedClose(pos));
                    }
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template { segments })
    }

    pub fn contains(&self, field: TemplateField) -> bool {
        self.segments.iter().any(|segment| *segment == Segment::Field(field))
    }

    fn render(&self, record: &LogRecord, asctime: Option<&str>, shortpath: Option<&str>, out: &mut String) {
        for segment in &self.segments {
            let field = match segment {
                Segment::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Segment::Field(field) => *field,
            };

            let value: Option<Cow<'_, str>> = match field {
                TemplateField::Asctime => asctime.map(Cow::Borrowed),
                TemplateField::Level => Some(Cow::Borrowed(record.level.as_str())),
                TemplateField::Target => Some(Cow::Borrowed(record.target.as_str())),
                TemplateField::Module => record.module_path.as_deref().map(Cow::Borrowed),
                TemplateField::Pathname => record.pathname.as_deref().map(Cow::Borrowed),
                TemplateField::Filename => record.filename().map(Cow::Borrowed),
                TemplateField::Shortpath => shortpath.map(Cow::Borrowed),
                TemplateField::Function => record.function.as_deref().map(Cow::Borrowed),
                TemplateField::Line => record.line.map(|line| Cow::Owned(line.to_string())),
                TemplateField::Message => Some(Cow::Borrowed(record.message.as_str())),
            };

            out.push_str(value.as_deref().unwrap_or(PLACEHOLDER));
        }
    }
}

/// Substitution strategy expanding a template against a record.
///
/// Rendering never fails: fields the record lacks become [`PLACEHOLDER`].
pub trait Style: Send + Sync {
    /// Whether the formatter must compute `asctime` before rendering.
    fn uses_time(&self) -> bool;

    fn render(&self, record: &LogRecord, asctime: Option<&str>, out: &mut String);
}

/// Plain substitution; `{shortpath}` renders the full path.
#[derive(Debug, Clone)]
pub struct TemplateStyle {
    template: Template,
}

impl TemplateStyle {
    pub fn new(template: Template) -> Self {
        TemplateStyle { template }
    }
}

impl Style for TemplateStyle {
    fn uses_time(&self) -> bool {
        self.template.contains(TemplateField::Asctime)
    }

    fn render(&self, record: &LogRecord, asctime: Option<&str>, out: &mut String) {
        self.template.render(record, asctime, record.pathname.as_deref(), out);
    }
}

/// Substitution that abbreviates `{shortpath}` to the last two path
/// segments behind a parent-directory marker.
#[derive(Debug, Clone)]
pub struct PathStyle {
    template: Template,
    marker: String,
}

impl PathStyle {
    pub fn new(template: Template) -> Self {
        PathStyle { template, marker: PARENT_MARKER.to_string() }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }
}

impl Style for PathStyle {
    fn uses_time(&self) -> bool {
        true
    }

    fn render(&self, record: &LogRecord, asctime: Option<&str>, out: &mut String) {
        let shortpath = record.pathname.as_deref().map(|path| short_path(path, &self.marker));
        self.template.render(record, asctime, shortpath.as_deref(), out);
    }
}

/// `<marker><sep><parent><sep><file>` for paths with at least two
/// segments; shorter paths are returned unchanged.
pub fn short_path(path: &str, marker: &str) -> String {
    let segments: Vec<&str> = Path::new(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .collect();

    match segments.as_slice() {
        [.., parent, file] => format!("{marker}{MAIN_SEPARATOR}{parent}{MAIN_SEPARATOR}{file}"),
        _ => path.to_string(),
    }
}
