use super::{message, Pointer, Visual, RED, RESET};
use crate::region::Region;
use std::fmt::{Debug, Display, Formatter, Result};

/// Identifies the failure class of an [`Error`].
///
/// Startup classes (`DuplicateEntry`, `Structural`, `InvalidSyntax`, `Io`)
/// surface while sources are compiled and registered, and should abort
/// initialization. The remaining classes are per-render and never affect
/// other renders or the shared registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested SQL id is not registered.
    NoMatchingEntry,
    /// The same SQL id was registered twice.
    DuplicateEntry,
    /// Malformed directive nesting in source.
    Structural,
    /// A directive, entry header or guard expression that does not parse.
    InvalidSyntax,
    /// A referenced placeholder or variable is absent from the scope.
    ParamNotFound,
    /// A `range` variable resolved to a non-sequence value.
    NotASequence,
    /// A dotted placeholder's base name did not resolve to a composite.
    NotComposite,
    /// A `set` block rendered with zero eligible assignments.
    NoUpdatableField,
    /// A `@table_X@` placeholder with no mapping supplied.
    TableNotFound,
    /// A guard comparison between values that cannot be compared.
    IncompatibleTypes,
    /// A store value that could not be serialized.
    Unserializable,
    /// Reading template sources failed.
    Io,
}

impl ErrorKind {
    /// Return the reason text associated with this kind.
    pub fn reason(&self) -> &'static str {
        match self {
            ErrorKind::NoMatchingEntry => message::NO_MATCHING_ENTRY,
            ErrorKind::DuplicateEntry => message::DUPLICATE_ENTRY,
            ErrorKind::Structural => message::STRUCTURAL,
            ErrorKind::InvalidSyntax => message::INVALID_SYNTAX,
            ErrorKind::ParamNotFound => message::PARAM_NOT_FOUND,
            ErrorKind::NotASequence => message::NOT_A_SEQUENCE,
            ErrorKind::NotComposite => message::NOT_COMPOSITE,
            ErrorKind::NoUpdatableField => message::NO_UPDATABLE_FIELD,
            ErrorKind::TableNotFound => message::TABLE_NOT_FOUND,
            ErrorKind::IncompatibleTypes => message::INCOMPATIBLE_TYPES,
            ErrorKind::Unserializable => message::UNSERIALIZABLE,
            ErrorKind::Io => message::IO,
        }
    }
}

/// Describes a compile or render failure, and allows adding contextual
/// help text and a visualization.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use stencil::{Error, ErrorKind, Region};
///
/// Error::build(ErrorKind::InvalidSyntax)
///     .with_pointer("--- update [x]", Region::new(4..10))
///     .with_entry("user.sql")
///     .with_help("expected `if`, `ifnotnil`, `range`, `set` or `where`");
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces this
/// output:
///
/// ```text
/// error: invalid syntax
///   --> user.sql:1:5
///    |
///  1 | --- update [x]
///    |     ^^^^^^
///    |
///   = help: expected `if`, `ifnotnil`, `range`, `set` or `where`
/// ```
pub struct Error {
    /// The failure class.
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The source file or SQL id that the [`Error`] comes from.
    entry: Option<String>,
}

impl Error {
    /// Create a new [`Error`] of the given [`ErrorKind`].
    ///
    /// The reason text is derived from the kind; the additional fields may
    /// be populated using the various methods defined on `Error`.
    pub fn build(kind: ErrorKind) -> Self {
        Error {
            kind,
            reason: kind.reason().to_owned(),
            visual: None,
            help: None,
            entry: None,
        }
    }

    /// Return the [`ErrorKind`] of this [`Error`].
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Set the reason text, which is a short summary of the [`Error`].
    pub fn with_reason<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.reason = text.into();

        self
    }

    /// Set the entry text, which is the source file or SQL id that the
    /// [`Error`] is related to.
    pub fn with_entry<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.entry = Some(text.into());

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate
    /// the cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] over the given source
    /// text and [`Region`].
    pub fn with_pointer<T>(mut self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        self.visual = Some(Box::new(Pointer::new(source, region.into())));

        self
    }

    /// Set the help text, which is contextual information to accompany the
    /// reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the source file or SQL id that the error is related to.
    pub fn get_entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// Return the help text.
    pub fn get_help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("entry", &self.entry)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .finish()?;

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}error{RESET}");
        write!(f, "{header}: {}", self.reason)?;

        if f.alternate() {
            if let Some(visual) = self.visual.as_ref() {
                return visual.display(f, self.entry.as_deref(), self.help.as_deref());
            }
            if let Some(entry) = self.entry.as_deref() {
                write!(f, "\n --> {entry}")?;
            }
            if let Some(help) = self.help.as_deref() {
                write!(f, "\n = help: {help}")?;
            }
        }

        Ok(())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.help == other.help && self.entry == other.entry
    }
}

impl std::error::Error for Error {}
