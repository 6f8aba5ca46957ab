use crate::{
    compile::{compile, Entry},
    log::{Error, ErrorKind},
    render::{Rendered, Renderer, Tables},
    store::Store,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, error, info};

/// Compiles `.sql` sources and stores the resulting entries for rendering.
///
/// An `Engine` is built once at startup, before any rendering happens.
/// After that it is read-only, so it may be shared freely between threads;
/// every render allocates only call-local scope state.
///
/// # Examples
///
/// ```
/// use stencil::{Engine, Store};
///
/// let mut engine = Engine::new();
/// engine
///     .add_source("user.sql", "--- [getUser]\nSELECT * FROM user WHERE id = #id#")
///     .unwrap();
///
/// let store = Store::new().with_must("id", 7);
/// let rendered = engine.render("getUser", &store).unwrap();
///
/// assert_eq!(rendered.sql, "SELECT * FROM user WHERE id = ?");
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    /// Entries that this engine is aware of, by SQL id.
    entries: HashMap<String, Entry>,
}

impl Engine {
    /// Create a new instance of [`Engine`].
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Compile every entry in `text` and register them under their ids.
    ///
    /// The `name` identifies the source in error output, and is usually a
    /// file name.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails, or when an entry id is
    /// already registered. Ids must be unique across every source the
    /// engine has seen.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::Engine;
    ///
    /// let mut engine = Engine::new();
    /// let result = engine.add_source("user.sql", "--- [getUser]\nSELECT 1");
    /// assert!(result.is_ok());
    ///
    /// let second = engine.add_source("other.sql", "--- [getUser]\nSELECT 2");
    /// assert!(second.is_err());
    /// ```
    pub fn add_source(&mut self, name: &str, text: &str) -> Result<(), Error> {
        for entry in compile(Some(name), text)? {
            if self.entries.contains_key(&entry.name) {
                return Err(Error::build(ErrorKind::DuplicateEntry)
                    .with_entry(&entry.name)
                    .with_help(format!(
                        "an entry named `{}` is already registered, \
                        ids must be unique across all sources",
                        entry.name
                    )));
            }
            debug!(entry = %entry.name, source = name, "compiled entry");
            self.entries.insert(entry.name.clone(), entry);
        }

        Ok(())
    }

    /// Read and compile every `.sql` file in the given directory.
    ///
    /// Files are visited in name order, so duplicate-id errors are
    /// reported deterministically.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the directory cannot be read, or when any
    /// file fails to compile or register.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stencil::Engine;
    ///
    /// let mut engine = Engine::new();
    /// engine.load_dir("sql").unwrap();
    /// ```
    pub fn load_dir<P>(&mut self, dir: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let read = fs::read_dir(dir).map_err(|err| {
            Error::build(ErrorKind::Io)
                .with_help(format!("cannot read directory `{}`: {err}", dir.display()))
        })?;

        let mut paths: Vec<PathBuf> = read
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|extension| extension == "sql"))
            .collect();
        paths.sort();

        for path in paths {
            let text = fs::read_to_string(&path).map_err(|err| {
                Error::build(ErrorKind::Io)
                    .with_help(format!("cannot read `{}`: {err}", path.display()))
            })?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.add_source(&name, &text)?;
        }
        info!(
            entries = self.entries.len(),
            dir = %dir.display(),
            "compiled sql sources"
        );

        Ok(())
    }

    /// Return the entry registered under the given id.
    pub fn get_entry(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Render the entry registered under the given id with the given
    /// [`Store`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no entry has the id, or when rendering
    /// fails for a reason the `Error` will describe.
    pub fn render(&self, id: &str, store: &Store) -> Result<Rendered, Error> {
        self.render_with(id, store, &Tables::new())
    }

    /// Render the entry registered under the given id, substituting
    /// `@table_X@` placeholders from the given [`Tables`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no entry has the id, or when rendering
    /// fails for a reason the `Error` will describe.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::{Engine, Store, Tables};
    ///
    /// let mut engine = Engine::new();
    /// engine
    ///     .add_source("count.sql", "--- [count]\nSELECT COUNT(*) FROM @table_t@")
    ///     .unwrap();
    ///
    /// let tables = Tables::from([("t".to_owned(), "user".to_owned())]);
    /// let rendered = engine.render_with("count", &Store::new(), &tables).unwrap();
    ///
    /// assert_eq!(rendered.sql, "SELECT COUNT(*) FROM user");
    /// ```
    pub fn render_with(
        &self,
        id: &str,
        store: &Store,
        tables: &Tables,
    ) -> Result<Rendered, Error> {
        let Some(entry) = self.entries.get(id) else {
            return Err(Error::build(ErrorKind::NoMatchingEntry)
                .with_entry(id)
                .with_help(format!(
                    "no entry named `{id}`, register one with `.add_source` or `.load_dir`"
                )));
        };

        let start = Instant::now();
        match Renderer::new(entry, store, tables).render() {
            Ok(rendered) => {
                debug!(
                    entry = id,
                    sql = %rendered.sql,
                    values = rendered.values.len(),
                    elapsed = ?start.elapsed(),
                    "rendered"
                );
                Ok(rendered)
            }
            Err(err) => {
                let err = err.with_entry(id);
                error!(entry = id, error = %err, "render failed");
                Err(err)
            }
        }
    }
}
