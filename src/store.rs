use crate::{log::Error, value::Value};

use serde::Serialize;
use std::collections::HashMap;

/// Provides storage for the parameters that an entry can be rendered with.
///
/// Values are converted through serde on the way in, so anything
/// serializable works, including structs, which become composite values
/// addressable with `#name.field#` placeholders.
#[derive(Debug, Default)]
pub struct Store {
    data: HashMap<String, Value>,
}

impl Store {
    /// Create a new [`Store`].
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::Store;
    ///
    /// let store = Store::new();
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::Store;
    ///
    /// let mut store = Store::new();
    /// let result = store.insert("name", "taylor");
    ///
    /// assert!(result.is_ok());
    /// ```
    pub fn insert<S, T>(&mut self, key: S, value: T) -> Result<(), Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        let key = key.into();
        let value = Value::serialize(value)?;
        self.data.insert(key, value);

        Ok(())
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// # Panics
    ///
    /// Panics if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::Store;
    ///
    /// let mut store = Store::new();
    /// store.insert_must("name", "taylor");
    /// ```
    #[inline]
    pub fn insert_must<S, T>(&mut self, key: S, value: T)
    where
        S: Into<String>,
        T: Serialize,
    {
        self.data.insert(
            key.into(),
            Value::serialize(value).expect("value should be serializable"),
        );
    }

    /// Inserts a prebuilt [`Value`] into the [`Store`].
    ///
    /// This is the entry point for variants that serde cannot round-trip,
    /// such as [`Value::Time`].
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::{Store, Value};
    ///
    /// let mut store = Store::new();
    /// store.insert_value("count", Value::Uint(3));
    /// ```
    #[inline]
    pub fn insert_value<S>(&mut self, key: S, value: Value)
    where
        S: Into<String>,
    {
        self.data.insert(key.into(), value);
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// Returns the `Store`, so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::Store;
    ///
    /// let store = Store::new().with("name", "taylor");
    ///
    /// assert!(store.is_ok());
    /// ```
    #[inline]
    pub fn with<S, T>(mut self, key: S, value: T) -> Result<Self, Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert(key, value)?;

        Ok(self)
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// Returns the `Store`, so additional methods may be chained.
    ///
    /// # Panics
    ///
    /// Panics if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::Store;
    ///
    /// let store = Store::new().with_must("name", "taylor");
    /// ```
    #[inline]
    pub fn with_must<S, T>(mut self, key: S, value: T) -> Self
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert_must(key, value);

        self
    }

    /// Inserts a prebuilt [`Value`], returning the `Store` for chaining.
    #[inline]
    pub fn with_value<S>(mut self, key: S, value: Value) -> Self
    where
        S: Into<String>,
    {
        self.insert_value(key, value);

        self
    }

    /// Returns a reference to the [`Value`] corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::{Store, Value};
    ///
    /// let store = Store::new().with_must("name", "taylor");
    ///
    /// assert_eq!(store.get("name"), Some(&Value::String("taylor".into())));
    /// ```
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Read view over a [`Store`] that layers loop-local bindings on top.
///
/// `range` blocks push one frame per iteration; lookups check frames
/// innermost-first before falling back to the store.
#[derive(Debug)]
pub(crate) struct Shadow<'store> {
    store: &'store Store,
    frames: Vec<HashMap<String, Value>>,
}

impl<'store> Shadow<'store> {
    /// Create a new [`Shadow`] over the given [`Store`].
    #[inline]
    pub fn new(store: &'store Store) -> Self {
        Self {
            store,
            frames: vec![HashMap::new()],
        }
    }

    /// Push a new frame onto the [`Shadow`].
    #[inline]
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Remove the top frame from the [`Shadow`].
    ///
    /// # Panics
    ///
    /// Panics when only the base frame remains.
    #[inline]
    pub fn pop(&mut self) {
        if self.frames.len() == 1 {
            panic!("base frame must never be removed");
        }
        self.frames.pop();
    }

    /// Insert the value into the top frame of the [`Shadow`].
    #[inline]
    pub fn insert(&mut self, key: &str, value: Value) {
        self.frames
            .last_mut()
            .expect("shadow should retain its base frame")
            .insert(key.to_owned(), value);
    }

    /// Get the [`Value`] of the given key.
    ///
    /// If the key is not found within the frames, the store is searched.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(key) {
                return Some(value);
            }
        }
        self.store.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::{Shadow, Store};
    use crate::value::Value;

    #[test]
    fn test_store_insert() {
        let mut store = Store::new();
        store.insert_must("one", "two");

        assert_eq!(store.get("one"), Some(&Value::String("two".into())));
    }

    #[test]
    fn test_store_insert_fluent() {
        assert_eq!(
            Store::new().with_must("three", 4).get("three"),
            Some(&Value::Int(4))
        );
    }

    #[test]
    fn test_shadow_insert_and_get() {
        let store = Store::new().with_must("one", "one").with_must("two", "two");
        let mut shadow = Shadow::new(&store);
        // Push a frame here or the pop below will panic.
        shadow.push();
        shadow.insert("one", Value::String("shadowed one".into()));

        assert_eq!(shadow.get("one"), Some(&Value::String("shadowed one".into())));
        assert_eq!(shadow.get("two"), Some(&Value::String("two".into())));
        shadow.pop();

        assert_eq!(shadow.get("one"), Some(&Value::String("one".into())));
        assert_eq!(shadow.get("two"), Some(&Value::String("two".into())));
    }

    #[test]
    fn test_shadow_innermost_wins() {
        let store = Store::new().with_must("v", 0);
        let mut shadow = Shadow::new(&store);
        shadow.push();
        shadow.insert("v", Value::Int(1));
        shadow.push();
        shadow.insert("v", Value::Int(2));

        assert_eq!(shadow.get("v"), Some(&Value::Int(2)));
        shadow.pop();

        assert_eq!(shadow.get("v"), Some(&Value::Int(1)));
    }

    #[test]
    #[should_panic(expected = "base frame must never be removed")]
    fn test_shadow_pop_empty() {
        let store = Store::new();
        let mut shadow = Shadow::new(&store);

        shadow.pop();
    }
}
