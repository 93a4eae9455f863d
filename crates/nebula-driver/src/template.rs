//! OpenNebula template text.
//!
//! Templates are an ordered list of `KEY="value"` attributes and named
//! vectors of attributes:
//!
//! ```text
//! NAME="docker-1"
//! NIC=[
//!   NETWORK="private",
//!   NETWORK_UNAME="oneadmin" ]
//! ```

use std::fmt;

/// An ordered set of template attributes and vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Value(String, String),
    Vector(Vector),
}

/// A named group of attributes, e.g. one `DISK`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    name: String,
    values: Vec<(String, String)>,
}

impl Template {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single attribute.
    pub fn add_value(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.entries
            .push(Entry::Value(key.to_string(), value.to_string()));
        self
    }

    /// Append a vector and return it for filling in.
    pub fn new_vector(&mut self, name: &str) -> &mut Vector {
        self.entries.push(Entry::Vector(Vector {
            name: name.to_string(),
            values: Vec::new(),
        }));
        match self.entries.last_mut() {
            Some(Entry::Vector(vector)) => vector,
            _ => unreachable!("a vector was just pushed"),
        }
    }

    /// Get the first single attribute with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Value(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }

    /// Iterate over all vectors with the given name, in order.
    pub fn vectors<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Vector> + 'a {
        self.entries.iter().filter_map(move |entry| match entry {
            Entry::Vector(v) if v.name == name => Some(v),
            _ => None,
        })
    }
}

impl Vector {
    /// Vector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an attribute to the vector.
    pub fn add_value(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.values.push((key.to_string(), value.to_string()));
        self
    }

    /// Get the first attribute with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of attributes in the vector.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no attributes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=[", self.name)?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "\n  {key}=")?;
            write_quoted(f, value)?;
        }
        f.write_str(" ]")
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry {
                Entry::Value(key, value) => {
                    write!(f, "{key}=")?;
                    write_quoted(f, value)?;
                }
                Entry::Vector(vector) => write!(f, "{vector}")?,
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
