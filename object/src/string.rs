use core::fmt;

/// Immutable text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Str(String);

impl Str {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn concat(&self, other: &Str) -> Str {
        let mut text = String::with_capacity(self.0.len() + other.0.len());
        text.push_str(&self.0);
        text.push_str(&other.0);
        Str(text)
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
