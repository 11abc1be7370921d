use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub surname: String,
}

impl Customer {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self { name: name.into(), surname: surname.into() }
    }

    /// Matches a caller-supplied name pair the way SQLite's `UPPER` does:
    /// input is trimmed and only ASCII letters fold case.
    pub fn matches(&self, name: &str, surname: &str) -> bool {
        self.name.to_ascii_uppercase() == name.trim().to_ascii_uppercase()
            && self.surname.to_ascii_uppercase() == surname.trim().to_ascii_uppercase()
    }
}
