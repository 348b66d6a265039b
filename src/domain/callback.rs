use std::collections::HashMap;

/// Query or form parameters a bank sends back with the user's redirect.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams(HashMap<String, String>);

impl CallbackParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Merges `other` on top of `self`; used to combine query string and form body.
    pub fn merge(mut self, other: CallbackParams) -> Self {
        self.0.extend(other.0);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
