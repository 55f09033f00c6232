use crate::error::{AppError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SEPARATOR: &str = " = ";

/// Token replaced with the client name in client-specific credential files.
pub const CLIENT_PLACEHOLDER: &str = "{cliente}";

/// Flat `key = value` credential map read from a text file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    source: PathBuf,
    values: BTreeMap<String, String>,
}

impl Credentials {
    /// Read and parse a credential file, substituting the client placeholder
    /// when `client` is given.
    pub fn load(path: &Path, client: Option<&str>) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Credentials(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut credentials = Self::parse(&contents, client).map_err(|e| match e {
            AppError::Credentials(msg) => {
                AppError::Credentials(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        credentials.source = path.to_path_buf();
        debug!(path = %path.display(), keys = credentials.values.len(), "Loaded credentials");

        Ok(credentials)
    }

    pub fn parse(contents: &str, client: Option<&str>) -> Result<Self> {
        let mut values = BTreeMap::new();

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = line.split_once(SEPARATOR).ok_or_else(|| {
                AppError::Credentials(format!(
                    "line {}: expected 'key{}value'",
                    idx + 1,
                    SEPARATOR
                ))
            })?;

            let value = match client {
                Some(client) if value.contains(CLIENT_PLACEHOLDER) => {
                    value.replace(CLIENT_PLACEHOLDER, client)
                }
                _ => value.to_string(),
            };

            values.insert(key.to_string(), strip_wrapping(&value).to_string());
        }

        Ok(Self {
            source: PathBuf::new(),
            values,
        })
    }

    /// Look up a required key.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.get_optional(key).ok_or_else(|| {
            AppError::Config(format!(
                "missing key '{}' in {}",
                key,
                self.source_name()
            ))
        })
    }

    pub fn get_optional(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Merge `other` on top of `self`; keys present in both take `other`'s value.
    pub fn overlay(&self, other: &Credentials) -> Credentials {
        let mut values = self.values.clone();
        values.extend(other.values.clone());

        let source = match (self.source.as_os_str().is_empty(), other.source.as_os_str().is_empty()) {
            (false, false) => PathBuf::from(format!(
                "{} + {}",
                self.source.display(),
                other.source.display()
            )),
            (true, _) => other.source.clone(),
            (false, true) => self.source.clone(),
        };

        Credentials { source, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn source_name(&self) -> String {
        match self.source.as_os_str().is_empty() {
            true => "credentials".to_string(),
            false => self.source.display().to_string(),
        }
    }
}

fn strip_wrapping(value: &str) -> &str {
    value
        .trim_matches('\'')
        .trim_matches(|c| c == '{' || c == '}')
}
