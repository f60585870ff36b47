use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;

/// The MySQL default port, used when the section has no `port` key.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Every key/value pair of one section of the credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSection {
    name: String,
    entries: BTreeMap<String, String>,
}

impl DbSection {
    pub fn new(name: impl Into<String>, entries: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// The section's name, e.g. "mysql".
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The raw mapping, exactly as it appears in the file.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Extracts the connection credentials.
    ///
    /// `host`, `user` and `password` are required. `port` is optional and must
    /// be a valid TCP port when present.
    pub fn credentials(&self) -> Result<DbCredentials, ConfigError> {
        let port = match self.get("port") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "port '{raw}' in [{}] is not a valid port number",
                    self.name
                ))
            })?),
            None => None,
        };

        Ok(DbCredentials {
            host: self.required("host")?,
            user: self.required("user")?,
            password: self.required("password")?,
            port,
        })
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingKey {
                section: self.name.clone(),
                key: key.to_string(),
            })
    }
}

/// Login details for the database server.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
}

impl DbCredentials {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_MYSQL_PORT)
    }
}

// Keep the password out of logs.
impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"********")
            .field("port", &self.port)
            .finish()
    }
}
