//! Connection-related data models.
//!
//! This module defines the backend kinds and the credential bundle every
//! operation receives.

use serde::{Deserialize, Serialize};

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }

    /// Whether the backend has server-level databases that can be created,
    /// dropped and switched between.
    pub fn has_databases(&self) -> bool {
        matches!(self, Self::MySQL)
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(format!("Unknown backend '{}'. Use: mysql, sqlite", other)),
        }
    }
}

/// Credentials and target for one server.
///
/// Immutable: switching database yields a new value via [`ConnectionInfo::with_database`].
/// For SQLite, `host` is the path of the database file.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub db_type: DatabaseType,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    secret: String,
    /// None for a server-level connection.
    pub database: Option<String>,
}

impl ConnectionInfo {
    /// Create connection info for a MySQL server.
    pub fn mysql(
        host: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            db_type: DatabaseType::MySQL,
            host: host.into(),
            port: None,
            user: user.into(),
            secret: secret.into(),
            database: None,
        }
    }

    /// Create connection info for a SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            db_type: DatabaseType::SQLite,
            host: path.into(),
            port: None,
            user: String::new(),
            secret: String::new(),
            database: None,
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// A copy of this info targeting `database`.
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..self.clone()
        }
    }

    /// A copy of this info with no database selected.
    pub fn server_level(&self) -> Self {
        Self {
            database: None,
            ..self.clone()
        }
    }

    /// The password. Contains sensitive data - never log.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The port to dial, falling back to the backend default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.db_type.default_port())
    }

    /// Display-safe description of the target (credentials masked).
    pub fn masked(&self) -> String {
        match self.db_type {
            DatabaseType::SQLite => format!("sqlite:{}", self.host),
            DatabaseType::MySQL => {
                let port = self
                    .effective_port()
                    .map(|p| format!(":{}", p))
                    .unwrap_or_default();
                let db = self.database.as_deref().unwrap_or("");
                format!("mysql://{}:****@{}{}/{}", self.user, self.host, port, db)
            }
        }
    }
}

impl std::fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("secret", &"****")
            .field("database", &self.database)
            .finish()
    }
}
