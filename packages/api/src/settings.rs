use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Minimum length of the cookie signing key, in bytes.
pub const SESSION_KEY_MIN_LEN: usize = 64;

#[derive(Clone, Debug, Deserialize)]
#[allow(unused)]
pub struct Database {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
}

impl Database {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            user: "listshare".into(),
            password: "password".into(),
            host: "localhost".into(),
            port: "5432".into(),
            database: "listshare".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Server {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Session {
    /// Cookie signing key. A random key is used when unset.
    pub key: Option<String>,
    pub secure: bool,
    /// Inactivity expiry in days.
    pub expiry: i64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            key: None,
            secure: false,
            expiry: 7,
        }
    }
}

impl Session {
    /// The configured signing key, rejected when shorter than [`SESSION_KEY_MIN_LEN`].
    pub fn key_bytes(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        match self.key.as_deref() {
            None | Some("") => Ok(None),
            Some(key) if key.len() < SESSION_KEY_MIN_LEN => Err(ConfigError::Message(format!(
                "session.key must be at least {SESSION_KEY_MIN_LEN} bytes"
            ))),
            Some(key) => Ok(Some(key.as_bytes().to_vec())),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct App {
    /// Public base URL, used to build links in outgoing mail.
    pub url: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Settings {
    pub database: Database,
    pub server: Server,
    pub session: Session,
    pub app: App,
}

impl Settings {
    /// Defaults, then `listshare.toml`, then the environment (`DATABASE_HOST`, `SERVER_PORT`, ...).
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("database.user", "listshare")?
            .set_default("database.password", "password")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", "5432")?
            .set_default("database.database", "listshare")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("session.secure", false)?
            .set_default("session.expiry", 7)?
            .set_default("app.url", "http://localhost:8080")?
            .add_source(
                File::with_name("listshare.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default().separator("_"))
            .build()?;

        config.try_deserialize()
    }
}
