use crate::credentials::Credentials;
use crate::error::{AppError, Result};
use crate::models::Feed;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_PREFIX: &str = "ads-sheet-etl";
const DEFAULTS_FILE: &str = "credenciais_padrao.txt";

/// Client loaded when none is given on the command line.
pub const DEFAULT_CLIENT: &str = "muse";

const DEFAULT_DATE_COLUMN: &str = "Dia";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Locations of the shared and client-specific credential files.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPaths {
    pub defaults: PathBuf,
    pub client: PathBuf,
}

impl CredentialPaths {
    /// Resolve credential paths, falling back to the XDG config directory for
    /// any path not given explicitly.
    pub fn resolve(
        client: &str,
        defaults: Option<PathBuf>,
        client_file: Option<PathBuf>,
    ) -> Result<Self> {
        let defaults = match defaults {
            Some(path) => path,
            None => Self::config_file(DEFAULTS_FILE)?,
        };
        let client = match client_file {
            Some(path) => path,
            None => Self::config_file(&client_file_name(client))?,
        };

        Ok(Self { defaults, client })
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    fn config_file(name: &str) -> Result<PathBuf> {
        Self::xdg_dirs()
            .place_config_file(name)
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }
}

fn client_file_name(client: &str) -> String {
    format!("{}_credenciais_variaveis.txt", client)
}

#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: Option<u16>,
    pub instance: Option<String>,
    pub database: String,
    pub username: String,
    pub password: String,
    pub trust_server_certificate: bool,
    pub connect_timeout: Duration,
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("instance", &self.instance)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    fn from_credentials(creds: &Credentials) -> Result<Self> {
        let (host, port, instance) = parse_server(creds.get("server")?)?;
        let trust_server_certificate = creds
            .get_optional("trust_server_certificate")
            .map(parse_flag)
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            instance,
            database: creds.get("database")?.to_string(),
            username: creds.get("username")?.to_string(),
            password: creds.get("password")?.to_string(),
            trust_server_certificate,
            connect_timeout: CONNECT_TIMEOUT,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleConfig {
    /// Service-account JSON key file.
    pub credentials_path: PathBuf,
    pub spreadsheet_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub worksheet: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    /// Column holding the calendar date of each row, in both sheet and table.
    pub date_column: String,
    pub meta_ads: FeedConfig,
    pub google_ads: FeedConfig,
}

impl EtlConfig {
    pub fn feed(&self, feed: Feed) -> &FeedConfig {
        match feed {
            Feed::MetaAds => &self.meta_ads,
            Feed::GoogleAds => &self.google_ads,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub client: String,
    pub log_path: PathBuf,
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    pub etl: EtlConfig,
}

impl Config {
    pub fn load(paths: &CredentialPaths, client: &str) -> Result<Self> {
        let defaults = Credentials::load(&paths.defaults, None)?;
        let overrides = Credentials::load(&paths.client, Some(client))?;

        Self::from_credentials(client, &defaults, &overrides)
    }

    /// Build the typed configuration, with client values taking precedence
    /// over shared defaults.
    pub fn from_credentials(
        client: &str,
        defaults: &Credentials,
        overrides: &Credentials,
    ) -> Result<Self> {
        let creds = defaults.overlay(overrides);

        let feed_config = |feed: Feed| -> Result<FeedConfig> {
            Ok(FeedConfig {
                worksheet: creds.get(feed.worksheet_key())?.to_string(),
                table: creds.get(feed.table_key())?.to_string(),
            })
        };

        let etl = EtlConfig {
            date_column: creds
                .get_optional("coluna_data")
                .unwrap_or(DEFAULT_DATE_COLUMN)
                .to_string(),
            meta_ads: feed_config(Feed::MetaAds)?,
            google_ads: feed_config(Feed::GoogleAds)?,
        };

        Ok(Self {
            client: client.to_string(),
            log_path: PathBuf::from(creds.get("log_path")?),
            database: DatabaseConfig::from_credentials(&creds)?,
            google: GoogleConfig {
                credentials_path: PathBuf::from(creds.get("credentials_google_path")?),
                spreadsheet_id: creds.get("sheet_id")?.to_string(),
            },
            etl,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Split an ODBC-style server string into host, port and instance name.
///
/// Accepts `host`, `host,port`, `host\instance` and an optional `tcp:` prefix.
fn parse_server(server: &str) -> Result<(String, Option<u16>, Option<String>)> {
    let server = server.trim();
    let server = server.strip_prefix("tcp:").unwrap_or(server);

    let (rest, port) = match server.split_once(',') {
        Some((rest, port)) => {
            let port = port.trim().parse::<u16>().map_err(|e| {
                AppError::Config(format!("Invalid port '{}' in server: {}", port, e))
            })?;
            (rest, Some(port))
        }
        None => (server, None),
    };

    let (host, instance) = match rest.split_once('\\') {
        Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
        _ => (rest, None),
    };

    if host.is_empty() {
        return Err(AppError::Config("Server host must not be empty".to_string()));
    }

    Ok((host.to_string(), port, instance))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "sim" => Ok(true),
        "no" | "false" | "0" | "nao" | "não" => Ok(false),
        other => Err(AppError::Config(format!("Invalid boolean flag '{}'", other))),
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub(crate) const DEFAULTS: &str = "\
username = 'etl'
password = 's3cret'
server = 'sql.example.com,1433'
database = 'dashboards'
credentials_google_path = '/etc/ads/service-account.json'
tabela_metaads = 'Meta Ads'
tabela_googleads = 'Google Ads'
";

    pub(crate) const CLIENT: &str = "\
log_path = '/var/log/ads/{cliente}.log'
sheet_id = '{1AbCdEf}'
tabela_bd_meta = 'dbo.{cliente}_meta_ads'
tabela_bd_google = 'dbo.{cliente}_google_ads'
";

    pub(crate) fn mock_config() -> Config {
        let defaults = Credentials::parse(DEFAULTS, None).unwrap();
        let client = Credentials::parse(CLIENT, Some("muse")).unwrap();
        Config::from_credentials("muse", &defaults, &client).unwrap()
    }
}
