use anyhow::{bail, Result};
use clap::Parser;

use crate::source::Credential;

/// Song request desk backed by a Google Sheet.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Config {
    /// Spreadsheet holding the `SetList` and `Requests` sheets.
    #[arg(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: String,

    /// API key for the Sheets API.
    #[arg(long, env = "SHEETS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OAuth access token for the Sheets API; takes the place of the API key.
    #[arg(long, env = "SHEETS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

impl Config {
    /// Exactly one of the two credentials must be given.
    pub fn credential(&self) -> Result<Credential> {
        match (&self.api_key, &self.access_token) {
            (Some(key), None) => Ok(Credential::ApiKey(key.clone())),
            (None, Some(token)) => Ok(Credential::AccessToken(token.clone())),
            (Some(_), Some(_)) => bail!("give either --api-key or --access-token, not both"),
            (None, None) => bail!("missing credential: set SHEETS_API_KEY or SHEETS_ACCESS_TOKEN"),
        }
    }
}
