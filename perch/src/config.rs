use std::{collections::BTreeMap, path::PathBuf};

use perch_config::Ephemeral;
use perch_irc::Channel;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "defaults::command_prefix")]
    pub command_prefix: String,
    #[serde(default = "defaults::max_permission_level")]
    pub max_permission_level: u32,
    /// Where grants are kept, `.json` is appended
    #[serde(default = "defaults::permissions_path")]
    pub permissions_path: PathBuf,
    #[serde(default = "defaults::source_url")]
    pub source_url: String,

    /// Level needed per command, anything missing is open to everyone
    #[serde(default)]
    pub commands: BTreeMap<String, u32>,

    pub clients: Vec<perch_irc::Config>,
}

mod defaults {
    use std::path::PathBuf;

    pub fn command_prefix() -> String {
        String::from("!")
    }
    pub const fn max_permission_level() -> u32 {
        100
    }
    pub fn permissions_path() -> PathBuf {
        PathBuf::from("./data/permissions")
    }
    pub fn source_url() -> String {
        String::from("https://github.com/perch-irc/perch")
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.command_prefix.is_empty() && !self.command_prefix.contains(char::is_whitespace),
            "command_prefix must be a non-empty word"
        );
        anyhow::ensure!(
            self.max_permission_level > 0,
            "max_permission_level must be at least 1"
        );
        anyhow::ensure!(!self.clients.is_empty(), "no clients are configured");

        for client in &self.clients {
            client.validate().map_err(anyhow::Error::msg)?;
        }

        if let Some((name, level)) = self
            .commands
            .iter()
            .find(|(_, &level)| level > self.max_permission_level)
        {
            anyhow::bail!(
                "command '{name}' needs level {level}, above max_permission_level ({})",
                self.max_permission_level
            )
        }
        Ok(())
    }

    pub fn default_config() -> Self {
        let mut client = perch_irc::Config::new("Rizon", "irc.rizon.net", 6667)
            .with_nickname("perch")
            .with_channel(Channel::new("#perch"));
        client.password.replace(Ephemeral::from_var("PERCH_SERVER_PASSWORD"));

        Self {
            command_prefix: defaults::command_prefix(),
            max_permission_level: defaults::max_permission_level(),
            permissions_path: defaults::permissions_path(),
            source_url: defaults::source_url(),
            commands: [(String::from("permission"), 1)].into_iter().collect(),
            clients: vec![client],
        }
    }
}
