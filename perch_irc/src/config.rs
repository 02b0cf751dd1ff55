use std::time::Duration;

use perch_config::{Ephemeral, Secret};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password.replace(Secret(password.into()));
        self
    }
}

/// Everything a session needs to know about one server.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// A name for this network, grants are keyed by it
    pub server_name: String,
    pub host: String,
    pub port: u16,

    #[serde(default = "defaults::nickname")]
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    /// Server password, read from the named env var
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Ephemeral>,

    #[serde(default)]
    pub wallops: bool,
    #[serde(default)]
    pub invisible: bool,

    /// Milliseconds between paced lines
    #[serde(default = "defaults::throttle_interval")]
    pub throttle_interval: u64,

    #[serde(default = "defaults::autotry_next_nick")]
    pub autotry_next_nick: bool,
    #[serde(default = "defaults::max_nick_tries")]
    pub max_nick_tries: usize,

    #[serde(default)]
    pub initial_channels: Vec<Channel>,
}

mod defaults {
    pub fn nickname() -> String {
        String::from("perch")
    }
    pub const fn throttle_interval() -> u64 {
        200
    }
    pub const fn autotry_next_nick() -> bool {
        true
    }
    pub const fn max_nick_tries() -> usize {
        3
    }
}

impl Config {
    pub fn new(server_name: &str, host: &str, port: u16) -> Self {
        Self {
            server_name: server_name.to_string(),
            host: host.to_string(),
            port,
            nickname: defaults::nickname(),
            username: None,
            real_name: None,
            password: None,
            wallops: false,
            invisible: false,
            throttle_interval: defaults::throttle_interval(),
            autotry_next_nick: defaults::autotry_next_nick(),
            max_nick_tries: defaults::max_nick_tries(),
            initial_channels: vec![],
        }
    }

    pub fn with_nickname(mut self, nickname: &str) -> Self {
        self.nickname = nickname.to_string();
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.initial_channels.push(channel);
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn real_name(&self) -> &str {
        self.real_name.as_deref().unwrap_or(&self.nickname)
    }

    pub const fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_interval)
    }

    /// The `<mode>` argument of `USER`
    pub const fn user_mode(&self) -> u8 {
        let mut mode = 0;
        if self.wallops {
            mode += 4;
        }
        if self.invisible {
            mode += 8;
        }
        mode
    }

    pub fn validate(&self) -> Result<(), String> {
        let fail = |msg: &str| Err(format!("{}: {msg}", self.server_name));
        if self.server_name.trim().is_empty() {
            return Err(String::from("server_name cannot be empty"));
        }
        if self.host.trim().is_empty() {
            return fail("host cannot be empty");
        }
        if self.port == 0 {
            return fail("port must be at least 1");
        }
        if self.nickname.is_empty() || self.nickname.contains(char::is_whitespace) {
            return fail("nickname must be a single non-empty word");
        }
        if self.throttle_interval == 0 {
            return fail("throttle_interval must be at least 1");
        }
        if self.max_nick_tries == 0 {
            return fail("max_nick_tries must be at least 1");
        }
        if let Some(channel) = self.initial_channels.iter().find(|c| c.name.is_empty()) {
            return fail(&format!("channel {channel:?} has no name"));
        }
        Ok(())
    }
}
