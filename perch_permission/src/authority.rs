use std::sync::Arc;

use perch_irc::Identity;
use tokio::sync::Mutex;

use crate::{mask, Change, Decision, Grant, GrantStore, Refusal};

/// Decides who may do what, and who may hand out levels.
///
/// Checks read a fresh snapshot from the store each time. Mutations are
/// serialized so two callers can't race past the privilege checks.
pub struct Authority {
    store: Arc<dyn GrantStore>,
    max_level: u32,
    writer: Mutex<()>,
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("max_level", &self.max_level)
            .finish_non_exhaustive()
    }
}

impl Authority {
    pub fn new(store: Arc<dyn GrantStore>, max_level: u32) -> Self {
        Self {
            store,
            max_level,
            writer: Mutex::new(()),
        }
    }

    pub const fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Whether `sender` holds at least `required` on `server_name`.
    ///
    /// Level 0 is open to everyone and never touches the store.
    pub async fn check(&self, required: u32, sender: &Identity, server_name: &str) -> bool {
        if required == 0 {
            return true;
        }

        let level = self.level_of(sender, server_name).await;
        if level < required {
            log::debug!("{sender} on {server_name} has level {level}, needs {required}");
            return false;
        }
        true
    }

    /// The highest level among the grants matching `sender`
    pub async fn level_of(&self, sender: &Identity, server_name: &str) -> u32 {
        let address = sender.address();
        self.highest(server_name, |grant| grant.matches(&address))
            .await
    }

    /// The level of a user as named in an admin query, either a bare
    /// nickname or a mask. The query is matched against the stored masks.
    pub async fn level_for(&self, query: &str, server_name: &str) -> u32 {
        let pattern = mask::from_query(query);
        self.highest(server_name, |grant| mask::matches(&pattern, &grant.mask))
            .await
    }

    async fn highest(&self, server_name: &str, filter: impl Fn(&Grant) -> bool) -> u32 {
        match self.store.grants(server_name).await {
            Ok(grants) => grants
                .iter()
                .filter(|grant| filter(grant))
                .map(|grant| grant.level)
                .max()
                .unwrap_or(0),
            Err(err) => {
                log::warn!("cannot read grants for {server_name}: {err:#}");
                0
            }
        }
    }

    async fn existing(&self, server_name: &str, mask: &str) -> anyhow::Result<Option<Grant>> {
        let grants = self.store.grants(server_name).await?;
        Ok(grants
            .into_iter()
            .find(|grant| grant.mask.eq_ignore_ascii_case(mask)))
    }

    /// Adds a grant for `mask`, or changes the level of an existing one
    pub async fn grant(
        &self,
        caller: &Identity,
        server_name: &str,
        mask: &str,
        level: u32,
    ) -> anyhow::Result<Decision> {
        if !(1..=self.max_level).contains(&level) {
            return Ok(Err(Refusal::InvalidLevel {
                max: self.max_level,
            }));
        }
        if !mask::is_valid(mask) {
            return Ok(Err(Refusal::InvalidMask(mask.to_string())));
        }

        let _writer = self.writer.lock().await;

        let caller_level = self.level_of(caller, server_name).await;
        if caller_level < level {
            return Ok(Err(self.refuse(caller, caller_level, level)));
        }

        let grant = Grant::new(server_name, mask, level);
        let change = match self.existing(server_name, mask).await? {
            Some(existing) if caller_level < existing.level => {
                return Ok(Err(self.refuse(caller, caller_level, existing.level)));
            }
            Some(existing) => {
                self.store
                    .update(server_name, &existing.mask, grant.clone())
                    .await?;
                Change::Updated {
                    previous: existing.level,
                    grant,
                }
            }
            None => {
                self.store.insert(grant.clone()).await?;
                Change::Added(grant)
            }
        };

        log::info!("{caller} on {server_name}: {change}");
        Ok(Ok(change))
    }

    /// Removes the grant for `mask`
    pub async fn revoke(
        &self,
        caller: &Identity,
        server_name: &str,
        mask: &str,
    ) -> anyhow::Result<Decision> {
        let _writer = self.writer.lock().await;

        let Some(existing) = self.existing(server_name, mask).await? else {
            return Ok(Err(Refusal::NotFound(mask.to_ascii_lowercase())));
        };

        let caller_level = self.level_of(caller, server_name).await;
        if caller_level < existing.level {
            return Ok(Err(self.refuse(caller, caller_level, existing.level)));
        }

        self.store.delete(server_name, &existing.mask).await?;
        let change = Change::Revoked(existing);
        log::info!("{caller} on {server_name}: {change}");
        Ok(Ok(change))
    }

    fn refuse(&self, caller: &Identity, level: u32, required: u32) -> Refusal {
        log::warn!("{caller} (level {level}) tried to modify a level {required} permission");
        Refusal::Insufficient {
            caller: level,
            required,
        }
    }
}
