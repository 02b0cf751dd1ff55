/// A permission level held by everyone matching `mask` on one server.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Grant {
    pub server_name: String,
    /// A glob over `nick!user@host`, always lower-case
    pub mask: String,
    pub level: u32,
}

impl Grant {
    pub fn new(server_name: &str, mask: &str, level: u32) -> Self {
        Self {
            server_name: server_name.to_string(),
            mask: mask.to_ascii_lowercase(),
            level,
        }
    }

    pub fn matches(&self, address: &str) -> bool {
        crate::mask::matches(&self.mask, address)
    }
}

/// A mutation the authority carried out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Added(Grant),
    Updated { previous: u32, grant: Grant },
    Revoked(Grant),
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added(Grant { mask, level, .. }) => {
                write!(f, "added permission for {mask} with level {level}")
            }
            Self::Updated {
                previous,
                grant: Grant { mask, level, .. },
            } => write!(
                f,
                "updated permission for {mask} from level {previous} to {level}"
            ),
            Self::Revoked(Grant { mask, .. }) => write!(f, "deleted permission for {mask}"),
        }
    }
}

/// Why the authority refused a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Refusal {
    /// The caller's own level is below what the change needs
    Insufficient { caller: u32, required: u32 },
    InvalidLevel { max: u32 },
    InvalidMask(String),
    NotFound(String),
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insufficient { caller, required } => write!(
                f,
                "you cannot modify a permission of level {required} with level {caller}"
            ),
            Self::InvalidLevel { max } => {
                write!(f, "invalid level, it must be a number between 1 and {max}")
            }
            Self::InvalidMask(mask) => {
                write!(f, "invalid mask '{mask}', it must look like nick!user@host")
            }
            Self::NotFound(mask) => write!(f, "no permission found for {mask}"),
        }
    }
}

pub type Decision = Result<Change, Refusal>;
