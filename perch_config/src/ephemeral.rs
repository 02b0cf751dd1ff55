/// A value that lives in the environment.
///
/// Configuration files only hold the name of an environment variable. Loading
/// one reads the variable and removes it from the process environment so child
/// processes never see it. Saving writes the name back out.
#[derive(Clone, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ephemeral {
    var: String,
    value: String,
}

impl Ephemeral {
    /// Names a variable without reading it, for writing example configs
    pub fn from_var(var: &str) -> Self {
        Self {
            var: var.to_string(),
            value: String::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl TryFrom<String> for Ephemeral {
    type Error = String;

    fn try_from(var: String) -> Result<Self, Self::Error> {
        let value = std::env::var(&var).map_err(|err| format!("env var '{var}': {err}"))?;
        std::env::remove_var(&var);
        log::trace!("read and removed env var '{var}'");
        Ok(Self { var, value })
    }
}

impl From<Ephemeral> for String {
    fn from(ephemeral: Ephemeral) -> Self {
        ephemeral.var
    }
}

impl std::fmt::Debug for Ephemeral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ephemeral")
            .field("var", &self.var)
            .field("value", &crate::redact(&self.value))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_removes_env_var() {
        std::env::set_var("PERCH_TEST_EPHEMERAL", "sekrit");
        let password: Ephemeral = serde_json::from_str(r#""PERCH_TEST_EPHEMERAL""#).unwrap();
        assert_eq!(password.value(), "sekrit");
        assert!(std::env::var("PERCH_TEST_EPHEMERAL").is_err());

        assert_eq!(
            serde_json::to_string(&password).unwrap(),
            r#""PERCH_TEST_EPHEMERAL""#
        );
        assert!(!format!("{password:?}").contains("sekrit"));
    }

    #[test]
    fn missing_env_var() {
        let err = serde_json::from_str::<Ephemeral>(r#""PERCH_TEST_MISSING_EPHEMERAL""#)
            .unwrap_err();
        assert!(err.to_string().contains("PERCH_TEST_MISSING_EPHEMERAL"));
    }

    #[test]
    fn unread_var_saves_its_name() {
        let password = Ephemeral::from_var("PERCH_SERVER_PASSWORD");
        assert_eq!(password.value(), "");
        assert_eq!(
            serde_yaml::to_string(&password).unwrap().trim(),
            "PERCH_SERVER_PASSWORD"
        );
    }
}
