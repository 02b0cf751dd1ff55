use crate::Identity;

/// One decoded protocol line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub prefix: Option<Identity>,
    pub command: String,
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl Frame {
    /// Decodes a line. This never fails: whatever could be read is kept and an
    /// unreadable line ends up with an empty `command`.
    pub fn decode(line: &str) -> Self {
        let mut line = line.trim_end_matches(['\r', '\n']);
        let line = &mut line;

        let prefix = prefix(line);
        let command = command(line).to_string();
        let (params, trailing) = arguments(*line);

        Self {
            prefix,
            command,
            params,
            trailing,
        }
    }

    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing.replace(trailing.into());
        self
    }

    pub fn is_malformed(&self) -> bool {
        self.command.is_empty()
    }

    /// Three digit reply codes
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|c| c.is_ascii_digit())
    }

    /// All arguments in order, with the trailing text as the last one.
    ///
    /// Servers differ on whether the last argument gets a `:` (e.g. `NICK new`
    /// and `NICK :new`), this treats them the same.
    pub fn args(&self) -> impl Iterator<Item = &str> + '_ {
        self.params
            .iter()
            .map(String::as_str)
            .chain(self.trailing.as_deref())
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args().nth(index)
    }

    pub fn last_arg(&self) -> Option<&str> {
        self.trailing
            .as_deref()
            .or_else(|| self.params.last().map(String::as_str))
    }

    pub fn nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Identity::nickname)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        if let Some(trailing) = &self.trailing {
            write!(f, " :{trailing}")?;
        }
        Ok(())
    }
}

fn split_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    input
        .split_once(char::is_whitespace)
        .unwrap_or((input, ""))
}

fn prefix(input: &mut &str) -> Option<Identity> {
    let rest = (*input).strip_prefix(':')?;
    let (head, tail) = split_token(rest);
    *input = tail;
    Some(Identity::parse(head))
}

fn command<'a>(input: &mut &'a str) -> &'a str {
    let (head, tail) = split_token(*input);
    *input = tail;
    head
}

fn arguments(input: &str) -> (Vec<String>, Option<String>) {
    let mut params = vec![];
    let mut rest = input;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return (params, None);
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            return (params, Some(trailing.to_string()));
        }
        let (head, tail) = split_token(rest);
        params.push(head.to_string());
        rest = tail;
    }
}
