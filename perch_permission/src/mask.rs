use once_cell::sync::Lazy;
use regex::Regex;

/// Whether `text` matches the glob `pattern`, ignoring ASCII case.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one and everything else is literal.
pub fn matches(pattern: &str, text: &str) -> bool {
    let pattern = pattern
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .collect::<Vec<_>>();
    let text = text
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .collect::<Vec<_>>();

    let (mut p, mut t) = (0, 0);
    // pattern index just past the last `*`, and where in the text it started
    let mut star = None;
    let mut star_t = 0;

    while t < text.len() {
        match pattern.get(p) {
            Some(&'*') => {
                star.replace(p + 1);
                star_t = t;
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some(next) => {
                    p = next;
                    star_t += 1;
                    t = star_t;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Whether `mask` has the `nick!user@host` shape a grant needs
pub fn is_valid(mask: &str) -> bool {
    static SHAPE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[a-z0-9*?\[\]\\`{}^\-_|]+![a-z0-9*?~_\-.]+@[a-z0-9*?.\-:/]+$").unwrap()
    });
    SHAPE.is_match(&mask.to_ascii_lowercase())
}

/// Turns a permission query into a mask: a bare nickname matches that
/// nickname from anywhere.
pub fn from_query(query: &str) -> String {
    let query = query.to_ascii_lowercase();
    if query.contains('!') {
        query
    } else {
        format!("{query}!*@*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globs() {
        assert!(matches("*!*@*", "alice!bob@host"));
        assert!(matches("alice!*@*", "alice!bob@host"));
        assert!(matches("ALICE!*@*.example.com", "alice!a@irc.example.com"));
        assert!(matches("al?ce!*@*", "alice!bob@host"));
        assert!(matches("*", ""));
        assert!(matches("a*b*c", "aXXbYYbc"));

        assert!(!matches("bob!*@*", "alice!bob@host"));
        assert!(!matches("al?ce!*@*", "alce!bob@host"));
        assert!(!matches("alice", "alice!bob@host"));
        assert!(!matches("?", ""));
    }

    #[test]
    fn literal_brackets() {
        assert!(matches("[bot]!*@*", "[bot]!b@host"));
        assert!(!matches("[bot]!*@*", "b!b@host"));
    }

    #[test]
    fn shape() {
        assert!(is_valid("*!*@*"));
        assert!(is_valid("Nick[away]!~user@192.168.0.1"));
        assert!(is_valid("n!u@2001:db8::1"));
        assert!(is_valid("n!u@user/cloak"));

        assert!(!is_valid("nick"));
        assert!(!is_valid("nick!user"));
        assert!(!is_valid("nick@host"));
        assert!(!is_valid("nick!user@"));
        assert!(!is_valid("ni ck!user@host"));
    }

    #[test]
    fn queries() {
        assert_eq!(from_query("Alice"), "alice!*@*");
        assert_eq!(from_query("alice!*@Host"), "alice!*@host");
    }
}
