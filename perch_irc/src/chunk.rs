use crate::{command::PRIVMSG, Frame};

/// The largest line a server has to accept, terminator included
pub const MAX_LINE_LENGTH: usize = 512;

/// How many bytes of text fit in one `PRIVMSG` to `target`
pub fn budget(target: &str) -> usize {
    let overhead = PRIVMSG.len() + 1 + target.len() + 2;
    MAX_LINE_LENGTH.saturating_sub(overhead + 2).max(1)
}

/// Splits `text` into `PRIVMSG` lines for `target` (without terminators).
///
/// Both `\r` and `\n` start a new message, so the text can never end a
/// protocol line early. Each line is cut into pieces that fit the budget,
/// never inside a character. `NUL`s and blank lines are dropped.
pub fn reply_lines(target: &str, text: &str) -> Vec<String> {
    let budget = budget(target);
    let mut out = vec![];
    for line in text.split(['\r', '\n']) {
        let line = line.replace('\0', "");
        out.extend(
            windows(&line, budget)
                .into_iter()
                .map(|part| Frame::new(PRIVMSG).param(target).trailing(part).to_string()),
        );
    }
    out
}

fn windows(mut line: &str, budget: usize) -> Vec<&str> {
    let mut out = vec![];
    while !line.is_empty() {
        let mut end = budget.min(line.len());
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        // a single character wider than the budget still has to go somewhere
        if end == 0 {
            end = line.chars().next().map_or(line.len(), char::len_utf8);
        }
        let (head, tail) = line.split_at(end);
        out.push(head);
        line = tail;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_accounts_for_overhead() {
        // "PRIVMSG #perch :" is 16 bytes, plus the terminator
        assert_eq!(budget("#perch"), 512 - 16 - 2);
    }

    #[test]
    fn short_reply() {
        assert_eq!(
            reply_lines("#perch", "hello there"),
            ["PRIVMSG #perch :hello there"]
        );
    }

    #[test]
    fn long_line_is_split_and_rejoins() {
        let text = (0..1000)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect::<String>();

        let lines = reply_lines("#perch", &text);
        assert!(lines.len() > 1);

        let budget = budget("#perch");
        let mut joined = String::new();
        for line in &lines {
            assert!(line.len() + 2 <= MAX_LINE_LENGTH);
            let frame = Frame::decode(line);
            assert_eq!(frame.command, "PRIVMSG");
            assert_eq!(frame.params, ["#perch"]);
            let trailing = frame.trailing.unwrap();
            assert!(trailing.len() <= budget);
            joined.push_str(&trailing);
        }
        assert_eq!(joined, text);
    }

    #[test]
    fn newlines_split_first() {
        let lines = reply_lines("bob", "one\r\ntwo\n\nthree");
        assert_eq!(
            lines,
            ["PRIVMSG bob :one", "PRIVMSG bob :two", "PRIVMSG bob :three"]
        );
    }

    #[test]
    fn carriage_returns_cannot_end_the_line() {
        let lines = reply_lines("#perch", "hi\rQUIT :gone\0\0 now");
        assert_eq!(lines, ["PRIVMSG #perch :hi", "PRIVMSG #perch :QUIT :gone now"]);
        for line in &lines {
            assert!(!line.contains(['\r', '\n', '\0']));
        }
    }

    #[test]
    fn never_splits_a_character() {
        let text = "ü".repeat(600);
        let lines = reply_lines("#perch", &text);
        let joined = lines
            .iter()
            .map(|line| Frame::decode(line).trailing.unwrap())
            .collect::<String>();
        assert_eq!(joined, text);
        for line in lines {
            assert!(line.len() + 2 <= MAX_LINE_LENGTH);
        }
    }

    #[test]
    fn empty_reply() {
        assert!(reply_lines("#perch", "").is_empty());
        assert!(reply_lines("#perch", "\n\n").is_empty());
    }
}
