//! mIRC-style control codes for styling message text.
//!
//! ```
//! use perch_irc::formatting::{Bold, Colour, Coloured};
//! let text = format!("{} {}", Bold("loud"), Coloured("red", Colour::Red));
//! assert_eq!(text, "\x02loud\x02 \x0304red\x03");
//! ```

use std::fmt::{Display, Formatter, Result};

macro_rules! style_generate {
    ($($ident:ident: $code:expr)*) => {
        $(
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub struct $ident<T>(pub T);
        impl<T: Display> Display for $ident<T> {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result {
                write!(f, "{code}{}{code}", self.0, code = $code)
            }
        }
        )*
    };
}

style_generate! {
    Bold:          "\x02"
    Italics:       "\x1D"
    Underline:     "\x1F"
    Strikethrough: "\x1E"
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Colour {
    White = 0,
    Black,
    Blue,
    Green,
    Red,
    Brown,
    Magenta,
    Orange,
    Yellow,
    LightGreen,
    Cyan,
    LightCyan,
    LightBlue,
    Pink,
    Grey,
    LightGrey,
    Default = 99,
}

impl Colour {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Coloured<T>(pub T, pub Colour);

impl<T: Display> Display for Coloured<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "\x03{:02}{}\x03", self.1.code(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles() {
        assert_eq!(Bold("a").to_string(), "\x02a\x02");
        assert_eq!(Italics("a").to_string(), "\x1Da\x1D");
        assert_eq!(Underline("a").to_string(), "\x1Fa\x1F");
        assert_eq!(Strikethrough("a").to_string(), "\x1Ea\x1E");
    }

    #[test]
    fn colours() {
        assert_eq!(Coloured("a", Colour::White).to_string(), "\x0300a\x03");
        assert_eq!(Coloured("a", Colour::LightGrey).to_string(), "\x0315a\x03");
        assert_eq!(Coloured("a", Colour::Default).to_string(), "\x0399a\x03");
        assert_eq!(
            Bold(Coloured(42, Colour::Green)).to_string(),
            "\x02\x030342\x03\x02"
        );
    }

    #[test]
    fn padded_codes_survive_leading_digits() {
        let text = Coloured("2024", Colour::Red).to_string();
        assert_eq!(text, "\x03042024\x03");
        assert!(!text.starts_with("\x0342"));
    }
}
