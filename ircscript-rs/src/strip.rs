//! Removal of IRC formatting codes.
//!
//! | Byte   | Meaning                                            |
//! |--------|----------------------------------------------------|
//! | `0x02` | bold                                               |
//! | `0x03` | colour, followed by `fg[,bg]` of up to two digits  |
//! | `0x04` | hex colour, followed by `RRGGBB[,RRGGBB]`          |
//! | `0x0F` | reset                                              |
//! | `0x11` | monospace                                          |
//! | `0x16` | reverse                                            |
//! | `0x1D` | italic                                             |
//! | `0x1E` | strikethrough                                      |
//! | `0x1F` | underline                                          |

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

fn control_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\x03(?:\d{1,2}(?:,\d{1,2})?)?|\x04(?:[0-9A-Fa-f]{6}(?:,[0-9A-Fa-f]{6})?)?|[\x02\x0F\x11\x16\x1D\x1E\x1F]",
        )
        .expect("static regex")
    })
}

/// Strip every formatting code from `text`, keeping the visible characters.
pub fn strip_codes(text: &str) -> Cow<'_, str> {
    control_re().replace_all(text, "")
}
