//! Comment rewriting for token-joined scripts.
//!
//! Script steps end up on one line separated by `;`, so a trailing
//! `# comment` would swallow every following step. A real comment is
//! rewritten into a command substitution of the comment itself, which
//! the shell evaluates to nothing:
//!
//! ```text
//! echo "second" # some comment   ->   echo "second" `# some comment`
//! ```
//!
//! A `#` is a real comment only outside quotes, unescaped, and at the
//! start of the line or after whitespace. Backslashes and backticks inside
//! the comment are escaped so the substitution stays closed.

/// Rewrite the shell comment in a single line, if it has one.
pub fn rewrite_comment(line: &str) -> String {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut after_space = true;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            after_space = false;
            continue;
        }
        match c {
            '\\' if quote != Some('\'') => escaped = true,
            '\'' | '"' => match quote {
                None => quote = Some(c),
                Some(q) if q == c => quote = None,
                Some(_) => {}
            },
            '#' if quote.is_none() && after_space => {
                let comment = line[i..].replace('\\', "\\\\").replace('`', "\\`");
                return format!("{}`{}`", &line[..i], comment);
            }
            _ => {}
        }
        after_space = c.is_whitespace();
    }

    line.to_string()
}
