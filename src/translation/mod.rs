use std::borrow::Cow;

mod scanner;

use scanner::{
    State, is_block_comment_start, is_line_comment_start, scan_digits, step_quoted,
    try_start_dollar_quote,
};

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1` (PostgreSQL).
    Dollar,
    /// `?1` (SQLite).
    QuestionNumbered,
    /// Bare positional `?` (MySQL, MariaDB, ClickHouse).
    Question,
    /// `@P1` (SQL Server).
    AtP,
    /// `:1` (Oracle, DaMeng).
    ColonNumbered,
}

impl PlaceholderStyle {
    /// Render the placeholder for 1-based parameter `n`.
    #[must_use]
    pub fn render(self, n: usize) -> String {
        match self {
            PlaceholderStyle::Dollar => format!("${n}"),
            PlaceholderStyle::QuestionNumbered => format!("?{n}"),
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::AtP => format!("@P{n}"),
            PlaceholderStyle::ColonNumbered => format!(":{n}"),
        }
    }

    /// Whether placeholders carry their own position.
    #[must_use]
    pub fn is_numbered(self) -> bool {
        !matches!(self, PlaceholderStyle::Question)
    }
}

/// A fragment whose `$N` placeholders were rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebased<'a> {
    pub sql: Cow<'a, str>,
    /// 0-based indices into the fragment's own parameters, in order of appearance.
    ///
    /// Positional (`?`) styles must bind parameters in exactly this order, repeating an index
    /// when the fragment reuses a placeholder.
    pub order: Vec<usize>,
}

/// Rewrite the `$N` placeholders of a caller-supplied fragment for `target`, shifting each
/// number by `offset` (the count of parameters already bound before the fragment).
///
/// Placeholders inside quoted strings, quoted identifiers, comments and dollar-quoted blocks
/// are left alone. Returns a borrowed `Cow` when nothing changes.
#[must_use]
pub fn rebase_placeholders(sql: &str, offset: usize, target: PlaceholderStyle) -> Rebased<'_> {
    let mut out: Option<String> = None;
    let mut order = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    let mut copied_to = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        if !matches!(state, State::Normal) {
            idx = step_quoted(&mut state, bytes, idx) + 1;
            continue;
        }
        match bytes[idx] {
            b'\'' => state = State::SingleQuoted,
            b'"' => state = State::DoubleQuoted,
            b'`' => state = State::BacktickQuoted,
            _ if is_line_comment_start(bytes, idx) => {
                state = State::LineComment;
                idx += 1;
            }
            _ if is_block_comment_start(bytes, idx) => {
                state = State::BlockComment(1);
                idx += 1;
            }
            b'$' => {
                if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                    state = State::DollarQuoted(tag);
                    idx = advance;
                } else if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1)
                    && let Ok(n) = digits.parse::<usize>()
                    && n > 0
                {
                    order.push(n - 1);
                    let rendered = target.render(n + offset);
                    if out.is_some() || rendered != sql[idx..digits_end] {
                        let buf = out.get_or_insert_with(String::new);
                        buf.push_str(&sql[copied_to..idx]);
                        buf.push_str(&rendered);
                        copied_to = digits_end;
                    }
                    idx = digits_end;
                    continue;
                }
            }
            _ => {}
        }
        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    Rebased { sql, order }
}

/// Translate `$N` placeholders to `target` without shifting.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    rebase_placeholders(sql, 0, target).sql
}
