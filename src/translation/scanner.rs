/// Lexical context while walking a SQL fragment.
#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `$tag$` opener at `start`; returns the tag and the index of its closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphabetic() || b == b'_' || (idx > start + 1 && b.is_ascii_digit())) {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end] == *tag.as_bytes()
        && bytes.get(end) == Some(&b'$')
}

/// Advance `state` for the byte at `idx`, returning the index of the last byte consumed.
///
/// Only called for non-`Normal` states.
pub(super) fn step_quoted(state: &mut State, bytes: &[u8], idx: usize) -> usize {
    let b = bytes[idx];
    match state {
        State::Normal => idx,
        State::SingleQuoted => close_on(state, bytes, idx, b'\''),
        State::DoubleQuoted => close_on(state, bytes, idx, b'"'),
        State::BacktickQuoted => close_on(state, bytes, idx, b'`'),
        State::LineComment => {
            if b == b'\n' {
                *state = State::Normal;
            }
            idx
        }
        State::BlockComment(depth) => {
            if is_block_comment_start(bytes, idx) {
                *depth += 1;
                idx + 1
            } else if is_block_comment_end(bytes, idx) {
                if *depth == 1 {
                    *state = State::Normal;
                } else {
                    *depth -= 1;
                }
                idx + 1
            } else {
                idx
            }
        }
        State::DollarQuoted(tag) => {
            if b == b'$' && matches_tag(bytes, idx, tag) {
                let end = idx + tag.len() + 1;
                *state = State::Normal;
                end
            } else {
                idx
            }
        }
    }
}

fn close_on(state: &mut State, bytes: &[u8], idx: usize, quote: u8) -> usize {
    if bytes[idx] != quote {
        return idx;
    }
    // doubled quote is an escaped quote character
    if bytes.get(idx + 1) == Some(&quote) {
        return idx + 1;
    }
    *state = State::Normal;
    idx
}
