use std::str::FromStr;

fn find_token<S: AsRef<str>>(lines: &[S], token: &str) -> Option<usize> {
    let token = token.to_lowercase();
    lines
        .iter()
        .position(|line| line.as_ref().to_lowercase().contains(&token))
}

fn parse_line<T: FromStr, S: AsRef<str>>(lines: &[S], idx: usize) -> Option<T> {
    lines.get(idx)?.as_ref().trim().parse().ok()
}

/// Parses the line preceding the first line that contains `token`
/// (case-insensitive).
pub fn value_before_token<T: FromStr, S: AsRef<str>>(lines: &[S], token: &str) -> Option<T> {
    let idx = find_token(lines, token)?;
    parse_line(lines, idx.checked_sub(1)?)
}

/// Parses the line following the first line that contains `token`
/// (case-insensitive).
pub fn value_after_token<T: FromStr, S: AsRef<str>>(lines: &[S], token: &str) -> Option<T> {
    let idx = find_token(lines, token)?;
    parse_line(lines, idx + 1)
}
