use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{ParseError, ParseErrorKind};
use crate::model::Binding;

/// Split UTF-8 text into ordered `KEY=VALUE` bindings.
///
/// Conventional dotenv grammar: `#` comments, blank lines, an optional
/// `export ` prefix, single/double/backtick quotes (spanning multiple lines),
/// backslash escapes inside double quotes, and inline comments after values.
/// A key assigned twice keeps its first position with the last value.
///
/// Each binding also records the verbatim source statement, so a typed
/// coercion pass can recover the right-hand side exactly as written instead
/// of the unescaped-for-plain-string `value`.
pub fn tokenize(input: &str) -> Result<Vec<Binding>, ParseError> {
    let normalized = normalize_newlines(input);
    let input = normalized.as_ref();

    let mut bindings = Vec::new();
    let mut by_key = HashMap::<String, usize>::new();

    let mut offset = 0usize;
    let mut line_num = 1u32;
    let bytes = input.as_bytes();

    while offset < bytes.len() {
        let statement_start = offset;
        let statement_line = line_num;
        let mut idx = offset;
        let mut newline_count = 0u32;
        let mut active_quote: Option<u8> = None;
        let mut value_started = false;

        while idx < bytes.len() {
            let byte = bytes[idx];

            if byte == b'\n' {
                newline_count += 1;
                if active_quote.is_none() {
                    break;
                }
            } else if let Some(quote) = active_quote {
                if byte == quote && !is_preceded_by_odd_backslashes(bytes, idx) {
                    active_quote = None;
                }
            } else if !value_started && byte == b'=' {
                value_started = true;
            } else if value_started && (byte == b'"' || byte == b'\'' || byte == b'`') {
                active_quote = Some(byte);
            }
            idx += 1;
        }

        let statement = &input[statement_start..idx];
        let parsed = parse_statement(statement, statement_line)?;
        if let Some(binding) = parsed {
            if let Some(existing_idx) = by_key.get(&binding.key).copied() {
                bindings[existing_idx] = binding;
            } else {
                by_key.insert(binding.key.clone(), bindings.len());
                bindings.push(binding);
            }
        }

        if idx < bytes.len() && bytes[idx] == b'\n' {
            idx += 1;
        }
        line_num += newline_count;
        offset = idx;
    }

    Ok(bindings)
}

fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            out.push('\n');
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            continue;
        }
        out.push(ch);
    }

    Cow::Owned(out)
}

fn is_preceded_by_odd_backslashes(bytes: &[u8], idx: usize) -> bool {
    if idx == 0 {
        return false;
    }

    let mut cursor = idx;
    let mut backslash_count = 0usize;
    while cursor > 0 && bytes[cursor - 1] == b'\\' {
        cursor -= 1;
        backslash_count += 1;
    }

    backslash_count % 2 == 1
}

fn parse_statement(statement: &str, line_num: u32) -> Result<Option<Binding>, ParseError> {
    let mut working = statement.trim_start();
    if working.is_empty() || working.starts_with('#') {
        return Ok(None);
    }

    if let Some(rest) = working.strip_prefix("export")
        && rest
            .chars()
            .next()
            .map(|ch| ch.is_whitespace())
            .unwrap_or(false)
    {
        working = rest.trim_start();
    }

    if working.is_empty() {
        return Err(ParseError::new(line_num, 1, ParseErrorKind::MissingKey));
    }

    let Some(eq_idx) = working.find('=') else {
        let column = working.chars().count() as u32 + 1;
        return Err(ParseError::new(
            line_num,
            column,
            ParseErrorKind::InvalidSyntax,
        ));
    };

    let key = working[..eq_idx].trim_end();
    if key.is_empty() {
        return Err(ParseError::new(line_num, 1, ParseErrorKind::MissingKey));
    }
    if !key.chars().all(is_valid_key_char) {
        return Err(ParseError::new(line_num, 1, ParseErrorKind::InvalidKey));
    }

    let value_input = working[eq_idx + 1..].trim_start();
    let value_column = (statement.len() - value_input.len()) as u32 + 1;
    let value = parse_value(value_input, line_num, value_column)?;

    Ok(Some(Binding {
        key: key.to_owned(),
        value,
        original: statement.to_owned(),
        line: line_num,
    }))
}

fn parse_value(input: &str, line_num: u32, column: u32) -> Result<String, ParseError> {
    if input.is_empty() {
        return Ok(String::new());
    }

    if input.starts_with('\'') {
        return parse_literal_quoted(input, '\'', line_num, column);
    }
    if input.starts_with('"') {
        return parse_double_quoted(input, line_num, column);
    }
    if input.starts_with('`') {
        return parse_literal_quoted(input, '`', line_num, column);
    }

    let value = input
        .split_once('#')
        .map(|(head, _)| head)
        .unwrap_or(input)
        .trim_end();
    Ok(value.to_owned())
}

fn parse_literal_quoted(
    input: &str,
    quote: char,
    line_num: u32,
    column: u32,
) -> Result<String, ParseError> {
    let mut closing_idx = None;
    for (idx, ch) in input.char_indices().skip(1) {
        if ch == quote {
            if is_preceded_by_odd_backslashes(input.as_bytes(), idx) {
                continue;
            }
            closing_idx = Some(idx);
            break;
        }
    }

    let Some(end_idx) = closing_idx else {
        return Err(ParseError::new(
            line_num,
            column,
            ParseErrorKind::UnterminatedQuote,
        ));
    };

    let tail = input[end_idx + 1..].trim_start();
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(ParseError::new(
            line_num,
            column + end_idx as u32 + 1,
            ParseErrorKind::InvalidSyntax,
        ));
    }

    Ok(input[1..end_idx].to_owned())
}

fn parse_double_quoted(input: &str, line_num: u32, column: u32) -> Result<String, ParseError> {
    let mut out = String::with_capacity(input.len().saturating_sub(2));
    let mut escaped = false;
    let mut closing_idx = None;

    for (idx, ch) in input.char_indices().skip(1) {
        if escaped {
            let unescaped = match ch {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '\\' => '\\',
                '"' => '"',
                _ => ch,
            };
            out.push(unescaped);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => escaped = true,
            '"' => {
                closing_idx = Some(idx);
                break;
            }
            _ => out.push(ch),
        }
    }

    let Some(end_idx) = closing_idx else {
        return Err(ParseError::new(
            line_num,
            column,
            ParseErrorKind::UnterminatedQuote,
        ));
    };

    let tail = input[end_idx + 1..].trim_start();
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(ParseError::new(
            line_num,
            column + end_idx as u32 + 1,
            ParseErrorKind::InvalidSyntax,
        ));
    }

    Ok(out)
}

fn is_valid_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_basic_values_and_comments() {
        let input = "A=1\nB = 2\n# skip\nC=hello # comment\nD=\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 4);
        assert_eq!(bindings[0].key, "A");
        assert_eq!(bindings[0].value, "1");
        assert_eq!(bindings[1].key, "B");
        assert_eq!(bindings[1].value, "2");
        assert_eq!(bindings[2].key, "C");
        assert_eq!(bindings[2].value, "hello");
        assert_eq!(bindings[3].key, "D");
        assert_eq!(bindings[3].value, "");
    }

    #[test]
    fn records_verbatim_original_statement() {
        let input = "A = \"quoted # text\"\nB=plain # comment\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings[0].original, "A = \"quoted # text\"");
        assert_eq!(bindings[0].value, "quoted # text");
        assert_eq!(bindings[1].original, "B=plain # comment");
        assert_eq!(bindings[1].value, "plain");
    }

    #[test]
    fn tokenizes_export_and_quotes() {
        let input = "export QUOTED=\"line\\nvalue\"\nSINGLE='raw value'\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].key, "QUOTED");
        assert_eq!(bindings[0].value, "line\nvalue");
        assert_eq!(bindings[0].original, "export QUOTED=\"line\\nvalue\"");
        assert_eq!(bindings[1].key, "SINGLE");
        assert_eq!(bindings[1].value, "raw value");
    }

    #[test]
    fn duplicate_keys_keep_last_value_and_first_position() {
        let input = "A=1\nB=2\nA=3\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].key, "A");
        assert_eq!(bindings[0].value, "3");
        assert_eq!(bindings[1].key, "B");
    }

    #[test]
    fn tokenizes_unicode_values() {
        let input = "GREETING=こんにちは\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].value, "こんにちは");
    }

    #[test]
    fn reports_invalid_key() {
        let input = "BAD KEY=value\n";
        let err = tokenize(input).expect_err("expected parse error");
        assert_eq!(err.kind, ParseErrorKind::InvalidKey);
    }

    #[test]
    fn reports_unterminated_quote() {
        let input = "A=\"value\n";
        let err = tokenize(input).expect_err("expected parse error");
        assert_eq!(err.kind, ParseErrorKind::UnterminatedQuote);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn tokenizes_multiline_quoted_values() {
        let input = "MULTI_DOUBLE=\"THIS\nIS\nA\nMULTILINE\nSTRING\"\n\
                     MULTI_SINGLE='THIS\nIS\nA\nMULTILINE\nSTRING'\n\
                     AFTER=after\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[0].value, "THIS\nIS\nA\nMULTILINE\nSTRING");
        assert_eq!(
            bindings[0].original,
            "MULTI_DOUBLE=\"THIS\nIS\nA\nMULTILINE\nSTRING\""
        );
        assert_eq!(bindings[1].value, "THIS\nIS\nA\nMULTILINE\nSTRING");
        assert_eq!(bindings[2].key, "AFTER");
        assert_eq!(bindings[2].line, 11);
    }

    #[test]
    fn tokenizes_comment_after_multiline_quote() {
        let input = "A=\"line 1\nline 2\" # trailing comment\nB=2\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].value, "line 1\nline 2");
        assert_eq!(bindings[1].value, "2");
    }

    #[test]
    fn normalizes_crlf_newlines() {
        let input = "A=\"line1\r\nline2\"\r\nB=ok\r\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].value, "line1\nline2");
        assert_eq!(bindings[1].value, "ok");
    }

    #[test]
    fn double_quoted_value_ending_with_escaped_backslash() {
        let input = "PATH=\"C:\\\\Users\\\\\"\nNEXT=ok\n";
        let bindings = tokenize(input).expect("tokenize should succeed");

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].value, "C:\\Users\\");
        assert_eq!(bindings[1].value, "ok");
    }
}
