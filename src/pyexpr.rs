//! Python-style literal and expression engine.
//!
//! Backs the `# values: python` and `# values: python-unsafe` syntaxes.
//! `parse_literal` accepts only literal forms (numbers with an optional sign,
//! strings, `True`/`False`/`None`, and tuples/lists/dicts/sets of literals),
//! mirroring `ast.literal_eval`. `eval_expr` additionally evaluates
//! arithmetic, comparison, and boolean operators with Python semantics;
//! callers opt into it explicitly via the `python-unsafe` directive.

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PyError {
    message: String,
}

impl Display for PyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

fn err(message: impl Into<String>) -> PyError {
    PyError {
        message: message.into(),
    }
}

/// Parse a restricted Python literal. Rejects every operator beyond a
/// numeric sign, so `1+1` is an error rather than `2`.
pub(crate) fn parse_literal(input: &str) -> Result<Value, PyError> {
    run(input, true)
}

/// Evaluate a full Python-style expression.
pub(crate) fn eval_expr(input: &str) -> Result<Value, PyError> {
    run(input, false)
}

fn run(input: &str, literals_only: bool) -> Result<Value, PyError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(err("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        literals_only,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        if literals_only {
            return Err(err("malformed literal: only literal expressions are allowed"));
        }
        return Err(err(format!(
            "unexpected token {:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
}

fn lex(input: &str) -> Result<Vec<Token>, PyError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::StarStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::SlashSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(err("invalid syntax: assignment is not an expression"));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(err("unexpected character '!'"));
                }
            }
            '\'' | '"' => tokens.push(lex_string(&chars, &mut i)?),
            '0'..='9' => tokens.push(lex_number(&chars, &mut i)?),
            '.' if chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
                tokens.push(lex_number(&chars, &mut i)?)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => return Err(err(format!("unexpected character {other:?}"))),
        }
    }

    Ok(tokens)
}

fn lex_string(chars: &[char], i: &mut usize) -> Result<Token, PyError> {
    let quote = chars[*i];
    *i += 1;
    let mut out = String::new();

    while *i < chars.len() {
        let c = chars[*i];
        if c == quote {
            *i += 1;
            return Ok(Token::Str(out));
        }
        if c == '\\' {
            let Some(&escaped) = chars.get(*i + 1) else {
                break;
            };
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' | '\'' | '"' => out.push(escaped),
                'x' => {
                    let hex: String = chars.get(*i + 2..*i + 4).unwrap_or_default().iter().collect();
                    let code = u8::from_str_radix(&hex, 16)
                        .map_err(|_| err(format!("invalid \\x escape {hex:?}")))?;
                    out.push(code as char);
                    *i += 2;
                }
                // Unknown escapes keep the backslash, as Python does.
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
            *i += 2;
            continue;
        }
        out.push(c);
        *i += 1;
    }

    Err(err("unterminated string literal"))
}

fn lex_number(chars: &[char], i: &mut usize) -> Result<Token, PyError> {
    let start = *i;

    if chars[*i] == '0'
        && matches!(
            chars.get(*i + 1),
            Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')
        )
    {
        let radix = match chars[*i + 1].to_ascii_lowercase() {
            'x' => 16,
            'o' => 8,
            _ => 2,
        };
        *i += 2;
        let digit_start = *i;
        while *i < chars.len() && (chars[*i].is_ascii_alphanumeric() || chars[*i] == '_') {
            *i += 1;
        }
        let digits: String = chars[digit_start..*i]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        let n = i64::from_str_radix(&digits, radix)
            .map_err(|_| err(format!("invalid integer literal {digits:?}")))?;
        return Ok(Token::Int(n));
    }

    let mut is_float = false;
    while *i < chars.len() {
        match chars[*i] {
            '0'..='9' | '_' => *i += 1,
            '.' if !is_float => {
                is_float = true;
                *i += 1;
            }
            'e' | 'E' => {
                is_float = true;
                *i += 1;
                if matches!(chars.get(*i), Some('+' | '-')) {
                    *i += 1;
                }
            }
            _ => break,
        }
    }

    let text: String = chars[start..*i].iter().filter(|&&c| c != '_').collect();
    if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| err(format!("invalid float literal {text:?}")))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| err(format!("invalid integer literal {text:?}")))
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    literals_only: bool,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_name(&mut self, name: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == name) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), PyError> {
        if self.eat(token) {
            return Ok(());
        }
        Err(err(format!("expected {what}")))
    }

    fn expression(&mut self) -> Result<Value, PyError> {
        if self.literals_only {
            return self.unary();
        }
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Value, PyError> {
        let mut left = self.and_expr()?;
        while self.eat_name("or") {
            let right = self.and_expr()?;
            if !truthy(&left) {
                left = right;
            }
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Value, PyError> {
        let mut left = self.not_expr()?;
        while self.eat_name("and") {
            let right = self.not_expr()?;
            if truthy(&left) {
                left = right;
            }
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Value, PyError> {
        if self.eat_name("not") {
            let operand = self.not_expr()?;
            return Ok(Value::Bool(!truthy(&operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Value, PyError> {
        let left = self.arith()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Cmp::Eq,
            Some(Token::NotEq) => Cmp::Ne,
            Some(Token::Lt) => Cmp::Lt,
            Some(Token::Le) => Cmp::Le,
            Some(Token::Gt) => Cmp::Gt,
            Some(Token::Ge) => Cmp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.arith()?;
        compare(op, &left, &right)
    }

    fn arith(&mut self) -> Result<Value, PyError> {
        let mut left = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                left = add(left, self.term()?)?;
            } else if self.eat(&Token::Minus) {
                left = sub(left, self.term()?)?;
            } else {
                return Ok(left);
            }
        }
    }

    fn term(&mut self) -> Result<Value, PyError> {
        let mut left = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                left = mul(left, self.unary()?)?;
            } else if self.eat(&Token::Slash) {
                left = div(left, self.unary()?)?;
            } else if self.eat(&Token::SlashSlash) {
                left = floordiv(left, self.unary()?)?;
            } else if self.eat(&Token::Percent) {
                left = modulo(left, self.unary()?)?;
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<Value, PyError> {
        if self.eat(&Token::Plus) {
            let operand = self.unary()?;
            return match operand {
                Value::Int(_) | Value::Float(_) => Ok(operand),
                _ => Err(err("bad operand type for unary +")),
            };
        }
        if self.eat(&Token::Minus) {
            return match self.unary()? {
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| err("integer overflow")),
                Value::Float(f) => Ok(Value::Float(-f)),
                _ => Err(err("bad operand type for unary -")),
            };
        }
        if self.literals_only {
            return self.atom();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Value, PyError> {
        let base = self.atom()?;
        if self.eat(&Token::StarStar) {
            let exponent = self.unary()?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Value, PyError> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Value::Int(n)),
            Some(Token::Float(f)) => Ok(Value::Float(f)),
            Some(Token::Str(s)) => {
                // Adjacent string literals concatenate, as in Python.
                let mut out = s;
                while matches!(self.peek(), Some(Token::Str(_))) {
                    if let Some(Token::Str(next)) = self.advance() {
                        out.push_str(&next);
                    }
                }
                Ok(Value::String(out))
            }
            Some(Token::Name(name)) => match name.as_str() {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::Null),
                _ => Err(err(format!("name {name:?} is not defined"))),
            },
            Some(Token::LParen) => self.tuple_rest(),
            Some(Token::LBracket) => {
                let items = self.items_until(&Token::RBracket, "']'")?;
                Ok(Value::Seq(items))
            }
            Some(Token::LBrace) => self.dict_or_set_rest(),
            Some(other) => Err(err(format!("unexpected token {other:?}"))),
            None => Err(err("unexpected end of expression")),
        }
    }

    fn tuple_rest(&mut self) -> Result<Value, PyError> {
        if self.eat(&Token::RParen) {
            return Ok(Value::Seq(Vec::new()));
        }
        let first = self.expression()?;
        if self.eat(&Token::RParen) {
            // A parenthesized expression, not a one-element tuple.
            return Ok(first);
        }
        self.expect(&Token::Comma, "',' or ')'")?;
        let mut items = vec![first];
        items.extend(self.items_until(&Token::RParen, "')'")?);
        Ok(Value::Seq(items))
    }

    fn items_until(&mut self, close: &Token, close_name: &str) -> Result<Vec<Value>, PyError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                self.expect(close, close_name)?;
                return Ok(items);
            }
        }
    }

    fn dict_or_set_rest(&mut self) -> Result<Value, PyError> {
        if self.eat(&Token::RBrace) {
            return Ok(Value::Map(IndexMap::new()));
        }

        let first = self.expression()?;
        if !self.eat(&Token::Colon) {
            // A set literal; sets surface as sequences.
            let mut items = vec![first];
            if self.eat(&Token::Comma) {
                items.extend(self.items_until(&Token::RBrace, "'}'")?);
            } else {
                self.expect(&Token::RBrace, "'}'")?;
            }
            return Ok(Value::Seq(items));
        }

        let mut map = IndexMap::new();
        map.insert(dict_key(&first)?, self.expression()?);
        while self.eat(&Token::Comma) {
            if self.eat(&Token::RBrace) {
                return Ok(Value::Map(map));
            }
            let key = self.expression()?;
            self.expect(&Token::Colon, "':'")?;
            map.insert(dict_key(&key)?, self.expression()?);
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Value::Map(map))
    }
}

fn dict_key(value: &Value) -> Result<String, PyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Bool(true) => Ok("True".to_owned()),
        Value::Bool(false) => Ok("False".to_owned()),
        Value::Null => Ok("None".to_owned()),
        _ => Err(err("unhashable dict key")),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Seq(seq) => !seq.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Datetime(_) => true,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(*b as i64 as f64),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn compare(op: Cmp, left: &Value, right: &Value) -> Result<Value, PyError> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        let result = match op {
            Cmp::Eq => a == b,
            Cmp::Ne => a != b,
            Cmp::Lt => a < b,
            Cmp::Le => a <= b,
            Cmp::Gt => a > b,
            Cmp::Ge => a >= b,
        };
        return Ok(Value::Bool(result));
    }

    match op {
        Cmp::Eq => return Ok(Value::Bool(left == right)),
        Cmp::Ne => return Ok(Value::Bool(left != right)),
        _ => {}
    }

    if let (Value::String(a), Value::String(b)) = (left, right) {
        let result = match op {
            Cmp::Lt => a < b,
            Cmp::Le => a <= b,
            Cmp::Gt => a > b,
            Cmp::Ge => a >= b,
            Cmp::Eq | Cmp::Ne => unreachable!(),
        };
        return Ok(Value::Bool(result));
    }

    Err(err("ordering is not supported between these types"))
}

fn add(left: Value, right: Value) -> Result<Value, PyError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| err("integer overflow")),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::Seq(mut a), Value::Seq(b)) => {
            a.extend(b);
            Ok(Value::Seq(a))
        }
        _ => Err(err("unsupported operand type(s) for +")),
    }
}

fn sub(left: Value, right: Value) -> Result<Value, PyError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(b)
            .map(Value::Int)
            .ok_or_else(|| err("integer overflow")),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 - b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        _ => Err(err("unsupported operand type(s) for -")),
    }
}

fn mul(left: Value, right: Value) -> Result<Value, PyError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(b)
            .map(Value::Int)
            .ok_or_else(|| err("integer overflow")),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 * b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
        (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
            Ok(Value::String(s.repeat(n.max(0) as usize)))
        }
        (Value::Seq(seq), Value::Int(n)) | (Value::Int(n), Value::Seq(seq)) => {
            let mut out = Vec::new();
            for _ in 0..n.max(0) {
                out.extend(seq.iter().cloned());
            }
            Ok(Value::Seq(out))
        }
        _ => Err(err("unsupported operand type(s) for *")),
    }
}

fn div(left: Value, right: Value) -> Result<Value, PyError> {
    match (as_number(&left), as_number(&right)) {
        (Some(_), Some(b)) if b == 0.0 => Err(err("division by zero")),
        (Some(a), Some(b)) => Ok(Value::Float(a / b)),
        _ => Err(err("unsupported operand type(s) for /")),
    }
}

fn floordiv(left: Value, right: Value) -> Result<Value, PyError> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(err("division by zero")),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.div_euclid(b))),
        (a, b) => match (as_number(&a), as_number(&b)) {
            (Some(_), Some(b)) if b == 0.0 => Err(err("division by zero")),
            (Some(a), Some(b)) => Ok(Value::Float((a / b).floor())),
            _ => Err(err("unsupported operand type(s) for //")),
        },
    }
}

fn modulo(left: Value, right: Value) -> Result<Value, PyError> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(err("division by zero")),
        // Python modulo: the result takes the divisor's sign.
        (Value::Int(a), Value::Int(b)) => {
            let r = a.rem_euclid(b);
            Ok(Value::Int(if b < 0 && r != 0 { r - b.abs() } else { r }))
        }
        (a, b) => match (as_number(&a), as_number(&b)) {
            (Some(_), Some(b)) if b == 0.0 => Err(err("division by zero")),
            (Some(a), Some(b)) => Ok(Value::Float(a - b * (a / b).floor())),
            _ => Err(err("unsupported operand type(s) for %")),
        },
    }
}

fn pow(left: Value, right: Value) -> Result<Value, PyError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) if b >= 0 => {
            let exp = u32::try_from(b).map_err(|_| err("exponent too large"))?;
            a.checked_pow(exp)
                .map(Value::Int)
                .ok_or_else(|| err("integer overflow"))
        }
        (Value::Int(a), Value::Int(b)) => Ok(Value::Float((a as f64).powf(b as f64))),
        (a, b) => match (as_number(&a), as_number(&b)) {
            (Some(a), Some(b)) => Ok(Value::Float(a.powf(b))),
            _ => Err(err("unsupported operand type(s) for **")),
        },
    }
}
