//! Restricted arithmetic evaluator
//!
//! Accepts numeric literals, `+ - * / // % **`, unary signs and
//! parentheses. Anything else is rejected with [`EvalError::Unsafe`]
//! before evaluation starts. Nothing is ever executed.

use std::fmt;

/// Maximum parenthesis/unary nesting accepted by the parser
const MAX_DEPTH: usize = 64;

/// Words that mark an utterance as arithmetic
const OPERATOR_WORDS: &[&str] = &[
    "plus",
    "minus",
    "times",
    "into",
    "multiplied",
    "divide",
    "divided",
    "mod",
    "modulo",
];

/// Spoken operators that only count when the utterance carries a digit
const NUMERIC_OPERATOR_WORDS: &[&str] = &["x", "over", "power"];

/// Phrases that ask for a calculation
const TRIGGERS: &[&str] = &["calculate", "what is", "what's"];

/// Sentinel returned instead of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// Input contains syntax outside the whitelist
    #[error("unsafe expression")]
    Unsafe,
    /// Division or modulo by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Result does not fit the numeric range
    #[error("numeric overflow")]
    Overflow,
}

/// Result of an evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Whether `text` names an arithmetic operation
#[must_use]
pub fn has_operator(text: &str) -> bool {
    if text.contains("to the power of") {
        return true;
    }
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let spoken = text.split_whitespace().any(|w| {
        OPERATOR_WORDS.contains(&w) || (has_digit && NUMERIC_OPERATOR_WORDS.contains(&w))
    });
    spoken || (has_digit && text.chars().any(|c| "+-*/%".contains(c)))
}

/// Whether `text` asks for a calculation
#[must_use]
pub fn is_math_request(text: &str) -> bool {
    TRIGGERS.iter().any(|t| text.contains(t)) && has_operator(text)
}

/// Rewrite a spoken request into operator notation
///
/// `"what is 2 plus 2"` becomes `"2 + 2"`.
#[must_use]
pub fn spoken_to_expression(text: &str) -> String {
    let mut stripped = text.to_lowercase();
    for trigger in TRIGGERS {
        stripped = stripped.replace(trigger, " ");
    }
    let stripped = stripped.replace('?', " ");

    let words: Vec<&str> = stripped.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let rest = &words[i..];
        let (symbol, consumed) = match rest {
            ["to", "the", "power", "of", ..] => ("**", 4),
            ["multiplied", "by", ..] => ("*", 2),
            ["divided" | "divide", "by", ..] => ("/", 2),
            ["plus", ..] => ("+", 1),
            ["minus", ..] => ("-", 1),
            ["times" | "into" | "x" | "multiplied", ..] => ("*", 1),
            ["divided" | "divide" | "over", ..] => ("/", 1),
            ["mod" | "modulo", ..] => ("%", 1),
            ["power", ..] => ("**", 1),
            [word, ..] => (*word, 1),
            [] => break,
        };
        out.push(symbol);
        i += consumed;
    }

    out.join(" ")
}

/// Evaluate a whitelisted arithmetic expression
///
/// # Errors
///
/// Returns [`EvalError::Unsafe`] for any input outside the grammar, and
/// [`EvalError::DivisionByZero`] or [`EvalError::Overflow`] for arithmetic
/// faults.
pub fn evaluate(expression: &str) -> Result<Number, EvalError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(EvalError::Unsafe);
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    FloorDiv,
    Percent,
    Pow,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let two = bytes.get(i + 1).copied();
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                tokens.push(Token::Num(parse_number(&input[start..i])?));
                continue;
            }
            b'*' if two == Some(b'*') => {
                i += 1;
                Token::Pow
            }
            b'/' if two == Some(b'/') => {
                i += 1;
                Token::FloorDiv
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            _ => return Err(EvalError::Unsafe),
        };
        tokens.push(token);
        i += 1;
    }

    if tokens.is_empty() {
        return Err(EvalError::Unsafe);
    }
    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, EvalError> {
    if literal.contains('.') {
        if literal == "." || literal.matches('.').count() > 1 {
            return Err(EvalError::Unsafe);
        }
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| EvalError::Unsafe)
    } else {
        literal
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| EvalError::Overflow)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Unsafe);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Number, EvalError> {
        let mut lhs = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Number, EvalError> {
        let mut lhs = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Number, EvalError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let value = self.factor();
                self.depth -= 1;
                value
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let value = self.factor().and_then(negate);
                self.depth -= 1;
                value
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number, EvalError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            // Right-associative, and the exponent may carry a sign
            self.descend()?;
            let exponent = self.factor()?;
            self.depth -= 1;
            return binary(Token::Pow, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, EvalError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(EvalError::Unsafe),
                }
            }
            _ => Err(EvalError::Unsafe),
        }
    }
}

fn negate(n: Number) -> Result<Number, EvalError> {
    match n {
        Number::Int(i) => i.checked_neg().map(Number::Int).ok_or(EvalError::Overflow),
        Number::Float(f) => Ok(Number::Float(-f)),
    }
}

fn finite(x: f64) -> Result<Number, EvalError> {
    if x.is_finite() {
        Ok(Number::Float(x))
    } else {
        Err(EvalError::Overflow)
    }
}

fn binary(op: Token, lhs: Number, rhs: Number) -> Result<Number, EvalError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => int_binary(op, a, b),
        _ => float_binary(op, lhs.as_f64(), rhs.as_f64()),
    }
}

fn int_binary(op: Token, a: i64, b: i64) -> Result<Number, EvalError> {
    let checked = |v: Option<i64>| v.map(Number::Int).ok_or(EvalError::Overflow);
    match op {
        Token::Plus => checked(a.checked_add(b)),
        Token::Minus => checked(a.checked_sub(b)),
        Token::Star => checked(a.checked_mul(b)),
        #[allow(clippy::cast_precision_loss)]
        Token::Slash => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            finite(a as f64 / b as f64)
        }
        Token::FloorDiv => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
            let adjust = a % b != 0 && ((a < 0) != (b < 0));
            checked(if adjust { q.checked_sub(1) } else { Some(q) })
        }
        Token::Percent => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            let floored = if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            };
            Ok(Number::Int(floored))
        }
        Token::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                #[allow(clippy::cast_precision_loss)]
                return finite((a as f64).powf(b as f64));
            }
            let exp = u32::try_from(b).map_err(|_| EvalError::Overflow)?;
            checked(a.checked_pow(exp))
        }
        _ => Err(EvalError::Unsafe),
    }
}

fn float_binary(op: Token, a: f64, b: f64) -> Result<Number, EvalError> {
    let nonzero = |b: f64| {
        if b == 0.0 {
            Err(EvalError::DivisionByZero)
        } else {
            Ok(b)
        }
    };
    match op {
        Token::Plus => finite(a + b),
        Token::Minus => finite(a - b),
        Token::Star => finite(a * b),
        Token::Slash => finite(a / nonzero(b)?),
        Token::FloorDiv => finite((a / nonzero(b)?).floor()),
        Token::Percent => {
            let b = nonzero(b)?;
            finite(a - b * (a / b).floor())
        }
        Token::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            finite(a.powf(b))
        }
        _ => Err(EvalError::Unsafe),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_spoken(text: &str) -> Result<Number, EvalError> {
        evaluate(&spoken_to_expression(text))
    }

    #[test]
    fn spoken_addition() {
        assert_eq!(spoken_to_expression("what is 2 plus 2"), "2 + 2");
        assert_eq!(eval_spoken("what is 2 plus 2").unwrap(), Number::Int(4));
    }

    #[test]
    fn spoken_operators() {
        assert_eq!(eval_spoken("calculate 10 times 3").unwrap(), Number::Int(30));
        assert_eq!(
            eval_spoken("what's 7 multiplied by 6").unwrap(),
            Number::Int(42)
        );
        assert_eq!(
            eval_spoken("what is 9 divided by 2").unwrap(),
            Number::Float(4.5)
        );
        assert_eq!(
            eval_spoken("what is 2 to the power of 10").unwrap(),
            Number::Int(1024)
        );
        assert_eq!(eval_spoken("what is 17 mod 5").unwrap(), Number::Int(2));
        assert_eq!(eval_spoken("what is 8 minus 10").unwrap(), Number::Int(-2));
        assert_eq!(eval_spoken("what is 2 x 3").unwrap(), Number::Int(6));
        assert_eq!(eval_spoken("what is 10 over 2").unwrap(), Number::Float(5.0));
        assert_eq!(eval_spoken("what is 2 power 3").unwrap(), Number::Int(8));
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), Number::Int(14));
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), Number::Int(20));
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), Number::Int(512));
        assert_eq!(evaluate("-2 ** 2").unwrap(), Number::Int(-4));
        assert_eq!(evaluate("2 ** -1").unwrap(), Number::Float(0.5));
        assert_eq!(evaluate("--3").unwrap(), Number::Int(3));
    }

    #[test]
    fn floor_division_and_modulo_follow_the_divisor() {
        assert_eq!(evaluate("7 // 2").unwrap(), Number::Int(3));
        assert_eq!(evaluate("-7 // 2").unwrap(), Number::Int(-4));
        assert_eq!(evaluate("-7 % 3").unwrap(), Number::Int(2));
        assert_eq!(evaluate("7 % -3").unwrap(), Number::Int(-2));
    }

    #[test]
    fn true_division_is_float() {
        assert_eq!(evaluate("10 / 2").unwrap(), Number::Float(5.0));
        assert_eq!(Number::Float(5.0).to_string(), "5.0");
        assert_eq!(Number::Float(4.5).to_string(), "4.5");
        assert_eq!(Number::Int(4).to_string(), "4");
    }

    #[test]
    fn eval_error_display() {
        assert_eq!(EvalError::Unsafe.to_string(), "unsafe expression");
        assert_eq!(EvalError::DivisionByZero.to_string(), "division by zero");
    }

    #[test]
    fn identifiers_and_calls_are_rejected() {
        for input in [
            "__import__('os').system('ls')",
            "os.system",
            "abs(3)",
            "x + 1",
            "[1, 2]",
            "2, 3",
            "1.2.3",
            "",
            "2 +",
            "(2 + 3",
            "2 3",
        ] {
            assert_eq!(evaluate(input), Err(EvalError::Unsafe), "input: {input:?}");
        }
    }

    #[test]
    fn arithmetic_faults() {
        assert_eq!(evaluate("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("1 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("0 ** -1"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("2 ** 64"), Err(EvalError::Overflow));
        assert_eq!(evaluate("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(evaluate("10.0 ** 400"), Err(EvalError::Overflow));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&deep), Err(EvalError::Unsafe));
    }

    #[test]
    fn operator_detection() {
        assert!(has_operator("what is 10 times 3"));
        assert!(has_operator("what is 4 + 4"));
        assert!(!has_operator("what is the time"));
        assert!(!has_operator("what is wi-fi"));
        assert!(has_operator("what is 2 x 3"));
        assert!(has_operator("what is 10 over 2"));
        assert!(has_operator("what is 2 power 3"));
        assert!(!has_operator("what is x"));
        assert!(!has_operator("what time is it over there"));
        assert!(is_math_request("calculate 5 minus 2"));
        assert!(!is_math_request("5 minus 2"));
    }
}
