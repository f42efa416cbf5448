//! # Expression Parser
//!
//! Parses the directive expression language, a small JavaScript subset:
//!
//! ```text
//! expression := postfix ( "+" postfix )*
//! postfix    := primary ( "." identifier | "(" arguments ")" )*
//! primary    := number | string | array | object | "(" expression ")"
//!             | "null" | "true" | "false" | identifier
//! array      := "[" ( "..."? expression ),* ","? "]"
//! object     := "{" ( key ":" expression | "..." expression ),* ","? "}"
//! key        := identifier | string | number
//! ```
//!
//! Strings may be single- or double-quoted and support the usual escapes.
//! `+` is left associative.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of, one_of},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    error::{context, ContextError, ParseError as NomParseError, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult, Parser,
};

use crate::ast::{Element, Expr, Literal, Property};
use crate::error::ParseError;

// ============================================================================
// Public API
// ============================================================================

/// Deepest bracket nesting accepted by [`parse`].
pub const MAX_NESTING: usize = 32;

/// Parse a complete expression. Leading and trailing whitespace is allowed;
/// anything else left over is an error.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    check_nesting(input)?;
    match all_consuming(ws(expression::<VerboseError<&str>>))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(describe(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(ParseError {
            message: "incomplete input".to_string(),
            offset: input.len(),
        }),
    }
}

/// Reject input nested deeper than [`MAX_NESTING`] before the recursive
/// descent sees it. Brackets inside string literals do not count.
fn check_nesting(input: &str) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in input.char_indices() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '{' | '(' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ParseError {
                        message: format!("nesting deeper than {MAX_NESTING} levels"),
                        offset,
                    });
                }
            }
            ']' | '}' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn describe(input: &str, e: VerboseError<&str>) -> ParseError {
    let offset = e
        .errors
        .first()
        .map(|(rest, _)| input.len() - rest.len())
        .unwrap_or(0);
    let expected = e.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(label) => Some(*label),
        _ => None,
    });
    let near: String = input[offset..].chars().take(16).collect();
    let message = match (expected, near.is_empty()) {
        (Some(label), true) => format!("expected {label} at end of input"),
        (Some(label), false) => format!("expected {label} near '{near}'"),
        (None, true) => "unexpected end of input".to_string(),
        (None, false) => format!("unexpected input near '{near}'"),
    };
    ParseError { message, offset }
}

// ============================================================================
// Helpers
// ============================================================================

fn ws<'a, O, E: NomParseError<&'a str>, F: Parser<&'a str, O, E>>(
    inner: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn identifier<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        alt((alpha1, tag("_"), tag("$"))),
        many0(alt((alphanumeric1, tag("_"), tag("$")))),
    ))(input)
}

fn number_text<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

// ============================================================================
// Expressions
// ============================================================================

fn expression<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (input, first) = postfix(input)?;
    let (input, rest) = many0(preceded(
        ws(char('+')),
        cut(context("an operand after '+'", postfix)),
    ))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |left, right| Expr::Plus(Box::new(left), Box::new(right)));
    Ok((input, expr))
}

enum Suffix {
    Member(String),
    Call(Vec<Expr>),
}

fn postfix<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (input, base) = primary(input)?;
    let (input, suffixes) = many0(preceded(
        multispace0,
        alt((
            map(
                preceded(
                    pair(char('.'), multispace0),
                    cut(context("a member name", identifier)),
                ),
                |name: &str| Suffix::Member(name.to_string()),
            ),
            map(arguments, Suffix::Call),
        )),
    ))(input)?;
    let expr = suffixes.into_iter().fold(base, |base, suffix| match suffix {
        Suffix::Member(name) => Expr::member(base, name),
        Suffix::Call(args) => Expr::call(base, args),
    });
    Ok((input, expr))
}

fn arguments<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Vec<Expr>, E> {
    let (input, _) = char('(')(input)?;
    let (input, args) = separated_list0(char(','), ws(expression))(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("closing ')'", char(')')))(input)?;
    Ok((input, args))
}

fn primary<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    alt((
        number,
        map(string_literal, |s| Expr::Literal(Literal::String(s))),
        array,
        object,
        parenthesized,
        keyword_or_identifier,
    ))(input)
}

fn parenthesized<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    delimited(
        char('('),
        ws(expression),
        cut(context("closing ')'", char(')'))),
    )(input)
}

fn keyword_or_identifier<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (rest, name) = identifier(input)?;
    let expr = match name {
        "null" | "undefined" => Expr::Literal(Literal::Null),
        "true" => Expr::Literal(Literal::Bool(true)),
        "false" => Expr::Literal(Literal::Bool(false)),
        _ => Expr::Identifier(name.to_string()),
    };
    Ok((rest, expr))
}

// ============================================================================
// Literals
// ============================================================================

fn number<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    let (rest, text) = number_text(input)?;
    let is_float = text.contains(['.', 'e', 'E']);
    let literal = match text.parse::<i64>() {
        Ok(i) if !is_float => Literal::Integer(i),
        _ => match text.parse::<f64>() {
            Ok(f) => Literal::Float(f),
            Err(_) => {
                return Err(nom::Err::Error(E::from_error_kind(
                    input,
                    nom::error::ErrorKind::Float,
                )))
            }
        },
    };
    Ok((rest, Expr::Literal(literal)))
}

fn escape<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, char, E> {
    alt((
        value('\n', char('n')),
        value('\r', char('r')),
        value('\t', char('t')),
        value('\\', char('\\')),
        value('"', char('"')),
        value('\'', char('\'')),
        value('/', char('/')),
    ))(input)
}

fn double_quoted<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(none_of("\"\\"), '\\', escape)),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn single_quoted<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    delimited(
        char('\''),
        map(
            opt(escaped_transform(none_of("'\\"), '\\', escape)),
            Option::unwrap_or_default,
        ),
        char('\''),
    )(input)
}

fn string_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    alt((double_quoted, single_quoted))(input)
}

// ============================================================================
// Composite literals
// ============================================================================

fn spread<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    preceded(multispace0, tag("..."))(input)
}

fn element<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Element, E> {
    let (input, spread) = opt(spread)(input)?;
    let (input, expr) = ws(expression)(input)?;
    Ok((
        input,
        Element {
            expr,
            spread: spread.is_some(),
        },
    ))
}

fn array<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (input, _) = char('[')(input)?;
    let (input, items) = separated_list0(char(','), ws(element))(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("closing ']'", char(']')))(input)?;
    Ok((input, Expr::Array(items)))
}

fn property_key<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    alt((
        string_literal,
        map(identifier, str::to_string),
        map(number_text, str::to_string),
    ))(input)
}

fn property<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Property, E> {
    alt((
        map(preceded(spread, ws(expression)), Property::Spread),
        map(
            separated_pair(
                ws(property_key),
                char(':'),
                cut(context("a property value", ws(expression))),
            ),
            |(key, value)| Property::KeyValue { key, value },
        ),
    ))(input)
}

fn object<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (input, _) = char('{')(input)?;
    let (input, props) = separated_list0(char(','), ws(property))(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("closing '}'", char('}')))(input)?;
    Ok((input, Expr::Object(props)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(text: &str) -> Expr {
        parse(text).unwrap_or_else(|e| panic!("parse '{text}': {e}"))
    }

    #[test]
    fn literals() {
        assert_eq!(ok("null"), Expr::Literal(Literal::Null));
        assert_eq!(ok("true"), Expr::Literal(Literal::Bool(true)));
        assert_eq!(ok("42"), Expr::Literal(Literal::Integer(42)));
        assert_eq!(ok("-1.5"), Expr::Literal(Literal::Float(-1.5)));
        assert_eq!(ok("'it\\'s'"), Expr::string("it's"));
        assert_eq!(ok(r#""a\nb""#), Expr::string("a\nb"));
        assert_eq!(ok("''"), Expr::string(""));
        assert_eq!(ok(r#""""#), Expr::string(""));
    }

    #[test]
    fn member_chain_and_call() {
        assert_eq!(
            ok("schema(model.Pet).required('id')"),
            Expr::call(
                Expr::member(
                    Expr::call(
                        Expr::ident("schema"),
                        vec![Expr::member(Expr::ident("model"), "Pet")]
                    ),
                    "required"
                ),
                vec![Expr::string("id")]
            )
        );
    }

    #[test]
    fn array_with_spread_and_trailing_comma() {
        let expr = ok("[...params(Pet), {name: 'extra', required: true},]");
        match expr {
            Expr::Array(items) => {
                assert_eq!(items.len(), 2);
                assert!(items[0].spread);
                assert!(!items[1].spread);
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert_eq!(ok("[ ]"), Expr::Array(Vec::new()));
    }

    #[test]
    fn object_keys_of_every_form() {
        let expr = ok(r#"{200: {desc: "ok"}, 'x-y': 1, plain: a.b, ...base}"#);
        match expr {
            Expr::Object(props) => {
                let keys: Vec<String> = props
                    .iter()
                    .map(|p| match p {
                        Property::KeyValue { key, .. } => key.clone(),
                        Property::Spread(_) => "...".to_string(),
                    })
                    .collect();
                assert_eq!(keys, vec!["200", "x-y", "plain", "..."]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn plus_is_left_associative() {
        assert_eq!(
            ok("a + 'b' + 1"),
            Expr::Plus(
                Box::new(Expr::Plus(Box::new(Expr::ident("a")), Box::new(Expr::string("b")))),
                Box::new(Expr::Literal(Literal::Integer(1)))
            )
        );
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            ok("(a + b).c"),
            Expr::member(
                Expr::Plus(Box::new(Expr::ident("a")), Box::new(Expr::ident("b"))),
                "c"
            )
        );
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert_eq!(ok("  schema ( Pet )  "), ok("schema(Pet)"));
        assert_eq!(ok("[\n  1,\n  2\n]"), ok("[1,2]"));
    }

    #[test]
    fn deep_nesting_is_an_error_not_an_overflow() {
        let deep = format!("{}{}", "[".repeat(10_000), "]".repeat(10_000));
        let err = parse(&deep).unwrap_err();
        assert_eq!(err.offset, MAX_NESTING);
        assert!(err.message.contains("nesting"), "{}", err.message);

        let shallow = format!("{}{}", "[".repeat(16), "]".repeat(16));
        assert!(parse(&shallow).is_ok());
        let quoted = format!("'{}'", "[".repeat(10_000));
        assert!(parse(&quoted).is_ok());
    }

    #[test]
    fn errors_carry_offsets() {
        let err = parse("[1, 2").unwrap_err();
        assert_eq!(err.offset, 5);
        assert!(err.message.contains("']'"), "{}", err.message);

        let err = parse("a +").unwrap_err();
        assert!(err.message.contains("operand"), "{}", err.message);

        assert!(parse("a b").is_err());
        assert!(parse("").is_err());
        assert!(parse("{a 1}").is_err());
    }
}
