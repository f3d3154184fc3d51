use crate::language::errors::SyntaxError;
use crate::runtime::value::{Arg, ListValue, Value};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, digit1, multispace1, satisfy, space0},
    combinator::{opt, recognize},
    error::{Error, ErrorKind},
    sequence::{delimited, pair, tuple},
    IResult,
};

/// Parses a whole source text into its top-level expressions.
pub fn parse_program(source: &str) -> Result<Vec<Value>, SyntaxError> {
    let mut exprs = Vec::new();
    let mut input = source;
    loop {
        let (rest, _) = separators(input).map_err(|err| syntax_error(source, input, err))?;
        if rest.is_empty() {
            return Ok(exprs);
        }
        let (rest, expr) = parse_expression(rest).map_err(|err| syntax_error(source, rest, err))?;
        exprs.push(expr);
        input = rest;
    }
}

fn syntax_error(source: &str, fallback: &str, err: nom::Err<Error<&str>>) -> SyntaxError {
    let remaining = match &err {
        nom::Err::Error(inner) | nom::Err::Failure(inner) => inner.input,
        nom::Err::Incomplete(_) => fallback,
    };
    let offset = source.len() - remaining.len();
    match remaining.chars().next() {
        Some(quote @ ('"' | '\'')) => SyntaxError::new(format!("unexpected `{quote}`"), offset)
            .with_label("string starts here")
            .with_help("close the string literal with a matching quote"),
        Some(c) => SyntaxError::new(format!("unexpected `{c}`"), offset),
        None => SyntaxError::new("unexpected end of input", offset).with_label("input ends here"),
    }
}

fn fail<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(Error::new(input, kind)))
}

/// Whitespace, newlines, `;` and `#` comments between expressions.
fn separators(mut input: &str) -> IResult<&str, ()> {
    loop {
        if let Ok((rest, _)) = multispace1::<&str, Error<&str>>(input) {
            input = rest;
        } else if let Some(rest) = input.strip_prefix(';') {
            input = rest;
        } else if let Some(comment) = input.strip_prefix('#') {
            input = comment.find('\n').map_or("", |end| &comment[end..]);
        } else {
            return Ok((input, ()));
        }
    }
}

/// Whitespace and comments inside an expression, where `;` is not allowed.
fn blank(mut input: &str) -> IResult<&str, ()> {
    loop {
        if let Ok((rest, _)) = multispace1::<&str, Error<&str>>(input) {
            input = rest;
        } else if let Some(comment) = input.strip_prefix('#') {
            input = comment.find('\n').map_or("", |end| &comment[end..]);
        } else {
            return Ok((input, ()));
        }
    }
}

pub fn parse_expression(input: &str) -> IResult<&str, Value> {
    let (input, _) = blank(input)?;
    let (input, target) = parse_postfix(input)?;
    let (after_space, _) = space0(input)?;
    let Ok((rest, _)) = tag::<&str, &str, Error<&str>>("<-")(after_space) else {
        return Ok((input, target));
    };
    let (rest, value) = parse_expression(rest)?;
    Ok((
        rest,
        Value::call(
            Value::symbol("<-"),
            vec![Arg::positional(target), Arg::positional(value)],
        ),
    ))
}

/// A primary expression followed by any number of call suffixes.
fn parse_postfix(input: &str) -> IResult<&str, Value> {
    let (mut input, mut expr) = parse_primary(input)?;
    loop {
        let (rest, _) = space0(input)?;
        let Ok((rest, _)) = char::<&str, Error<&str>>('(')(rest) else {
            return Ok((input, expr));
        };
        let (rest, args) = parse_arguments(rest)?;
        let (rest, _) = blank(rest)?;
        let (rest, _) = char(')')(rest)?;
        expr = Value::call(expr, args);
        input = rest;
    }
}

fn parse_primary(input: &str) -> IResult<&str, Value> {
    alt((
        parse_function,
        parse_block,
        parse_number,
        parse_string,
        parse_parenthesized,
        parse_name,
    ))(input)
}

fn parse_parenthesized(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('(')(input)?;
    let (input, expr) = parse_expression(input)?;
    let (input, _) = blank(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, expr))
}

pub fn parse_identifier(input: &str) -> IResult<&str, String> {
    alt((parse_bare_identifier, parse_backtick_identifier))(input)
}

fn parse_bare_identifier(input: &str) -> IResult<&str, String> {
    let (input, name) = recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '.'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '.' || c == '_'),
    ))(input)?;
    Ok((input, name.to_string()))
}

fn parse_backtick_identifier(input: &str) -> IResult<&str, String> {
    let (input, name) = delimited(char('`'), is_not("`"), char('`'))(input)?;
    Ok((input, name.to_string()))
}

/// Identifiers, the `TRUE`/`FALSE`/`NULL` keywords and `pkg::name` /
/// `pkg:::name` references.
fn parse_name(input: &str) -> IResult<&str, Value> {
    let (input, name) = parse_identifier(input)?;
    match name.as_str() {
        "TRUE" => return Ok((input, Value::Logical(true))),
        "FALSE" => return Ok((input, Value::Logical(false))),
        "NULL" => return Ok((input, Value::Null)),
        _ => {}
    }
    let (input, qualified) = opt(pair(alt((tag(":::"), tag("::"))), parse_identifier))(input)?;
    let expr = match qualified {
        Some((op, export)) => Value::call(
            Value::symbol(op),
            vec![
                Arg::positional(Value::symbol(name)),
                Arg::positional(Value::symbol(export)),
            ],
        ),
        None => Value::symbol(name),
    };
    Ok((input, expr))
}

/// Numbers are doubles unless suffixed with `L`.
pub fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    let (rest, integer) = opt(char('L'))(rest)?;
    let value = if integer.is_some() {
        match text.parse::<i64>() {
            Ok(value) => Value::Integer(value),
            Err(_) => return fail(input, ErrorKind::Digit),
        }
    } else {
        match text.parse::<f64>() {
            Ok(value) => Value::Double(value),
            Err(_) => return fail(input, ErrorKind::Float),
        }
    };
    Ok((rest, value))
}

pub fn parse_string(input: &str) -> IResult<&str, Value> {
    let (body, quote) = alt((char('"'), char('\'')))(input)?;
    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&body[index + 1..], Value::string(text))),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c => text.push(c),
        }
    }
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn parse_arguments(input: &str) -> IResult<&str, Vec<Arg>> {
    let mut args = Vec::new();
    let (mut input, _) = blank(input)?;
    if input.starts_with(')') {
        return Ok((input, args));
    }
    loop {
        let (rest, arg) = parse_argument(input)?;
        args.push(arg);
        let (rest, _) = blank(rest)?;
        match char::<&str, Error<&str>>(',')(rest) {
            Ok((rest, _)) => input = rest,
            Err(_) => return Ok((rest, args)),
        }
    }
}

fn parse_argument(input: &str) -> IResult<&str, Arg> {
    let (input, _) = blank(input)?;
    if let Ok((rest, name)) = parse_tag(input) {
        let (rest, value) = parse_expression(rest)?;
        return Ok((rest, Arg::named(name, value)));
    }
    let (input, value) = parse_expression(input)?;
    Ok((input, Arg::positional(value)))
}

/// `name =` at the start of an argument or formal.
fn parse_tag(input: &str) -> IResult<&str, String> {
    let (input, name) = alt((parse_identifier, parse_string_name))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('=')(input)?;
    if input.starts_with('=') {
        return fail(input, ErrorKind::Char);
    }
    Ok((input, name))
}

fn parse_string_name(input: &str) -> IResult<&str, String> {
    let (input, value) = parse_string(input)?;
    Ok((input, value.as_str().unwrap_or_default().to_string()))
}

/// `function(a, b = default) body`, encoded as a call to the `function`
/// special with a named list of defaults and the body.
fn parse_function(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("function")(input)?;
    let (input, _) = space0(input)?;
    let (mut input, _) = char('(')(input)?;
    let mut names = Vec::new();
    let mut defaults = Vec::new();
    loop {
        let (rest, _) = blank(input)?;
        if let Ok((rest, _)) = char::<&str, Error<&str>>(')')(rest) {
            input = rest;
            break;
        }
        let (rest, name) = parse_identifier(rest)?;
        let (rest, _) = space0(rest)?;
        let (rest, default) = match char::<&str, Error<&str>>('=')(rest) {
            Ok((rest, _)) => parse_expression(rest)?,
            Err(_) => (rest, Value::Missing),
        };
        names.push(name);
        defaults.push(default);
        let (rest, _) = blank(rest)?;
        let (rest, _) = opt(char(','))(rest)?;
        input = rest;
    }
    let (input, body) = parse_expression(input)?;
    let formals = Value::List(ListValue::new(defaults, Some(names)));
    Ok((
        input,
        Value::call(
            Value::symbol("function"),
            vec![Arg::positional(formals), Arg::positional(body)],
        ),
    ))
}

/// `{ expr; expr }`
fn parse_block(input: &str) -> IResult<&str, Value> {
    let (mut input, _) = char('{')(input)?;
    let mut exprs = Vec::new();
    loop {
        let (rest, _) = separators(input)?;
        if let Ok((rest, _)) = char::<&str, Error<&str>>('}')(rest) {
            input = rest;
            break;
        }
        let (rest, expr) = parse_expression(rest)?;
        exprs.push(Arg::positional(expr));
        input = rest;
    }
    Ok((input, Value::call(Value::symbol("{"), exprs)))
}
