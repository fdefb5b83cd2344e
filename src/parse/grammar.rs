use winnow::ascii::{digit1, till_line_ending};
use winnow::combinator::{alt, cut_err, fail, not, opt, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use serde_json::{Map, Number, Value};

use crate::types::is_reserved_rule_name;
use crate::{Condition, Criteria};

/// Deepest nesting of parenthesized groups, and separately of array and
/// object literals.
pub(crate) const MAX_NESTING: usize = 64;

fn too_deep<O>(input: &mut &str) -> ModalResult<O> {
    cut_err(fail::<_, O, _>)
        .context(StrContext::Label("nesting"))
        .context(StrContext::Expected(StrContextValue::Description(
            "at most 64 nested levels",
        )))
        .parse_next(input)
}

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers & keywords -------------------------------------------------

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

fn and_op(input: &mut &str) -> ModalResult<()> {
    (ws, alt(("and", "AND")), not(one_of(is_ident_char)))
        .void()
        .parse_next(input)
}

fn or_op(input: &mut &str) -> ModalResult<()> {
    (ws, alt(("or", "OR")), not(one_of(is_ident_char)))
        .void()
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn hex4(input: &mut &str) -> ModalResult<u32> {
    take_while(4, |c: char| c.is_ascii_hexdigit())
        .try_map(|hex: &str| u32::from_str_radix(hex, 16))
        .parse_next(input)
}

fn unicode_escape(input: &mut &str) -> ModalResult<char> {
    let high = hex4.parse_next(input)?;
    let code = if (0xD800..0xDC00).contains(&high) {
        let low = preceded("\\u", hex4).parse_next(input)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(ErrMode::from_input(input).cut());
        }
        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
    } else {
        high
    };
    char::from_u32(code).ok_or_else(|| ErrMode::from_input(input).cut())
}

fn string_body(input: &mut &str) -> ModalResult<String> {
    let mut s = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(s),
            '\\' => match any.parse_next(input)? {
                '"' => s.push('"'),
                '\\' => s.push('\\'),
                '/' => s.push('/'),
                'n' => s.push('\n'),
                't' => s.push('\t'),
                'r' => s.push('\r'),
                'b' => s.push('\u{8}'),
                'f' => s.push('\u{c}'),
                'u' => s.push(unicode_escape.parse_next(input)?),
                _ => return Err(ErrMode::from_input(input)),
            },
            c => s.push(c),
        }
    }
}

fn string_literal(input: &mut &str) -> ModalResult<String> {
    preceded('"', cut_err(string_body))
        .context(StrContext::Expected(StrContextValue::Description(
            "terminated string",
        )))
        .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<Value> {
    let text = (
        opt('-'),
        digit1,
        opt(('.', digit1)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;
    let value = if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    } else {
        text.parse::<i64>()
            .map(Value::from)
            .or_else(|_| text.parse::<u64>().map(Value::from))
            .ok()
    };
    value.ok_or_else(|| ErrMode::from_input(input).cut())
}

fn array(input: &mut &str, depth: usize) -> ModalResult<Vec<Value>> {
    '['.parse_next(input)?;
    if depth >= MAX_NESTING {
        return too_deep(input);
    }
    ws.parse_next(input)?;
    let items: Vec<Value> =
        separated(0.., |i: &mut &str| literal(i, depth + 1), (ws, ',', ws))
            .parse_next(input)?;
    (ws, cut_err(']')).parse_next(input)?;
    Ok(items)
}

fn member(input: &mut &str, depth: usize) -> ModalResult<(String, Value)> {
    let key = string_literal.parse_next(input)?;
    (ws, cut_err(':'), ws).parse_next(input)?;
    let value = cut_err(|i: &mut &str| literal(i, depth)).parse_next(input)?;
    Ok((key, value))
}

fn object(input: &mut &str, depth: usize) -> ModalResult<Map<String, Value>> {
    '{'.parse_next(input)?;
    if depth >= MAX_NESTING {
        return too_deep(input);
    }
    ws.parse_next(input)?;
    let members: Vec<(String, Value)> =
        separated(0.., |i: &mut &str| member(i, depth + 1), (ws, ',', ws))
            .parse_next(input)?;
    (ws, cut_err('}')).parse_next(input)?;
    Ok(members.into_iter().collect())
}

fn literal(input: &mut &str, depth: usize) -> ModalResult<Value> {
    alt((
        string_literal.map(Value::String),
        "null".value(Value::Null),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        number,
        |i: &mut &str| array(i, depth).map(Value::Array),
        |i: &mut &str| object(i, depth).map(Value::Object),
    ))
    .context(StrContext::Expected(StrContextValue::Description("literal")))
    .parse_next(input)
}

// -- Conditions & groups ----------------------------------------------------

fn condition(input: &mut &str) -> ModalResult<Condition> {
    let name = ident
        .verify(|name: &str| !is_reserved_rule_name(name))
        .parse_next(input)?;
    (ws, '(', ws).parse_next(input)?;
    let params: Vec<Value> =
        separated(0.., |i: &mut &str| literal(i, 0), (ws, ',', ws)).parse_next(input)?;
    (ws, cut_err(')'))
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    Ok(Condition::new(name, params))
}

fn empty_group(input: &mut &str) -> ModalResult<Criteria<Condition>> {
    alt((
        ("all", ws, '(', ws, ')').value(Criteria::All(Vec::new())),
        ("any", ws, '(', ws, ')').value(Criteria::Any(Vec::new())),
    ))
    .parse_next(input)
}

// -- Expressions (precedence: or < and < primary) ---------------------------

fn group(input: &mut &str, depth: usize) -> ModalResult<Criteria<Condition>> {
    '('.parse_next(input)?;
    if depth >= MAX_NESTING {
        return too_deep(input);
    }
    let inner = cut_err(|i: &mut &str| or_chain(i, depth + 1)).parse_next(input)?;
    (ws, cut_err(')')).parse_next(input)?;
    Ok(inner)
}

fn primary(input: &mut &str, depth: usize) -> ModalResult<Criteria<Condition>> {
    ws.parse_next(input)?;
    alt((
        |i: &mut &str| group(i, depth),
        empty_group,
        condition.map(Criteria::Leaf),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "condition",
    )))
    .parse_next(input)
}

fn and_chain(input: &mut &str, depth: usize) -> ModalResult<Criteria<Condition>> {
    let first = primary(input, depth)?;
    let rest: Vec<Criteria<Condition>> =
        repeat(0.., preceded(and_op, cut_err(|i: &mut &str| primary(i, depth))))
            .parse_next(input)?;
    Ok(flatten(first, rest, Criteria::All))
}

fn or_chain(input: &mut &str, depth: usize) -> ModalResult<Criteria<Condition>> {
    let first = and_chain(input, depth)?;
    let rest: Vec<Criteria<Condition>> =
        repeat(0.., preceded(or_op, cut_err(|i: &mut &str| and_chain(i, depth))))
            .parse_next(input)?;
    Ok(flatten(first, rest, Criteria::Any))
}

fn flatten(
    first: Criteria<Condition>,
    rest: Vec<Criteria<Condition>>,
    group: fn(Vec<Criteria<Condition>>) -> Criteria<Condition>,
) -> Criteria<Condition> {
    if rest.is_empty() {
        return first;
    }
    let mut children = Vec::with_capacity(rest.len() + 1);
    children.push(first);
    children.extend(rest);
    group(children)
}

// -- Top-level parser -------------------------------------------------------

pub fn criteria(input: &mut &str) -> ModalResult<Criteria<Condition>> {
    let parsed = or_chain(input, 0)?;
    ws.parse_next(input)?;
    Ok(parsed)
}
