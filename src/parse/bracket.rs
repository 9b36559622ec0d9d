//! Grammar for the contents of a bracket atom: `[isotope? symbol chirality? hcount? charge? class?]`.

use crate::{Atom, Element};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, satisfy},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize},
    error::{context, convert_error, VerboseError},
    multi::many1_count,
    sequence::{pair, preceded, tuple},
    IResult,
};
use std::str::FromStr;

pub type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

fn number<T: FromStr>(input: &str) -> Res<'_, T> {
    map_res(digit1, |digits: &str| digits.parse::<T>())(input)
}

/// An element symbol, either capitalized or in lowercase aromatic form.
fn element_symbol(input: &str) -> Res<'_, (Element, bool)> {
    alt((
        map_opt(
            recognize(pair(
                satisfy(|c| c.is_ascii_uppercase()),
                satisfy(|c| c.is_ascii_lowercase()),
            )),
            |symbol: &str| Element::from_symbol(symbol).map(|e| (e, false)),
        ),
        map_opt(recognize(satisfy(|c| c.is_ascii_uppercase())), |symbol: &str| {
            Element::from_symbol(symbol).map(|e| (e, false))
        }),
        map_opt(alt((tag("se"), tag("as"), tag("te"))), |symbol: &str| {
            Element::from_aromatic_symbol(symbol).map(|e| (e, true))
        }),
        map_opt(recognize(satisfy(|c| c.is_ascii_lowercase())), |symbol: &str| {
            Element::from_aromatic_symbol(symbol).map(|e| (e, true))
        }),
    ))(input)
}

/// Chirality is recognized and discarded; no descriptor depends on it.
fn chirality(input: &str) -> Res<'_, &str> {
    recognize(pair(
        char('@'),
        opt(alt((
            tag("@"),
            recognize(pair(
                alt((tag("TH"), tag("AL"), tag("SP"), tag("TB"), tag("OH"))),
                digit1,
            )),
        ))),
    ))(input)
}

fn hydrogen_count(input: &str) -> Res<'_, u8> {
    preceded(char('H'), map(opt(number::<u8>), |count| count.unwrap_or(1)))(input)
}

fn charge(input: &str) -> Res<'_, i8> {
    alt((
        preceded(char('+'), number::<i8>),
        map_opt(preceded(char('-'), number::<i8>), i8::checked_neg),
        map_res(many1_count(char('+')), |n| i8::try_from(n)),
        map_opt(many1_count(char('-')), |n| i8::try_from(n).ok()?.checked_neg()),
    ))(input)
}

fn bracket_atom(input: &str) -> Res<'_, Atom> {
    map(
        tuple((
            opt(number::<u16>),
            context("element symbol", element_symbol),
            opt(chirality),
            opt(hydrogen_count),
            opt(charge),
            opt(preceded(char(':'), number::<u16>)),
        )),
        |(isotope, (element, aromatic), _, hydrogens, charge, class)| Atom {
            element,
            aromatic,
            charge: charge.unwrap_or(0),
            hydrogens: hydrogens.unwrap_or(0),
            isotope,
            class,
            bracket: true,
        },
    )(input)
}

/// Parse the text between `[` and `]`.
///
/// # Returns
///
/// The atom, or a human-readable description of where the grammar failed.
pub fn parse_bracket_atom(content: &str) -> Result<Atom, String> {
    if content.is_empty() {
        return Err("empty bracket atom".to_string());
    }
    match all_consuming(bracket_atom)(content) {
        Ok((_, atom)) => Ok(atom),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(content, e)),
        Err(nom::Err::Incomplete(_)) => Err(format!("incomplete bracket atom '{content}'")),
    }
}
