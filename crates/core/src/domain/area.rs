use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversation::TenantId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAreaId(pub Uuid);

/// Tenant-defined geographic eligibility rule keyed by postal-code prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub id: ServiceAreaId,
    pub tenant_id: TenantId,
    pub postal_code_prefix: String,
    pub city: String,
    pub province: String,
    pub active: bool,
}

/// Pull a Canadian-format postal code (`A1A 1A1`, space optional) out of
/// free-form address text. Returns the uppercased code as written, with the
/// interior space preserved when present.
pub fn extract_postal_code(address: &str) -> Option<String> {
    let chars: Vec<char> = address.chars().collect();
    let mut index = 0;
    while index < chars.len() {
        if let Some(code) = match_postal_at(&chars, index) {
            return Some(code);
        }
        index += 1;
    }
    None
}

/// The forward sortation area: the first three characters of a full code.
pub fn forward_sortation_area(postal_code: &str) -> String {
    postal_code.chars().filter(|c| !c.is_whitespace()).take(3).collect()
}

fn match_postal_at(chars: &[char], start: usize) -> Option<String> {
    let letter = |c: char| c.is_ascii_alphabetic();
    let digit = |c: char| c.is_ascii_digit();

    let first = *chars.get(start)?;
    if !letter(first) {
        return None;
    }
    // A word boundary on the left keeps street names like "Main1A" from
    // producing phantom codes.
    if start > 0 && chars[start - 1].is_ascii_alphanumeric() {
        return None;
    }

    let second = *chars.get(start + 1)?;
    let third = *chars.get(start + 2)?;
    if !digit(second) || !letter(third) {
        return None;
    }

    let mut rest = start + 3;
    let mut spaced = false;
    if chars.get(rest) == Some(&' ') {
        spaced = true;
        rest += 1;
    }

    let fourth = *chars.get(rest)?;
    let fifth = *chars.get(rest + 1)?;
    let sixth = *chars.get(rest + 2)?;
    if !digit(fourth) || !letter(fifth) || !digit(sixth) {
        return None;
    }
    if chars.get(rest + 3).is_some_and(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut code: String = chars[start..start + 3].iter().collect();
    if spaced {
        code.push(' ');
    }
    code.extend(&chars[rest..rest + 3]);
    Some(code.to_ascii_uppercase())
}
