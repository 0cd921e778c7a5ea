//! Character reference decoding.
//!
//! quick-xml reports every `&name;` reference as a separate event. XML only
//! knows five named entities, so the HTML names that show up in rendered
//! documentation (and in TeX sources typed by hand) are mapped here.

/// Decode a character reference name (without `&` and `;`).
///
/// Handles decimal (`#38`) and hexadecimal (`#x26`) references plus the named
/// entities in [`named_entity`]. Unknown references are kept verbatim so the
/// serializer can write them back unchanged.
pub(crate) fn decode_reference(name: &str) -> String {
    if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => numeric.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map_or_else(|| format!("&{name};"), String::from);
    }

    named_entity(name).map_or_else(|| format!("&{name};"), str::to_owned)
}

/// Map a named entity to its replacement text.
fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        // XML
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",

        // Spacing and punctuation
        "nbsp" => "\u{00a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00b7}",
        "sect" => "\u{00a7}",
        "para" => "\u{00b6}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{00b0}",

        // Operators and relations
        "plusmn" => "\u{00b1}",
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",
        "minus" => "\u{2212}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "asymp" => "\u{2248}",
        "equiv" => "\u{2261}",
        "infin" => "\u{221e}",
        "sum" => "\u{2211}",
        "prod" => "\u{220f}",
        "radic" => "\u{221a}",
        "part" => "\u{2202}",
        "int" => "\u{222b}",
        "isin" => "\u{2208}",
        "forall" => "\u{2200}",
        "exist" => "\u{2203}",

        // Arrows
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        "harr" => "\u{2194}",
        "rArr" => "\u{21d2}",
        "hArr" => "\u{21d4}",

        // Greek
        "alpha" => "\u{03b1}",
        "beta" => "\u{03b2}",
        "gamma" => "\u{03b3}",
        "delta" => "\u{03b4}",
        "epsilon" => "\u{03b5}",
        "theta" => "\u{03b8}",
        "lambda" => "\u{03bb}",
        "mu" => "\u{03bc}",
        "pi" => "\u{03c0}",
        "sigma" => "\u{03c3}",
        "phi" => "\u{03c6}",
        "omega" => "\u{03c9}",
        "Delta" => "\u{0394}",
        "Sigma" => "\u{03a3}",
        "Omega" => "\u{03a9}",

        // Superscripts and fractions
        "sup1" => "\u{00b9}",
        "sup2" => "\u{00b2}",
        "sup3" => "\u{00b3}",
        "frac14" => "\u{00bc}",
        "frac12" => "\u{00bd}",
        "frac34" => "\u{00be}",

        _ => return None,
    })
}
