use isolang::Language;

/// Language utilities for provider language codes
///
/// Providers use ISO 639 based codes, sometimes with a region or script
/// subtag (`zh-CN`, `sr-Latn`). These helpers normalise such codes and
/// look up English names when a provider does not supply one.
/// Normalise a provider code for comparison: trimmed and lowercase
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Primary language subtag of a code (`zh-cn` -> `zh`)
pub fn primary_subtag(code: &str) -> String {
    let normalized = normalize_code(code);
    normalized
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Map ISO 639-2/B codes to their 639-2/T equivalent
fn bibliographic_to_terminologic(code: &str) -> &str {
    match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        other => other,
    }
}

/// Resolve the ISO language behind a code, ignoring any subtags
fn lookup(code: &str) -> Option<Language> {
    let primary = primary_subtag(code);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(bibliographic_to_terminologic(&primary)),
        _ => None,
    }
}

/// English name of the language a code refers to
pub fn english_name(code: &str) -> Option<String> {
    lookup(code).map(|lang| lang.to_name().to_string())
}

/// Provider-supplied name, else the ISO English name, else the code itself
pub fn display_name_or_fallback(code: &str, provider_name: Option<&str>) -> String {
    match provider_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => english_name(code).unwrap_or_else(|| code.to_string()),
    }
}

/// Check if two codes name the same language, ignoring subtags
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => normalize_code(code1) == normalize_code(code2),
    }
}
