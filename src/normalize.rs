// Geographic name resolution: raw survey cells -> canonical place names.
//
// A raw cell is one of: a survey city code (several code generations), a
// Chinese administrative name with assorted suffixes, digits glued to a
// Chinese name, or an already romanized spelling. Resolution produces a
// candidate, romanizes it into the registries' Latin key space, and then
// reconciles it against a coordinate registry. Failure is `None`, never an
// error.
use crate::registry::{CodeRegistry, CoordinateRegistry, Registries};
use once_cell::sync::Lazy;
use regex::Regex;

static CJK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{4e00}-\x{9fff}]+").unwrap());
static DIGITS_THEN_CJK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+[\x{4e00}-\x{9fff}]+").unwrap());

/// Trailing administrative suffixes, longest first.
const ADMIN_SUFFIXES: &[&str] = &[
    "特别行政区",
    "自治区",
    "自治州",
    "自治县",
    "自治旗",
    "地区",
    "省",
    "市",
    "县",
    "区",
];

/// Ethnic qualifiers left behind once an autonomous suffix is gone.
const ETHNIC_QUALIFIERS: &[&str] = &[
    "维吾尔族",
    "维吾尔",
    "哈萨克族",
    "土家族",
    "朝鲜族",
    "蒙古族",
    "布依族",
    "哈尼族",
    "傈僳族",
    "景颇族",
    "壮族",
    "回族",
    "藏族",
    "彝族",
    "苗族",
    "侗族",
    "白族",
    "傣族",
    "羌族",
];

/// Irregular forms rewritten wherever they occur in a name.
const IRREGULAR_REWRITES: &[(&str, &str)] = &[
    ("广西壮族", "广西"),
    ("新疆维吾尔", "新疆"),
    ("宁夏回族", "宁夏"),
    ("内蒙古自治", "内蒙古"),
    ("西藏自治", "西藏"),
];

/// Names whose syllable-by-syllable romanization is wrong or ambiguous.
/// Override output is final: it is never fuzzy-matched onto another key.
const ROMANIZATION_OVERRIDES: &[(&str, &str)] = &[
    // Collides with 山西 (Shanxi).
    ("陕西", "Shaanxi"),
    // Collide with a better known city in another province.
    ("抚州", "Fuzhou (Jiangxi)"),
    ("台州", "Taizhou (Zhejiang)"),
    ("宿州", "Suzhou (Anhui)"),
    // Polyphonic first characters.
    ("重庆", "Chongqing"),
    ("厦门", "Xiamen"),
    ("长沙", "Changsha"),
    ("长春", "Changchun"),
    ("长治", "Changzhi"),
    ("蚌埠", "Bengbu"),
    ("六安", "Luan"),
    // Conventional spellings used by the coordinate tables.
    ("哈尔滨", "Harbin"),
    ("乌鲁木齐", "Urumqi"),
    ("齐齐哈尔", "Qiqihar"),
    ("呼和浩特", "Huhehaote"),
    ("西安", "Xian"),
    ("内蒙古", "Neimenggu"),
    // Romanizations that contain another registry key ("Xian", "Jinan")
    // on syllable boundaries or are contained in one ("Zhenjiang").
    ("襄阳", "Xiangyang"),
    ("湘潭", "Xiangtan"),
    ("咸阳", "Xianyang"),
    ("咸宁", "Xianning"),
    ("仙桃", "Xiantao"),
    ("吉安", "Jian"),
    // Superseded place names.
    ("襄樊", "Xiangyang"),
    ("思茅", "Puer"),
    ("通什", "Wuzhishan"),
];

/// Latin suffix words equivalent to city/county/district/prefecture/
/// province/autonomous region, longest first.
const LATIN_SUFFIXES: &[&str] = &[
    "special administrative region",
    "zhuang autonomous region",
    "uygur autonomous region",
    "uyghur autonomous region",
    "hui autonomous region",
    "autonomous prefecture",
    "autonomous region",
    "municipality",
    "prefecture",
    "province",
    "district",
    "county",
    "city",
    "zizhiqu",
    "sheng",
    "diqu",
    "shi",
    "xian",
];

/// Suffixes tried when a candidate is the stem of a registry key.
const CJK_CITY_SUFFIXES: &[&str] = &["市", "州", "盟"];
const LATIN_CITY_SUFFIXES: &[&str] = &["shi", "zhou", "meng"];

/// How a candidate was matched onto a registry key, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Exact,
    Alias,
    Substring,
    SuffixAugmented,
    Verbatim,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Romanized {
    pub text: String,
    /// Came from the override table rather than transliteration.
    pub overridden: bool,
    /// Byte offsets in `text` where a syllable starts or ends. Empty for
    /// overrides.
    pub syllable_bounds: Vec<usize>,
}

pub fn is_cjk(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(is_cjk)
}

fn is_cjk_text(s: &str) -> bool {
    contains_cjk(s) && s.chars().all(|c| is_cjk(c) || c.is_whitespace() || c == '·')
}

fn is_latin_name(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_alphabetic())
        && s
            .chars()
            .all(|c| c.is_ascii_alphabetic() || matches!(c, ' ' | '\'' | '-' | '(' | ')'))
}

/// Look a numeric cell up in the code registry.
///
/// The value is truncated to an integer first. Compound codes written as
/// `main.sub` fall back to the leading six digits of the integer part.
pub fn resolve_code<'r>(value: &str, codes: &'r CodeRegistry) -> Option<&'r str> {
    let value = value.trim();
    let parsed = value.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if parsed.abs() >= i64::MAX as f64 {
        return None;
    }
    if let Some(name) = codes.lookup(parsed.trunc() as i64) {
        return Some(name);
    }
    let (int_part, _) = value.split_once('.')?;
    let lead: String = int_part.chars().take(6).collect();
    codes.lookup(lead.parse().ok()?)
}

fn apply_rewrites(name: &str) -> String {
    IRREGULAR_REWRITES
        .iter()
        .fold(name.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Strip administrative suffixes and ethnic qualifiers until none remain.
/// A name is never cut below two characters.
pub fn strip_admin_suffixes(name: &str) -> String {
    let mut out = apply_rewrites(name.trim());
    loop {
        let stripped = ADMIN_SUFFIXES
            .iter()
            .chain(ETHNIC_QUALIFIERS)
            .find_map(|suffix| {
                out.strip_suffix(suffix)
                    .filter(|rest| rest.chars().count() >= 2)
                    .map(str::to_string)
            });
        match stripped {
            Some(rest) => out = rest,
            None => return out,
        }
    }
}

/// Candidate from the text paths: whole Chinese names, or the first Chinese
/// run when digits are glued in front of it.
pub fn text_candidate(value: &str) -> Option<String> {
    let value = value.trim();
    if is_cjk_text(value) {
        let name: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        return Some(strip_admin_suffixes(&name));
    }
    if DIGITS_THEN_CJK.is_match(value) {
        let run = CJK_RUN.find(value)?;
        return Some(strip_admin_suffixes(run.as_str()));
    }
    None
}

/// Candidate city name for a raw cell, before registry reconciliation.
pub fn city_candidate(raw: &str, codes: &CodeRegistry) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(name) = resolve_code(value, codes) {
        return Some(name.to_string());
    }
    text_candidate(value)
}

/// Drop trailing Latin suffix words ("Hebei Province" -> "Hebei").
pub fn strip_latin_suffixes(name: &str) -> String {
    let mut out = name.trim().to_string();
    loop {
        if !out.is_ascii() {
            return out;
        }
        let lower = out.to_lowercase();
        let cut = LATIN_SUFFIXES.iter().find_map(|suffix| {
            let rest = lower.strip_suffix(suffix)?;
            let rest = rest.strip_suffix(' ')?;
            (!rest.trim().is_empty()).then(|| rest.trim_end().len())
        });
        match cut {
            Some(len) => out.truncate(len),
            None => return out,
        }
    }
}

/// One capitalised token per contiguous Chinese run; everything else is
/// copied through.
pub fn transliterate(text: &str) -> String {
    fn flush(out: &mut String, run: &mut String) {
        let mut chars = run.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
        run.clear();
    }

    let mut out = String::new();
    let mut run = String::new();
    for ch in text.chars() {
        if is_cjk(ch) {
            if let Some(syllable) = deunicode::deunicode_char(ch) {
                run.push_str(&syllable.trim().to_lowercase());
            }
        } else {
            flush(&mut out, &mut run);
            out.push(ch);
        }
    }
    flush(&mut out, &mut run);
    out
}

/// Offsets where each character's transliteration begins and ends, in step
/// with `transliterate`.
fn syllable_bounds(stem: &str) -> Vec<usize> {
    let mut bounds = vec![0];
    let mut len = 0;
    for ch in stem.chars() {
        len += if is_cjk(ch) {
            deunicode::deunicode_char(ch).map_or(0, |syllable| syllable.trim().len())
        } else {
            ch.len_utf8()
        };
        bounds.push(len);
    }
    bounds
}

/// Latin rendering of a Chinese place name.
pub fn romanize(name: &str) -> Romanized {
    let stem = strip_admin_suffixes(name);
    if let Some((_, latin)) = ROMANIZATION_OVERRIDES.iter().find(|(src, _)| *src == stem) {
        return Romanized {
            text: latin.to_string(),
            overridden: true,
            syllable_bounds: Vec::new(),
        };
    }
    Romanized {
        text: strip_latin_suffixes(&transliterate(&stem)),
        overridden: false,
        syllable_bounds: syllable_bounds(&stem),
    }
}

/// Reconcile a candidate against a registry and report which stage matched.
pub fn reconcile_with_stage(
    candidate: &str,
    registry: &CoordinateRegistry,
) -> Option<(String, MatchStage)> {
    reconcile_within(candidate, registry, None)
}

/// Same stages as [`reconcile_with_stage`]. With `bounds`, a key found inside
/// the candidate only counts when it starts and ends on one of those offsets,
/// so "Xian" never matches the front of "Xiangtan".
pub fn reconcile_within(
    candidate: &str,
    registry: &CoordinateRegistry,
    bounds: Option<&[usize]>,
) -> Option<(String, MatchStage)> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Some(key) = registry.find_key(candidate) {
        return Some((key.to_string(), MatchStage::Exact));
    }
    if let Some(key) = registry.alias_target(candidate) {
        return Some((key.to_string(), MatchStage::Alias));
    }
    let folded = candidate.to_lowercase();
    for key in registry.keys() {
        let key_folded = key.to_lowercase();
        let key_inside = folded
            .match_indices(key_folded.as_str())
            .any(|(start, hit)| {
                bounds.map_or(true, |b| b.contains(&start) && b.contains(&(start + hit.len())))
            });
        if key_folded.contains(&folded) || key_inside {
            return Some((key.to_string(), MatchStage::Substring));
        }
    }
    let suffixes = if contains_cjk(candidate) {
        CJK_CITY_SUFFIXES
    } else {
        LATIN_CITY_SUFFIXES
    };
    for suffix in suffixes {
        if let Some(key) = registry.find_key(&format!("{candidate}{suffix}")) {
            return Some((key.to_string(), MatchStage::SuffixAugmented));
        }
    }
    if candidate.chars().count() >= 2 {
        return Some((candidate.to_string(), MatchStage::Verbatim));
    }
    None
}

pub fn reconcile_to_registry(candidate: &str, registry: &CoordinateRegistry) -> Option<String> {
    reconcile_with_stage(candidate, registry).map(|(name, _)| name)
}

fn resolve_latin(value: &str, registry: &CoordinateRegistry) -> Option<String> {
    let stem = strip_latin_suffixes(value);
    registry
        .find_key(&stem)
        .or_else(|| registry.alias_target(&stem))
        .map(str::to_string)
}

fn settle(candidate: &str, registry: &CoordinateRegistry) -> Option<String> {
    if !contains_cjk(candidate) {
        return reconcile_to_registry(candidate, registry);
    }
    let romanized = romanize(candidate);
    if romanized.overridden {
        let key = registry.find_key(&romanized.text).unwrap_or(romanized.text.as_str());
        return Some(key.to_string());
    }
    reconcile_within(&romanized.text, registry, Some(romanized.syllable_bounds.as_slice()))
        .map(|(name, _)| name)
}

/// Canonical city for a raw survey cell.
pub fn normalize_city(raw: &str, registries: &Registries) -> Option<String> {
    let value = raw.trim();
    if is_latin_name(value) {
        return resolve_latin(value, &registries.cities);
    }
    let candidate = city_candidate(value, &registries.codes)?;
    settle(&candidate, &registries.cities)
}

/// Canonical province for a raw survey cell. Province cells carry no
/// numeric codes, so only the text and Latin paths apply.
pub fn normalize_province(raw: &str, registries: &Registries) -> Option<String> {
    let value = raw.trim();
    if is_latin_name(value) {
        return resolve_latin(value, &registries.provinces);
    }
    let candidate = text_candidate(value)?;
    settle(&candidate, &registries.provinces)
}
