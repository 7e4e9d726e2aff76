//! Language codes.
//!
//! Languages are kept in their ISO 639-2/T three-letter form (`eng`, `fra`).
//! Two-letter ISO 639-1 codes and the common ISO 639-2/B bibliographic codes
//! (`fre`, `ger`) are accepted on input and normalized.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LanguageError;

/// A canonical three-letter language code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language([u8; 3]);

pub type LanguageSet = BTreeSet<Language>;

/// (ISO 639-1, ISO 639-2/T) pairs.
const ALPHA2_TO_ALPHA3: &[(&str, &str)] = &[
    ("aa", "aar"), ("ab", "abk"), ("af", "afr"), ("ak", "aka"), ("am", "amh"), ("an", "arg"),
    ("ar", "ara"), ("as", "asm"), ("av", "ava"), ("ay", "aym"), ("az", "aze"), ("ba", "bak"),
    ("be", "bel"), ("bg", "bul"), ("bi", "bis"), ("bm", "bam"), ("bn", "ben"), ("bo", "bod"),
    ("br", "bre"), ("bs", "bos"), ("ca", "cat"), ("ce", "che"), ("ch", "cha"), ("co", "cos"),
    ("cr", "cre"), ("cs", "ces"), ("cu", "chu"), ("cv", "chv"), ("cy", "cym"), ("da", "dan"),
    ("de", "deu"), ("dv", "div"), ("dz", "dzo"), ("ee", "ewe"), ("el", "ell"), ("en", "eng"),
    ("eo", "epo"), ("es", "spa"), ("et", "est"), ("eu", "eus"), ("fa", "fas"), ("ff", "ful"),
    ("fi", "fin"), ("fj", "fij"), ("fo", "fao"), ("fr", "fra"), ("fy", "fry"), ("ga", "gle"),
    ("gd", "gla"), ("gl", "glg"), ("gn", "grn"), ("gu", "guj"), ("gv", "glv"), ("ha", "hau"),
    ("he", "heb"), ("hi", "hin"), ("ho", "hmo"), ("hr", "hrv"), ("ht", "hat"), ("hu", "hun"),
    ("hy", "hye"), ("hz", "her"), ("ia", "ina"), ("id", "ind"), ("ie", "ile"), ("ig", "ibo"),
    ("ii", "iii"), ("ik", "ipk"), ("io", "ido"), ("is", "isl"), ("it", "ita"), ("iu", "iku"),
    ("ja", "jpn"), ("jv", "jav"), ("ka", "kat"), ("kg", "kon"), ("ki", "kik"), ("kj", "kua"),
    ("kk", "kaz"), ("kl", "kal"), ("km", "khm"), ("kn", "kan"), ("ko", "kor"), ("kr", "kau"),
    ("ks", "kas"), ("ku", "kur"), ("kv", "kom"), ("kw", "cor"), ("ky", "kir"), ("la", "lat"),
    ("lb", "ltz"), ("lg", "lug"), ("li", "lim"), ("ln", "lin"), ("lo", "lao"), ("lt", "lit"),
    ("lu", "lub"), ("lv", "lav"), ("mg", "mlg"), ("mh", "mah"), ("mi", "mri"), ("mk", "mkd"),
    ("ml", "mal"), ("mn", "mon"), ("mr", "mar"), ("ms", "msa"), ("mt", "mlt"), ("my", "mya"),
    ("na", "nau"), ("nb", "nob"), ("nd", "nde"), ("ne", "nep"), ("ng", "ndo"), ("nl", "nld"),
    ("nn", "nno"), ("no", "nor"), ("nr", "nbl"), ("nv", "nav"), ("ny", "nya"), ("oc", "oci"),
    ("oj", "oji"), ("om", "orm"), ("or", "ori"), ("os", "oss"), ("pa", "pan"), ("pi", "pli"),
    ("pl", "pol"), ("ps", "pus"), ("pt", "por"), ("qu", "que"), ("rm", "roh"), ("rn", "run"),
    ("ro", "ron"), ("ru", "rus"), ("rw", "kin"), ("sa", "san"), ("sc", "srd"), ("sd", "snd"),
    ("se", "sme"), ("sg", "sag"), ("si", "sin"), ("sk", "slk"), ("sl", "slv"), ("sm", "smo"),
    ("sn", "sna"), ("so", "som"), ("sq", "sqi"), ("sr", "srp"), ("ss", "ssw"), ("st", "sot"),
    ("su", "sun"), ("sv", "swe"), ("sw", "swa"), ("ta", "tam"), ("te", "tel"), ("tg", "tgk"),
    ("th", "tha"), ("ti", "tir"), ("tk", "tuk"), ("tl", "tgl"), ("tn", "tsn"), ("to", "ton"),
    ("tr", "tur"), ("ts", "tso"), ("tt", "tat"), ("tw", "twi"), ("ty", "tah"), ("ug", "uig"),
    ("uk", "ukr"), ("ur", "urd"), ("uz", "uzb"), ("ve", "ven"), ("vi", "vie"), ("vo", "vol"),
    ("wa", "wln"), ("wo", "wol"), ("xh", "xho"), ("yi", "yid"), ("yo", "yor"), ("za", "zha"),
    ("zh", "zho"), ("zu", "zul"),
];

/// ISO 639-2/B codes that differ from their /T counterpart.
const BIBLIOGRAPHIC: &[(&str, &str)] = &[
    ("alb", "sqi"), ("arm", "hye"), ("baq", "eus"), ("bur", "mya"), ("chi", "zho"),
    ("cze", "ces"), ("dut", "nld"), ("fre", "fra"), ("geo", "kat"), ("ger", "deu"),
    ("gre", "ell"), ("ice", "isl"), ("mac", "mkd"), ("mao", "mri"), ("may", "msa"),
    ("per", "fas"), ("rum", "ron"), ("slo", "slk"), ("tib", "bod"), ("wel", "cym"),
];

const UNDEFINED: [u8; 3] = *b"und";

impl Language {
    /// Parse a two- or three-letter code, case-insensitively.
    pub fn parse(code: &str) -> Result<Self, LanguageError> {
        let lower = code.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return Err(LanguageError::Empty);
        }

        match lower.len() {
            2 => ALPHA2_TO_ALPHA3
                .iter()
                .find(|(a2, _)| *a2 == lower)
                .map(|(_, a3)| Self::from_alpha3(a3))
                .ok_or(LanguageError::Unknown(code.to_string())),
            3 if lower.bytes().all(|b| b.is_ascii_lowercase()) => {
                let canonical = BIBLIOGRAPHIC
                    .iter()
                    .find(|(b, _)| *b == lower)
                    .map(|(_, t)| *t)
                    .unwrap_or(lower.as_str());
                Ok(Self::from_alpha3(canonical))
            }
            _ => Err(LanguageError::Unknown(code.to_string())),
        }
    }

    fn from_alpha3(code: &str) -> Self {
        let b = code.as_bytes();
        Self([b[0], b[1], b[2]])
    }

    /// The `und` language used for subtitles of unknown language.
    pub fn undefined() -> Self {
        Self(UNDEFINED)
    }

    pub fn is_undefined(&self) -> bool {
        self.0 == UNDEFINED
    }

    pub fn alpha3(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("und")
    }

    pub fn alpha2(&self) -> Option<&'static str> {
        let a3 = self.alpha3();
        ALPHA2_TO_ALPHA3
            .iter()
            .find(|(_, t)| *t == a3)
            .map(|(a2, _)| *a2)
    }

    /// Shortest code, as used in subtitle file names.
    pub fn short_code(&self) -> &str {
        self.alpha2().unwrap_or_else(|| self.alpha3())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = LanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.alpha3().to_string()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alpha3())
    }
}

/// Parse a list of codes into a set, failing on the first unknown code.
pub fn parse_languages<I, S>(codes: I) -> Result<LanguageSet, LanguageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| Language::parse(c.as_ref()))
        .collect()
}
