use std::collections::BTreeSet;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use subfetch_core::language::Language;

/// A video property a subtitle release matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Hash,
    ImdbId,
    Title,
    Series,
    Year,
    Season,
    Episode,
    ReleaseGroup,
    Source,
    AudioCodec,
    Resolution,
    VideoCodec,
    HearingImpaired,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::ImdbId => "imdb_id",
            Self::Title => "title",
            Self::Series => "series",
            Self::Year => "year",
            Self::Season => "season",
            Self::Episode => "episode",
            Self::ReleaseGroup => "release_group",
            Self::Source => "source",
            Self::AudioCodec => "audio_codec",
            Self::Resolution => "resolution",
            Self::VideoCodec => "video_codec",
            Self::HearingImpaired => "hearing_impaired",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subtitle offered by a provider. `content` is filled by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub provider_name: String,
    pub id: String,
    pub language: Language,
    pub hearing_impaired: bool,
    /// Properties of the video this subtitle was released for.
    pub matches: BTreeSet<MatchKind>,
    /// Encoding label reported by the provider, when known.
    pub encoding: Option<String>,
    pub content: Option<Vec<u8>>,
}

impl Subtitle {
    pub fn new(provider_name: impl Into<String>, id: impl Into<String>, language: Language) -> Self {
        Self {
            provider_name: provider_name.into(),
            id: id.into(),
            language,
            hearing_impaired: false,
            matches: BTreeSet::new(),
            encoding: None,
            content: None,
        }
    }

    pub fn with_matches(mut self, matches: impl IntoIterator<Item = MatchKind>) -> Self {
        self.matches.extend(matches);
        self
    }

    /// Downloaded content is non-empty and decodes to text.
    pub fn is_valid(&self) -> bool {
        self.text().is_some_and(|t| !t.trim().is_empty())
    }

    /// Guess the encoding of the downloaded content: BOM first, then the
    /// provider's label, then UTF-8 when it decodes cleanly, else Windows-1252.
    pub fn guess_encoding(&self) -> Option<&'static Encoding> {
        let content = self.content.as_deref()?;
        if let Some((enc, _)) = Encoding::for_bom(content) {
            return Some(enc);
        }
        if let Some(enc) = self
            .encoding
            .as_deref()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
        {
            return Some(enc);
        }
        if std::str::from_utf8(content).is_ok() {
            return Some(UTF_8);
        }
        Some(WINDOWS_1252)
    }

    /// Downloaded content as text.
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_deref()?;
        let encoding = self.guess_encoding()?;
        let (text, _, _) = encoding.decode(content);
        Some(text.into_owned())
    }
}
