//! Subtitle scoring against a video.
//!
//! Each matching property adds its weight from the per-kind table. A hash
//! match is worth the whole table on its own.

use std::collections::BTreeSet;

use subfetch_core::video::{Video, VideoInfo};
use tracing::debug;

use crate::subtitle::{MatchKind, Subtitle};

/// Weights of the properties a subtitle can match for one video kind.
#[derive(Debug, PartialEq, Eq)]
pub struct Scores {
    table: &'static [(MatchKind, u32)],
}

impl Scores {
    pub fn get(&self, kind: MatchKind) -> u32 {
        self.table
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    /// Score of a hash match; the baseline for score floors.
    pub fn hash(&self) -> u32 {
        self.get(MatchKind::Hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MatchKind, u32)> + '_ {
        self.table.iter().copied()
    }
}

pub static EPISODE_SCORES: Scores = Scores {
    table: &[
        (MatchKind::Hash, 359),
        (MatchKind::Series, 180),
        (MatchKind::Year, 90),
        (MatchKind::Season, 30),
        (MatchKind::Episode, 30),
        (MatchKind::ReleaseGroup, 15),
        (MatchKind::Source, 7),
        (MatchKind::AudioCodec, 3),
        (MatchKind::Resolution, 2),
        (MatchKind::VideoCodec, 2),
        (MatchKind::HearingImpaired, 1),
    ],
};

pub static MOVIE_SCORES: Scores = Scores {
    table: &[
        (MatchKind::Hash, 119),
        (MatchKind::Title, 60),
        (MatchKind::Year, 30),
        (MatchKind::ReleaseGroup, 15),
        (MatchKind::Source, 7),
        (MatchKind::AudioCodec, 3),
        (MatchKind::Resolution, 2),
        (MatchKind::VideoCodec, 2),
        (MatchKind::HearingImpaired, 1),
    ],
};

pub fn get_scores(video: &Video) -> &'static Scores {
    match video.info {
        VideoInfo::Movie(_) => &MOVIE_SCORES,
        VideoInfo::Episode(_) => &EPISODE_SCORES,
    }
}

/// Score `subtitle` for `video`. With `hearing_impaired` set, a subtitle
/// whose flag agrees earns the hearing-impaired weight.
pub fn compute_score(subtitle: &Subtitle, video: &Video, hearing_impaired: Option<bool>) -> u32 {
    let scores = get_scores(video);
    let mut matches: BTreeSet<MatchKind> = subtitle.matches.clone();

    if matches.contains(&MatchKind::Hash) {
        matches = BTreeSet::from([MatchKind::Hash]);
    } else if matches.contains(&MatchKind::ImdbId) {
        match video.info {
            VideoInfo::Movie(_) => matches.extend([MatchKind::Title, MatchKind::Year]),
            VideoInfo::Episode(_) => matches.extend([
                MatchKind::Series,
                MatchKind::Year,
                MatchKind::Season,
                MatchKind::Episode,
            ]),
        }
    }

    if hearing_impaired.is_some_and(|hi| hi == subtitle.hearing_impaired) {
        matches.insert(MatchKind::HearingImpaired);
    } else {
        matches.remove(&MatchKind::HearingImpaired);
    }

    let score = matches.iter().map(|m| scores.get(*m)).sum();
    debug!(
        provider = %subtitle.provider_name,
        id = %subtitle.id,
        video = %video,
        score,
        "computed subtitle score"
    );
    score
}
