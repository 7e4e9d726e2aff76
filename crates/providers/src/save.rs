use std::io;
use std::path::PathBuf;

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE};
use subfetch_core::video::Video;
use subfetch_scanner::subtitles::subtitle_path;
use tracing::{debug, info};

use crate::subtitle::Subtitle;

/// Write downloaded subtitles next to the video, re-encoded to `encoding`.
///
/// Text that `encoding` cannot represent fails the save with
/// `InvalidData` before that file is written.
///
/// Subtitles without content are skipped, as is any subtitle whose language
/// was already saved. With `single`, only the first subtitle is saved and its
/// file name carries no language code. Returns the saved subtitles with the
/// paths they were written to.
pub fn save_subtitles(
    video: &Video,
    subtitles: Vec<Subtitle>,
    single: bool,
    encoding: &'static Encoding,
) -> io::Result<Vec<(Subtitle, PathBuf)>> {
    let mut saved: Vec<(Subtitle, PathBuf)> = Vec::new();

    for subtitle in subtitles {
        let Some(text) = subtitle.text() else {
            debug!(provider = %subtitle.provider_name, id = %subtitle.id, "skipping subtitle without content");
            continue;
        };
        if saved.iter().any(|(s, _)| s.language == subtitle.language) {
            debug!(language = %subtitle.language, "language already saved");
            continue;
        }

        let language = (!single).then_some(&subtitle.language);
        let path = subtitle_path(video.path(), language);
        let bytes = encode_text(&text, encoding)?;
        std::fs::write(&path, &bytes)?;
        info!(path = %path.display(), provider = %subtitle.provider_name, "saved subtitle");

        saved.push((subtitle, path));
        if single {
            break;
        }
    }

    Ok(saved)
}

/// Strict encode. UTF-16 output starts with a byte order mark.
fn encode_text(text: &str, encoding: &'static Encoding) -> io::Result<Vec<u8>> {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let mut bytes = Vec::with_capacity(2 * (text.len() + 1));
        for unit in std::iter::once(0xFEFF).chain(text.encode_utf16()) {
            if encoding == UTF_16LE {
                bytes.extend_from_slice(&unit.to_le_bytes());
            } else {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
        }
        return Ok(bytes);
    }
    if encoding == REPLACEMENT {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "cannot encode subtitles as replacement",
        ));
    }

    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("subtitle text cannot be encoded as {}", encoding.name()),
        ));
    }
    Ok(bytes.into_owned())
}
