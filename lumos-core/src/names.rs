//! Display names for controller sequence files.

use regex::Regex;
use std::sync::LazyLock;

/// Hand-written display names for sequences whose file names don't clean up nicely.
const SEQUENCE_NAMES: &[(&str, &str)] = &[
    ("01 Bring On the Holidays.fseq", "Bring On the Holidays"),
    ("01 The Greatest Show Amazon Edited.fseq", "The Greatest Show"),
    ("02 - Dance Mode.fseq", "Dance Mode"),
    ("A Christmas Monologue.fseq", "A Christmas Monologue"),
    ("Angels [Glory To God].fseq", "Angels (Glory To God)"),
    ("Drummer Boy.fseq", "Drummer Boy"),
    ("Fat Santa [RHKIWWGsexQ].fseq", "Fat Santa"),
    ("From Now On 2025.fseq", "From Now On"),
    ("Grinch part1 v1.fseq", "Grinch Del 1"),
    ("Grinch part2 v1.fseq", "Grinch Del 2"),
    ("Grinch part3 v1.fseq", "Grinch Del 3"),
    ("Grinch part4 v1.fseq", "Grinch Del 4"),
    (
        "Gwen Stefani - You Make It Feel Like Christmas (Audio) ft. Blake Shelton.fseq",
        "You Make It Feel Like Christmas",
    ),
    ("intro greatest show.fseq", "Intro Greatest Show"),
    ("Jingle Bell Rock.fseq", "Jingle Bell Rock"),
    ("julshow_intro_musik.fseq", "Intro"),
    ("julshow_mellanakt_1_musik.fseq", "Mellanakt 1"),
    ("julshow_mellanakt_2_musik.fseq", "Mellanakt 2"),
    ("julshow_mellanakt_3_musik.fseq", "Mellanakt 3"),
    ("julshow_mellanakt_4_musik.fseq", "Mellanakt 4"),
    ("julshow_mellanakt_slut_musik.fseq", "Mellanakt Slut"),
    ("KPop Demon Hunters - Golden.fseq", "Golden"),
    ("Let It Go (From FrozenSoundtrack Version).fseq", "Let It Go"),
    ("Magic.fseq", "Magic"),
    ("Matt Maher - Born On That Day (Official Audio).fseq", "Born On That Day"),
    ("Nervo - Do They Know It's Christmas.fseq", "Do They Know It's Christmas"),
    ("panic-at-the-disco-into-the-unknown-from-frozen-2.fseq", "Into the Unknown"),
    (
        "Pentatonix - Kid On Christmas (Yule Log Audio) ft. Meghan Trainor.fseq",
        "Kid On Christmas",
    ),
    ("_Sounding Joy_.fseq", "Sounding Joy"),
    ("TobyMac - Light Of Christmas (Audio) ft. Owl City.fseq", "Light Of Christmas"),
    ("windowfx.fseq", "Window FX"),
    (
        "Christmas Every Day - Simple Plan (Lyric Video).fseq",
        "Christmas Every Day",
    ),
];

/// Sequence file extensions stripped during cleanup.
const SEQUENCE_EXTENSIONS: &[&str] = &[".fseq", ".eseq"];

#[allow(clippy::unwrap_used)] // literal patterns
static LEADING_ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*-?\s*").unwrap());
#[allow(clippy::unwrap_used)] // literal patterns
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[.*?\]\s*").unwrap());
#[allow(clippy::unwrap_used)] // literal patterns
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Turn a controller sequence file name into a display name.
///
/// Known files use the lookup table; anything else is cleaned up by stripping
/// the extension, a leading track number and bracketed annotations.
#[must_use]
pub fn format_sequence_name(file_name: &str) -> String {
    if let Some((_, display)) = SEQUENCE_NAMES.iter().find(|(file, _)| *file == file_name) {
        return (*display).to_string();
    }

    let stem = SEQUENCE_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name);

    let cleaned = LEADING_ORDINAL.replace(stem, "");
    let cleaned = BRACKETED.replace_all(&cleaned, " ");
    let cleaned = cleaned.replace('_', " ");
    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}
