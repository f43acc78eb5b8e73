//! wodim output classification
//!
//! Each output line is checked against an ordered list of rules. The first
//! rule whose predicate matches and whose handler produces an event wins;
//! lines no rule claims are dropped.

use regex::Regex;
use std::sync::LazyLock;

use super::status::{BurnPhase, BurnStatus};

/// `Track 01:   12 of   45 MB written (fifo 100%) [buf  99%]   4.0x.`
static TRACK_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Track (\d+):\s+(\d+) of\s+(\d+) MB written").expect("track progress pattern")
});

/// Burn progress is capped here until the run completes
pub const MAX_RUNNING_PROGRESS: f64 = 99.0;

const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "cannot",
    "failed",
    "not ready",
    "not permitted",
    "permission denied",
    "no disk",
    "no disc",
    "input/output error",
];

/// Known failure causes, checked in order; the first match names the error
const ERROR_CAUSES: &[(&[&str], &str)] = &[
    (&["not ready"], "Drive not ready - No disc inserted?"),
    (
        &["errno: 5", "input/output error"],
        "I/O Error - Check if disc is inserted and drive is working",
    ),
    (&["no disk", "no disc"], "No disc in drive"),
    (
        &["not permitted", "permission denied"],
        "Permission denied - Try running with sudo",
    ),
    (&["cannot open"], "Cannot open drive - Check device path"),
];

const ACTIVITY_KEYWORDS: &[&str] = &["burning", "writing", "track", "mb"];

/// What the parser knows about the run so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    /// Highest track seen, 0 before the first
    pub current_track: usize,
    pub total_tracks: usize,
}

impl ParseContext {
    pub fn new(total_tracks: usize) -> Self {
        Self {
            current_track: 0,
            total_tracks,
        }
    }

    /// Overall percentage with `completed` whole tracks written
    fn completed_share(&self, completed: f64) -> f64 {
        if self.total_tracks == 0 {
            return 0.0;
        }
        completed / self.total_tracks as f64 * 100.0
    }
}

/// A line with its lowercase form, computed once
struct Line<'a> {
    raw: &'a str,
    lower: String,
}

impl Line<'_> {
    fn contains_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|keyword| self.lower.contains(keyword))
    }
}

struct LineRule {
    name: &'static str,
    matches: fn(&Line) -> bool,
    handle: fn(&Line, &ParseContext) -> Option<BurnStatus>,
}

const RULES: &[LineRule] = &[
    LineRule {
        name: "track-progress",
        matches: |line| TRACK_PROGRESS.is_match(line.raw),
        handle: track_progress,
    },
    LineRule {
        name: "fixating",
        matches: |line| line.lower.contains("fixat"),
        handle: |_, ctx| {
            Some(
                BurnStatus::new(
                    BurnPhase::Fixating,
                    ctx.total_tracks,
                    ctx.total_tracks,
                    MAX_RUNNING_PROGRESS,
                )
                .with_message("Fixating disc..."),
            )
        },
    },
    LineRule {
        name: "track-start",
        matches: |line| line.lower.contains("starting") && line.lower.contains("track"),
        handle: |line, ctx| {
            let progress = ctx.completed_share(ctx.current_track as f64);
            Some(
                BurnStatus::new(
                    BurnPhase::Burning,
                    ctx.current_track + 1,
                    ctx.total_tracks,
                    progress.min(MAX_RUNNING_PROGRESS),
                )
                .with_message(line.raw),
            )
        },
    },
    LineRule {
        name: "error",
        matches: |line| line.contains_any(ERROR_KEYWORDS),
        handle: |line, ctx| {
            let mut status = BurnStatus::failed(normalize_error(line));
            status.track = ctx.current_track;
            status.total_tracks = ctx.total_tracks;
            Some(status)
        },
    },
    LineRule {
        name: "activity",
        matches: |line| line.contains_any(ACTIVITY_KEYWORDS),
        handle: |line, ctx| {
            Some(
                BurnStatus::new(BurnPhase::Burning, ctx.current_track, ctx.total_tracks, 0.0)
                    .with_message(line.raw),
            )
        },
    },
];

/// Classify one line of wodim output
///
/// Returns `None` for blank lines and lines that carry no information.
/// `progress` of an activity event is 0; the caller keeps the run's
/// progress where it was.
pub fn parse_line(line: &str, ctx: &ParseContext) -> Option<BurnStatus> {
    let raw = line.trim();
    if raw.is_empty() {
        return None;
    }
    let line = Line {
        raw,
        lower: raw.to_lowercase(),
    };

    RULES
        .iter()
        .filter(|rule| (rule.matches)(&line))
        .find_map(|rule| {
            let status = (rule.handle)(&line, ctx);
            if status.is_none() {
                log::debug!("Rule {} could not parse: {}", rule.name, line.raw);
            }
            status
        })
}

fn track_progress(line: &Line, ctx: &ParseContext) -> Option<BurnStatus> {
    let caps = TRACK_PROGRESS.captures(line.raw)?;
    let track: usize = caps[1].parse().ok()?;
    let written: u64 = caps[2].parse().ok()?;
    let total: u64 = caps[3].parse().ok()?;

    let track_percent = if total > 0 {
        written as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let overall = ctx.completed_share(track.saturating_sub(1) as f64)
        + ctx.completed_share(track_percent / 100.0);

    Some(
        BurnStatus::new(
            BurnPhase::Burning,
            track,
            ctx.total_tracks,
            overall.min(MAX_RUNNING_PROGRESS),
        )
        .with_message(format!(
            "Track {}/{}: {}/{} MB",
            track, ctx.total_tracks, written, total
        )),
    )
}

/// Map a failure line to a readable cause, or keep the line as is
fn normalize_error(line: &Line) -> String {
    ERROR_CAUSES
        .iter()
        .find(|(keywords, _)| line.contains_any(keywords))
        .map(|(_, cause)| cause.to_string())
        .unwrap_or_else(|| line.raw.to_string())
}
