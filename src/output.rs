//! CLI output formatting for all pipeline stages.
//!
//! # Entry Display Contract
//!
//! Every stage that works per entry uses the same two-level pattern:
//!
//! 1. **Entry line**: positional index + word, then what happened to it
//! 2. **Summary line**: counts for the whole stage and where the artifact went
//!
//! # Output Format
//!
//! ## Words
//!
//! ```text
//! Wrote 8 words for 'weather' (offline vocabulary)
//!     File: scripts/words_weather.json
//! ```
//!
//! ## Illustrate
//!
//! ```text
//! 001 aurinko → word_aurinko_weather.png
//! 002 sade: reused word_sade_weather.png
//! 003 lumi: skipped (invalid response shape)
//! Illustrated 1, reused 1, skipped 1
//!     Mapping: illustrations/mapping.json
//! ```
//!
//! ## Overlay
//!
//! ```text
//! 001 aurinko → word_aurinko_weather.png (scale 1.00)
//! 002 sade: cached
//! 003 lumi: skipped (missing mapping entry)
//! Cards: 2 of 3 in illustrations_with_text
//! Cache: 1 cached, 1 rendered (2 total)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::caption::CaptionReport;
use crate::grammar::GrammarReport;
use crate::illustrate::{IllustrateReport, IllustrationOutcome};
use crate::overlay::{CardOutcome, OverlayReport};
use crate::pipeline::{PipelineEvent, Stage};
use crate::words::{WordOrigin, WordsReport};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Final path component, or the whole path if there is none.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// `==> Stage 2/5: grammar`
pub fn format_stage_header(stage: Stage, position: usize, total: usize) -> String {
    let action = match stage {
        Stage::Words => "Generating word list",
        Stage::Grammar => "Verifying grammar",
        Stage::Illustrate => "Generating illustrations",
        Stage::Overlay => "Adding text overlays",
        Stage::Caption => "Writing caption",
    };
    format!("==> Stage {}/{}: {}", position, total, action)
}

/// Lines for a stage report event. `StageStarted` is formatted by the
/// caller, which knows the stage's position.
pub fn format_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::StageStarted(_) => Vec::new(),
        PipelineEvent::Words(r) => format_words_report(r),
        PipelineEvent::Grammar(r) => format_grammar_report(r),
        PipelineEvent::Illustrate(r) => format_illustrate_report(r),
        PipelineEvent::Overlay(r) => format_overlay_report(r),
        PipelineEvent::Caption(r) => format_caption_report(r),
    }
}

// ============================================================================
// Words
// ============================================================================

pub fn format_words_report(report: &WordsReport) -> Vec<String> {
    let origin = match report.origin {
        WordOrigin::Collaborator => "generated",
        WordOrigin::Fallback => "offline vocabulary",
    };
    vec![
        format!(
            "Wrote {} for '{}' ({})",
            plural(report.count, "word", "words"),
            report.topic,
            origin
        ),
        format!("{}File: {}", indent(1), report.path.display()),
    ]
}

pub fn print_words_report(report: &WordsReport) {
    for line in format_words_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Grammar
// ============================================================================

pub fn format_grammar_report(report: &GrammarReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.checked {
        lines.push(format!(
            "Verified {}: {} corrected, {} unverified",
            plural(report.total, "word", "words"),
            report.corrected,
            report.unverified
        ));
    } else {
        lines.push(format!(
            "Grammar check skipped (no collaborator), {} kept",
            plural(report.total, "word", "words")
        ));
    }
    if !report.duplicates.is_empty() {
        lines.push(format!(
            "{}Duplicates removed: {}",
            indent(1),
            report.duplicates.join(", ")
        ));
    }
    lines.push(format!("{}File: {}", indent(1), report.path.display()));
    if let Some(path) = &report.report_path {
        lines.push(format!("{}Report: {}", indent(1), path.display()));
    }
    lines
}

pub fn print_grammar_report(report: &GrammarReport) {
    for line in format_grammar_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Illustrate
// ============================================================================

pub fn format_illustrate_report(report: &IllustrateReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            let index = format_index(i + 1);
            match outcome {
                IllustrationOutcome::Generated { word, path } => {
                    format!("{} {} → {}", index, word, file_name(path))
                }
                IllustrationOutcome::Reused { word, path } => {
                    format!("{} {}: reused {}", index, word, file_name(path))
                }
                IllustrationOutcome::Skipped { word, kind, .. } => {
                    format!("{} {}: skipped ({})", index, word, kind)
                }
            }
        })
        .collect();
    lines.push(format!(
        "Illustrated {}, reused {}, skipped {}",
        report.generated(),
        report.reused(),
        report.skipped()
    ));
    lines.push(format!(
        "{}Mapping: {}",
        indent(1),
        report.mapping_path.display()
    ));
    lines
}

pub fn print_illustrate_report(report: &IllustrateReport) {
    for line in format_illustrate_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Overlay
// ============================================================================

pub fn format_overlay_report(report: &OverlayReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            let index = format_index(i + 1);
            match outcome {
                CardOutcome::Rendered { word, path, scale } => {
                    format!("{} {} → {} (scale {:.2})", index, word, file_name(path), scale)
                }
                CardOutcome::Cached { word, .. } => format!("{} {}: cached", index, word),
                CardOutcome::Copied { word, path } => {
                    format!("{} {}: copied to {}", index, word, file_name(path))
                }
                CardOutcome::Skipped { word, kind, .. } => {
                    format!("{} {}: skipped ({})", index, word, kind)
                }
            }
        })
        .collect();
    lines.push(format!(
        "Cards: {} of {} in {}",
        report.completed(),
        report.outcomes.len(),
        report.output_dir.display()
    ));
    lines.push(format!("Cache: {}", report.cache));
    lines
}

pub fn print_overlay_report(report: &OverlayReport) {
    for line in format_overlay_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Caption
// ============================================================================

pub fn format_caption_report(report: &CaptionReport) -> Vec<String> {
    let mut lines = vec![if report.caption.generated {
        "Caption:".to_string()
    } else {
        "Caption (fixed):".to_string()
    }];
    lines.extend(
        report
            .caption
            .text
            .lines()
            .map(|line| format!("{}{}", indent(1), line)),
    );
    lines.push(format!("{}File: {}", indent(1), report.path.display()));
    lines
}

pub fn print_caption_report(report: &CaptionReport) {
    for line in format_caption_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::caption::Caption;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn stage_header_counts_positions() {
        assert_eq!(
            format_stage_header(Stage::Grammar, 2, 5),
            "==> Stage 2/5: Verifying grammar"
        );
    }

    #[test]
    fn words_report_shows_origin_and_file() {
        let lines = format_words_report(&WordsReport {
            topic: "weather".to_string(),
            path: PathBuf::from("scripts/words_weather.json"),
            count: 1,
            origin: WordOrigin::Fallback,
        });
        assert_eq!(lines[0], "Wrote 1 word for 'weather' (offline vocabulary)");
        assert_eq!(lines[1], "    File: scripts/words_weather.json");
    }

    #[test]
    fn grammar_report_checked_and_skipped() {
        let mut report = GrammarReport {
            path: PathBuf::from("scripts/words_weather.json"),
            total: 3,
            corrected: 1,
            unverified: 0,
            duplicates: vec!["sade".to_string()],
            checked: true,
            report_path: Some(PathBuf::from("grammar.json")),
        };
        let lines = format_grammar_report(&report);
        assert_eq!(lines[0], "Verified 3 words: 1 corrected, 0 unverified");
        assert_eq!(lines[1], "    Duplicates removed: sade");
        assert_eq!(lines.last().unwrap(), "    Report: grammar.json");

        report.checked = false;
        report.duplicates.clear();
        report.report_path = None;
        let lines = format_grammar_report(&report);
        assert_eq!(lines[0], "Grammar check skipped (no collaborator), 3 words kept");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn illustrate_report_lists_each_entry() {
        let report = IllustrateReport {
            outcomes: vec![
                IllustrationOutcome::Generated {
                    word: "aurinko".to_string(),
                    path: PathBuf::from("illustrations/word_aurinko.png"),
                },
                IllustrationOutcome::Reused {
                    word: "sade".to_string(),
                    path: PathBuf::from("illustrations/word_sade.png"),
                },
                IllustrationOutcome::Skipped {
                    word: "lumi".to_string(),
                    kind: ErrorKind::InvalidResponseShape,
                    reason: "request blocked: SAFETY".to_string(),
                },
            ],
            mapping_path: PathBuf::from("illustrations/mapping.json"),
        };
        let lines = format_illustrate_report(&report);
        assert_eq!(
            lines,
            vec![
                "001 aurinko → word_aurinko.png",
                "002 sade: reused word_sade.png",
                "003 lumi: skipped (invalid response shape)",
                "Illustrated 1, reused 1, skipped 1",
                "    Mapping: illustrations/mapping.json",
            ]
        );
    }

    #[test]
    fn overlay_report_shows_cache_summary() {
        let report = OverlayReport {
            outcomes: vec![
                CardOutcome::Rendered {
                    word: "aurinko".to_string(),
                    path: PathBuf::from("cards/word_aurinko.png"),
                    scale: 0.85,
                },
                CardOutcome::Cached {
                    word: "sade".to_string(),
                    path: PathBuf::from("cards/word_sade.png"),
                },
                CardOutcome::Skipped {
                    word: "lumi".to_string(),
                    kind: ErrorKind::MissingMappingEntry,
                    reason: "no illustration recorded for 'lumi'".to_string(),
                },
            ],
            cache: CacheStats {
                hits: 1,
                copies: 0,
                misses: 1,
            },
            output_dir: PathBuf::from("cards"),
        };
        let lines = format_overlay_report(&report);
        assert_eq!(lines[0], "001 aurinko → word_aurinko.png (scale 0.85)");
        assert_eq!(lines[1], "002 sade: cached");
        assert_eq!(lines[2], "003 lumi: skipped (missing mapping entry)");
        assert_eq!(lines[3], "Cards: 2 of 3 in cards");
        assert_eq!(lines[4], "Cache: 1 cached, 1 rendered (2 total)");
    }

    #[test]
    fn caption_report_indents_each_line() {
        let report = CaptionReport {
            path: PathBuf::from("scripts/caption_weather.txt"),
            caption: Caption {
                text: "Opi sääsanoja!\nLearn weather words!".to_string(),
                generated: false,
            },
        };
        assert_eq!(
            format_caption_report(&report),
            vec![
                "Caption (fixed):",
                "    Opi sääsanoja!",
                "    Learn weather words!",
                "    File: scripts/caption_weather.txt",
            ]
        );
    }

    #[test]
    fn stage_started_formats_to_nothing() {
        assert!(format_event(&PipelineEvent::StageStarted(Stage::Words)).is_empty());
    }
}
