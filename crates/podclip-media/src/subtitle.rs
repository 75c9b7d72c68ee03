//! Word-level karaoke subtitle compiler.
//!
//! Compiles a word-aligned transcript into an ASS event track with
//! progressive per-word highlighting: every word carries a `{\k}` duration
//! tag in centiseconds, and positive inter-word gaps become their own
//! zero-width timed spaces so the highlight cursor pauses instead of
//! drifting. The compiler only produces the styled track; burn-in is a
//! separate FFmpeg invocation.

use std::path::Path;

use crate::error::MediaResult;
use podclip_models::WordSpan;

/// Subtitle font, baked into the render image.
const FONT_NAME: &str = "Anton";
/// Display font size on the 1080x1920 canvas.
const FONT_SIZE: u32 = 140;
/// Sung (already highlighted) color, white.
const PRIMARY_COLOUR: &str = "&H00FFFFFF";
/// Pending (not yet sung) color, dimmed grey.
const SECONDARY_COLOUR: &str = "&H00B0B0B0";
/// Outline color, black.
const OUTLINE_COLOUR: &str = "&H00000000";
/// Shadow color, half-transparent black.
const BACK_COLOUR: &str = "&H80000000";
/// Minimum inter-word gap encoded as its own timed space (seconds).
const GAP_EPSILON: f64 = 0.001;

/// A word re-based to clip-relative time.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleWord {
    pub text: String,
    pub start_rel: f64,
    pub end_rel: f64,
}

impl SubtitleWord {
    /// Highlight duration in centiseconds, floored at 1 to avoid
    /// zero-length tags.
    pub fn duration_cs(&self) -> i64 {
        ((self.end_rel - self.start_rel) * 100.0).round().max(1.0) as i64
    }
}

/// An ordered, non-empty run of words rendered as one subtitle event.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLine {
    pub words: Vec<SubtitleWord>,
}

impl SubtitleLine {
    pub fn line_start(&self) -> f64 {
        self.words.first().map(|w| w.start_rel).unwrap_or(0.0)
    }

    pub fn line_end(&self) -> f64 {
        self.words.last().map(|w| w.end_rel).unwrap_or(0.0)
    }

    /// Event text with per-word karaoke tags.
    ///
    /// Words are joined with a plain space inside the preceding tag's
    /// region; a positive gap becomes its own zero-width timed space.
    pub fn karaoke_text(&self) -> String {
        let mut text = String::new();
        for (i, word) in self.words.iter().enumerate() {
            text.push_str(&format!(
                "{{\\k{}}}{}",
                word.duration_cs(),
                escape_text(&word.text)
            ));
            if let Some(next) = self.words.get(i + 1) {
                let gap = next.start_rel - word.end_rel;
                if gap > GAP_EPSILON {
                    text.push_str(&format!("{{\\k{}}} ", (gap * 100.0).round() as i64));
                } else {
                    text.push(' ');
                }
            }
        }
        text
    }
}

/// Escape characters that would be read as override-tag delimiters.
fn escape_text(text: &str) -> String {
    text.replace('{', r"\{").replace('}', r"\}")
}

/// Filter the transcript to the clip window and rebase to clip-relative time.
///
/// Words must overlap `[clip_start, clip_end]`; empty text and words ending
/// at or before the clip start are discarded, never corrected.
pub fn filter_and_rebase(
    transcript: &[WordSpan],
    clip_start: f64,
    clip_end: f64,
) -> Vec<SubtitleWord> {
    transcript
        .iter()
        .filter(|w| w.is_well_formed() && w.overlaps(clip_start, clip_end))
        .filter_map(|w| {
            let start_rel = (w.start - clip_start).max(0.0);
            let end_rel = (w.end - clip_start).max(0.0);
            if end_rel <= 0.0 {
                return None;
            }
            Some(SubtitleWord {
                text: w.text.trim().to_string(),
                start_rel,
                end_rel,
            })
        })
        .collect()
}

/// Greedily partition words into lines of at most `max_words`, in
/// transcript order.
pub fn partition_lines(words: Vec<SubtitleWord>, max_words: usize) -> Vec<SubtitleLine> {
    let max_words = max_words.max(1);
    let mut lines = Vec::new();
    let mut current: Vec<SubtitleWord> = Vec::new();

    for word in words {
        if current.len() >= max_words {
            lines.push(SubtitleLine {
                words: std::mem::take(&mut current),
            });
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(SubtitleLine { words: current });
    }
    lines
}

/// A compiled ASS subtitle track.
#[derive(Debug, Clone)]
pub struct AssDocument {
    play_res_x: u32,
    play_res_y: u32,
    lines: Vec<SubtitleLine>,
}

impl AssDocument {
    /// The compiled subtitle lines.
    pub fn lines(&self) -> &[SubtitleLine] {
        &self.lines
    }

    /// Render the full ASS document.
    pub fn render(&self) -> String {
        let mut doc = format!(
            "[Script Info]\n\
             ScriptType: v4.00+\n\
             WrapStyle: 0\n\
             ScaledBorderAndShadow: yes\n\
             PlayResX: {x}\n\
             PlayResY: {y}\n\
             \n\
             [V4+ Styles]\n\
             Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
             Style: Karaoke,{font},{size},{pri},{sec},{out},{back},0,0,0,0,100,100,0,0,1,2,2,2,50,50,50,1\n\
             \n\
             [Events]\n\
             Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
            x = self.play_res_x,
            y = self.play_res_y,
            font = FONT_NAME,
            size = FONT_SIZE,
            pri = PRIMARY_COLOUR,
            sec = SECONDARY_COLOUR,
            out = OUTLINE_COLOUR,
            back = BACK_COLOUR,
        );

        for line in &self.lines {
            doc.push_str(&format!(
                "Dialogue: 0,{},{},Karaoke,,0,0,0,,{}\n",
                cs_to_timestamp(secs_to_cs(line.line_start())),
                cs_to_timestamp(secs_to_cs(line.line_end())),
                line.karaoke_text()
            ));
        }

        doc
    }

    /// Write the rendered document to disk.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        tokio::fs::write(path.as_ref(), self.render()).await?;
        Ok(())
    }
}

/// Compile the karaoke subtitle track for one clip.
pub fn compile_subtitles(
    transcript: &[WordSpan],
    clip_start: f64,
    clip_end: f64,
    max_words: usize,
    play_res: (u32, u32),
) -> AssDocument {
    let words = filter_and_rebase(transcript, clip_start, clip_end);
    let lines = partition_lines(words, max_words);
    AssDocument {
        play_res_x: play_res.0,
        play_res_y: play_res.1,
        lines,
    }
}

/// Seconds to centiseconds, the ASS timing unit.
fn secs_to_cs(secs: f64) -> i64 {
    (secs * 100.0).round() as i64
}

/// Centiseconds to an ASS timestamp (`H:MM:SS.CC`).
fn cs_to_timestamp(cs: i64) -> String {
    let total = cs.max(0);
    let h = total / 360_000;
    let m = (total % 360_000) / 6_000;
    let s = (total % 6_000) / 100;
    let c = total % 100;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(spans: &[(f64, f64, &str)]) -> Vec<WordSpan> {
        spans
            .iter()
            .map(|&(s, e, t)| WordSpan::new(s, e, t))
            .collect()
    }

    #[test]
    fn test_hello_world_example() {
        let transcript = words(&[(0.0, 0.4, "hello"), (0.4, 0.9, "world")]);
        let doc = compile_subtitles(&transcript, 0.0, 10.0, 5, (1080, 1920));

        assert_eq!(doc.lines().len(), 1);
        let line = &doc.lines()[0];
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.karaoke_text(), r"{\k40}hello {\k50}world");
    }

    #[test]
    fn test_lines_ordered_non_overlapping_and_capped() {
        let transcript = words(&[
            (0.0, 0.5, "a"),
            (0.5, 1.0, "b"),
            (1.0, 1.5, "c"),
            (1.5, 2.0, "d"),
            (2.0, 2.5, "e"),
        ]);
        let doc = compile_subtitles(&transcript, 0.0, 10.0, 2, (1080, 1920));

        assert_eq!(doc.lines().len(), 3);
        for line in doc.lines() {
            assert!(!line.words.is_empty());
            assert!(line.words.len() <= 2);
        }
        for pair in doc.lines().windows(2) {
            assert!(pair[0].line_end() <= pair[1].line_start());
        }
    }

    #[test]
    fn test_duration_round_trip() {
        let transcript = words(&[
            (10.0, 10.42, "one"),
            (10.42, 10.9, "two"),
            (11.15, 11.5, "three"),
        ]);
        let doc = compile_subtitles(&transcript, 10.0, 70.0, 5, (1080, 1920));
        let line = &doc.lines()[0];

        let mut sum = 0i64;
        for (i, w) in line.words.iter().enumerate() {
            sum += w.duration_cs();
            if let Some(next) = line.words.get(i + 1) {
                let gap = next.start_rel - w.end_rel;
                if gap > 0.001 {
                    sum += (gap * 100.0).round() as i64;
                }
            }
        }
        let total = ((line.line_end() - line.line_start()) * 100.0).round() as i64;
        assert!((sum - total).abs() <= 1, "sum={} total={}", sum, total);
    }

    #[test]
    fn test_gap_becomes_timed_space() {
        let transcript = words(&[(0.0, 0.4, "hello"), (0.9, 1.4, "world")]);
        let doc = compile_subtitles(&transcript, 0.0, 10.0, 5, (1080, 1920));
        assert_eq!(
            doc.lines()[0].karaoke_text(),
            r"{\k40}hello{\k50} {\k50}world"
        );
    }

    #[test]
    fn test_zero_length_word_floors_at_one_cs() {
        let transcript = words(&[(1.0, 1.0, "blip")]);
        let doc = compile_subtitles(&transcript, 0.0, 10.0, 5, (1080, 1920));
        assert_eq!(doc.lines()[0].karaoke_text(), r"{\k1}blip");
    }

    #[test]
    fn test_braces_escaped() {
        let transcript = words(&[(0.0, 0.5, "a{b}c")]);
        let doc = compile_subtitles(&transcript, 0.0, 10.0, 5, (1080, 1920));
        assert_eq!(doc.lines()[0].karaoke_text(), r"{\k50}a\{b\}c");
    }

    #[test]
    fn test_window_filtering_and_rebase() {
        let transcript = words(&[
            (5.0, 5.5, "before"),
            (9.8, 10.2, "straddles"),
            (15.0, 15.5, "inside"),
            (29.9, 30.4, "tail"),
            (31.0, 31.5, "after"),
        ]);
        let rebased = filter_and_rebase(&transcript, 10.0, 30.0);

        let texts: Vec<&str> = rebased.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["straddles", "inside", "tail"]);
        // The straddling word is clamped to relative zero at the start
        assert_eq!(rebased[0].start_rel, 0.0);
        assert!((rebased[0].end_rel - 0.2).abs() < 1e-9);
        assert!((rebased[1].start_rel - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_words_discarded() {
        let transcript = words(&[(1.0, 0.5, "backwards"), (1.0, 1.5, "  "), (2.0, 2.5, "ok")]);
        let rebased = filter_and_rebase(&transcript, 0.0, 10.0);
        assert_eq!(rebased.len(), 1);
        assert_eq!(rebased[0].text, "ok");
    }

    #[test]
    fn test_render_header_and_event() {
        let transcript = words(&[(0.0, 0.4, "hello")]);
        let doc = compile_subtitles(&transcript, 0.0, 10.0, 5, (1080, 1920));
        let rendered = doc.render();

        assert!(rendered.contains("PlayResX: 1080"));
        assert!(rendered.contains("PlayResY: 1920"));
        assert!(rendered.contains("Style: Karaoke,Anton,140,"));
        assert!(rendered.contains("Dialogue: 0,0:00:00.00,0:00:00.40,Karaoke,,0,0,0,,"));
    }

    #[test]
    fn test_cs_timestamp_format() {
        assert_eq!(cs_to_timestamp(0), "0:00:00.00");
        assert_eq!(cs_to_timestamp(40), "0:00:00.40");
        assert_eq!(cs_to_timestamp(6_100), "0:01:01.00");
        assert_eq!(cs_to_timestamp(360_000 + 125), "1:00:01.25");
    }

    #[test]
    fn test_empty_transcript_yields_no_events() {
        let doc = compile_subtitles(&[], 0.0, 10.0, 5, (1080, 1920));
        assert!(doc.lines().is_empty());
        assert!(doc.render().contains("[Events]"));
    }
}
