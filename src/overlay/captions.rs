use std::ops::Range;

use crate::composition::config::CaptionMode;
use crate::timeline::model::CaptionEvent;

/// What the overlay should draw at one timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionView<'a> {
    /// Index of the event in the timeline's sorted caption list.
    pub index: usize,
    /// The active event.
    pub event: &'a CaptionEvent,
    /// Effective display mode, never [`CaptionMode::Hidden`].
    pub mode: CaptionMode,
    /// Byte ranges of the whitespace-separated words in `event.text`.
    pub words: Vec<Range<usize>>,
    /// Highlighted word, set only in [`CaptionMode::Highlight`].
    pub highlight_word: Option<usize>,
}

/// First event, in the given (start-sorted) order, with `start <= t <= end`.
///
/// Overlapping events are tolerated: the earlier-starting one wins.
pub fn active_caption(captions: &[CaptionEvent], t: f64) -> Option<(usize, &CaptionEvent)> {
    captions
        .iter()
        .enumerate()
        .find(|(_, c)| c.start_sec <= t && t <= c.end_sec)
}

/// Mode after applying the composition setting and the event hint.
///
/// `Hidden` in the composition hides everything; otherwise the event's hint wins.
pub fn effective_mode(config_mode: CaptionMode, event: &CaptionEvent) -> CaptionMode {
    match config_mode {
        CaptionMode::Hidden => CaptionMode::Hidden,
        _ => event.mode.unwrap_or(config_mode),
    }
}

/// Byte ranges of the whitespace-separated words of `text`.
pub fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Index of the word spoken at `t`, clamped to the last word.
///
/// Upstream word timings are used when they line up with the text's words; otherwise the event
/// duration is split evenly: `floor((t - start) / (duration / word_count))`.
pub fn highlight_word_index(event: &CaptionEvent, word_count: usize, t: f64) -> Option<usize> {
    if word_count == 0 {
        return None;
    }
    let last = word_count - 1;

    if let Some(timings) = event.words.as_deref()
        && timings.len() == word_count
    {
        let started = timings.iter().take_while(|w| w.start_sec <= t).count();
        return Some(started.saturating_sub(1).min(last));
    }

    let duration = event.end_sec - event.start_sec;
    if duration.is_nan() || duration <= 0.0 {
        return Some(0);
    }
    let per_word = duration / word_count as f64;
    let raw = ((t - event.start_sec) / per_word).floor();
    if !raw.is_finite() || raw < 0.0 {
        return Some(0);
    }
    Some((raw as usize).min(last))
}

/// Resolve the caption to draw at `t`, if any.
pub fn caption_at(
    captions: &[CaptionEvent],
    config_mode: CaptionMode,
    t: f64,
) -> Option<CaptionView<'_>> {
    let (index, event) = active_caption(captions, t)?;
    let mode = effective_mode(config_mode, event);
    if mode == CaptionMode::Hidden {
        return None;
    }
    let words = word_spans(&event.text);
    if words.is_empty() {
        return None;
    }
    let highlight_word = match mode {
        CaptionMode::Highlight => highlight_word_index(event, words.len(), t),
        _ => None,
    };
    Some(CaptionView {
        index,
        event,
        mode,
        words,
        highlight_word,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/captions.rs"]
mod tests;
