//! Unlock-pattern encoding and the 3x3 grid recorder.
//!
//! A pattern is an ordered list of grid cells `0..=8` (row-major). It is
//! stored as comma-separated decimal, e.g. `"0,1,2,5"`; the empty string
//! means no points were recorded.

use std::time::Duration;

use crate::error::PatternError;

pub const GRID_SIZE: u8 = 3;
pub const CELL_COUNT: u8 = GRID_SIZE * GRID_SIZE;
pub const PLAYBACK_STEP: Duration = Duration::from_millis(450);
pub const PLAYBACK_TAIL: Duration = Duration::from_millis(800);

pub fn encode(points: &[u8]) -> String {
    points
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Strict decode: any token that is not a cell index fails the whole value.
pub fn decode(value: &str) -> Result<Vec<u8>, PatternError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<u8>() {
            Ok(cell) if cell < CELL_COUNT => Ok(cell),
            _ => Err(PatternError::InvalidToken(token.to_string())),
        })
        .collect()
}

/// Drops tokens `decode` would reject. Used where a broken value should still
/// render instead of blocking the screen.
pub fn decode_lossy(value: &str) -> Vec<u8> {
    value
        .split(',')
        .filter_map(|token| token.trim().parse::<u8>().ok())
        .filter(|cell| *cell < CELL_COUNT)
        .collect()
}

/// Tap semantics of the recorder: append an unused cell, undo when tapping
/// the last cell, ignore taps on earlier cells.
pub fn toggle(points: &mut Vec<u8>, cell: u8) {
    if cell >= CELL_COUNT {
        return;
    }
    match points.iter().position(|p| *p == cell) {
        None => points.push(cell),
        Some(pos) if pos + 1 == points.len() => {
            points.pop();
        }
        Some(_) => {}
    }
}

pub fn cell_position(cell: u8) -> (u8, u8) {
    (cell / GRID_SIZE, cell % GRID_SIZE)
}

/// Where the playback cursor is at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackFrame {
    /// Started, nothing highlighted yet.
    Priming,
    /// Highlighting `points[step]`.
    Step(usize),
    /// Last step reached and held for the tail pause.
    Holding(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    len: usize,
}

impl Playback {
    /// Playback needs at least one edge to show.
    pub fn new(len: usize) -> Option<Self> {
        (len >= 2).then_some(Self { len })
    }

    pub fn total(&self) -> Duration {
        PLAYBACK_STEP * self.len as u32 + PLAYBACK_TAIL
    }

    pub fn frame_at(&self, elapsed: Duration) -> PlaybackFrame {
        let last_step_at = PLAYBACK_STEP * self.len as u32;
        if elapsed >= self.total() {
            return PlaybackFrame::Finished;
        }
        if elapsed >= last_step_at {
            return PlaybackFrame::Holding(self.len - 1);
        }
        let ticks = (elapsed.as_millis() / PLAYBACK_STEP.as_millis()) as usize;
        if ticks == 0 {
            PlaybackFrame::Priming
        } else {
            PlaybackFrame::Step(ticks - 1)
        }
    }
}

impl PlaybackFrame {
    /// The highlighted index, `-1` while priming, `None` once finished.
    pub fn cursor(self) -> Option<isize> {
        match self {
            PlaybackFrame::Priming => Some(-1),
            PlaybackFrame::Step(i) | PlaybackFrame::Holding(i) => Some(i as isize),
            PlaybackFrame::Finished => None,
        }
    }
}

/// Interactive recorder state for one pattern value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternPad {
    points: Vec<u8>,
    playing: bool,
}

impl PatternPad {
    pub fn from_value(value: &str) -> Self {
        Self {
            points: decode_lossy(value),
            playing: false,
        }
    }

    pub fn points(&self) -> &[u8] {
        &self.points
    }

    pub fn value(&self) -> String {
        encode(&self.points)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn tap(&mut self, cell: u8) -> bool {
        if self.playing {
            return false;
        }
        let before = self.points.len();
        toggle(&mut self.points, cell);
        before != self.points.len()
    }

    pub fn reset(&mut self) {
        if !self.playing {
            self.points.clear();
        }
    }

    pub fn start_playback(&mut self) -> Option<Playback> {
        if self.playing {
            return None;
        }
        let playback = Playback::new(self.points.len())?;
        self.playing = true;
        Some(playback)
    }

    pub fn stop_playback(&mut self) {
        self.playing = false;
    }

    /// Cells drawn as the path: everything when idle, the played prefix
    /// during playback.
    pub fn visible_path(&self, frame: Option<PlaybackFrame>) -> &[u8] {
        match frame.and_then(PlaybackFrame::cursor) {
            Some(cursor) if self.playing => {
                let end = (cursor + 1).max(0) as usize;
                &self.points[..end.min(self.points.len())]
            }
            _ => &self.points,
        }
    }

    /// 1-based order of a cell in the path.
    pub fn order_of(&self, cell: u8) -> Option<usize> {
        self.points.iter().position(|p| *p == cell).map(|i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_joins_with_commas() {
        assert_eq!(encode(&[0, 1, 2, 5]), "0,1,2,5");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn decode_drops_empty_tokens() {
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("3,,4,").unwrap(), vec![3, 4]);
    }

    #[test]
    fn decode_rejects_malformed_tokens() {
        assert_eq!(
            decode("1,x,2"),
            Err(PatternError::InvalidToken("x".into()))
        );
        assert_eq!(decode("9"), Err(PatternError::InvalidToken("9".into())));
        assert_eq!(decode_lossy("1,x,2,12"), vec![1, 2]);
    }

    #[test]
    fn round_trip_for_distinct_cells() {
        let sequences: [&[u8]; 4] = [&[], &[4], &[0, 4, 8], &[6, 3, 0, 1, 2, 5, 8, 7]];
        for seq in sequences {
            assert_eq!(decode(&encode(seq)).unwrap(), seq);
        }
    }

    #[test]
    fn toggle_appends_then_undoes_last() {
        let mut points = vec![0, 1];
        toggle(&mut points, 4);
        assert_eq!(points, vec![0, 1, 4]);
        toggle(&mut points, 4);
        assert_eq!(points, vec![0, 1]);
    }

    #[test]
    fn toggle_ignores_mid_path_cells_and_out_of_range() {
        let mut points = vec![0, 1, 2];
        toggle(&mut points, 1);
        toggle(&mut points, 9);
        assert_eq!(points, vec![0, 1, 2]);
    }

    #[test]
    fn playback_requires_two_points() {
        assert!(Playback::new(0).is_none());
        assert!(Playback::new(1).is_none());
        assert!(Playback::new(2).is_some());
    }

    #[test]
    fn playback_timeline() {
        let pb = Playback::new(3).unwrap();
        assert_eq!(pb.frame_at(Duration::ZERO), PlaybackFrame::Priming);
        assert_eq!(pb.frame_at(Duration::from_millis(449)).cursor(), Some(-1));
        assert_eq!(pb.frame_at(Duration::from_millis(450)), PlaybackFrame::Step(0));
        assert_eq!(pb.frame_at(Duration::from_millis(900)), PlaybackFrame::Step(1));
        assert_eq!(pb.frame_at(Duration::from_millis(1350)), PlaybackFrame::Holding(2));
        assert_eq!(pb.frame_at(Duration::from_millis(2149)), PlaybackFrame::Holding(2));
        assert_eq!(pb.frame_at(Duration::from_millis(2150)), PlaybackFrame::Finished);
        assert_eq!(pb.total(), Duration::from_millis(2150));
    }

    #[test]
    fn pad_locks_edits_while_playing() {
        let mut pad = PatternPad::from_value("0,1,2");
        let pb = pad.start_playback().unwrap();
        assert!(!pad.tap(5));
        pad.reset();
        assert_eq!(pad.value(), "0,1,2");

        let frame = pb.frame_at(Duration::from_millis(500));
        assert_eq!(pad.visible_path(Some(frame)), &[0]);
        let priming = pb.frame_at(Duration::ZERO);
        assert!(pad.visible_path(Some(priming)).is_empty());

        pad.stop_playback();
        assert!(pad.tap(5));
        assert_eq!(pad.value(), "0,1,2,5");
        assert_eq!(pad.order_of(5), Some(4));
    }

    #[test]
    fn cell_positions_are_row_major() {
        assert_eq!(cell_position(0), (0, 0));
        assert_eq!(cell_position(5), (1, 2));
        assert_eq!(cell_position(7), (2, 1));
    }
}
