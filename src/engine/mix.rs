//! Mix policy: derive every track's audible level from the flags of all
//! tracks.
//!
//! Solo is global state, so levels are always recomputed for the whole set in
//! one pass over an indexed slice. Tracks never talk to each other.

/// User-owned controls of one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strip {
    /// Baseline level in `0.0..=1.0`.
    pub volume: f32,
    /// Mute set explicitly by the user.
    pub user_muted: bool,
    pub solo: bool,
}

impl Default for Strip {
    fn default() -> Self {
        Self {
            volume: 1.0,
            user_muted: false,
            solo: false,
        }
    }
}

/// Output of the mix policy for one track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Level {
    pub effective_volume: f32,
    /// Silenced because another track is soloed.
    pub solo_forced: bool,
}

impl Level {
    pub fn unity() -> Self {
        Self {
            effective_volume: 1.0,
            solo_forced: false,
        }
    }
}

/// Compute the level of every strip, index for index.
///
/// Without any solo a track plays at its volume unless muted. With at least
/// one solo, soloed tracks play at their volume (ignoring their own mute) and
/// every other track is forced silent.
pub fn recompute(strips: &[Strip]) -> Vec<Level> {
    let any_solo = strips.iter().any(|s| s.solo);
    strips.iter().map(|s| level_for(s, any_solo)).collect()
}

fn level_for(strip: &Strip, any_solo: bool) -> Level {
    if any_solo {
        if strip.solo {
            Level {
                effective_volume: strip.volume,
                solo_forced: false,
            }
        } else {
            Level {
                effective_volume: 0.0,
                solo_forced: true,
            }
        }
    } else {
        Level {
            effective_volume: if strip.user_muted { 0.0 } else { strip.volume },
            solo_forced: false,
        }
    }
}

/// Remembers the user mutes in place when the first solo engaged.
///
/// When the last solo is released, mutes that existed before engagement come
/// back and mutes added while soloing are dropped.
#[derive(Debug, Default, Clone)]
pub struct SoloSession {
    muted_at_engage: Option<Vec<bool>>,
}

impl SoloSession {
    pub fn is_active(&self) -> bool {
        self.muted_at_engage.is_some()
    }

    /// Update the session after one solo flag flipped.
    ///
    /// `had_solo` is whether any strip was soloed before the flip.
    pub fn observe(&mut self, had_solo: bool, strips: &mut [Strip]) {
        let has_solo = strips.iter().any(|s| s.solo);
        match (had_solo, has_solo) {
            (false, true) => self.engage(strips),
            (true, false) => self.release(strips),
            _ => {}
        }
    }

    fn engage(&mut self, strips: &[Strip]) {
        self.muted_at_engage = Some(strips.iter().map(|s| s.user_muted).collect());
    }

    fn release(&mut self, strips: &mut [Strip]) {
        let Some(before) = self.muted_at_engage.take() else {
            return;
        };
        for (strip, was_muted) in strips.iter_mut().zip(before) {
            strip.user_muted = strip.user_muted && was_muted;
        }
    }

    pub fn clear(&mut self) {
        self.muted_at_engage = None;
    }
}
