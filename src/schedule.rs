/// Absolute placement and fade windows for one segment, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Slot {
    pub start: f64,
    pub end: f64,
    pub fade_in: f64,
    pub fade_out: f64,
}

/// Compute crossfade windows between consecutive segments and absolute
/// start/end timestamps.
///
/// Each adjacent pair shares one window of
/// `min(transition, fade_max_ratio * min(d_i, d_i+1))`, additionally clamped
/// to half of either neighbor so a segment's two fades never overlap. The
/// first fade-in and last fade-out are 0. Crossfades are rendering-time
/// blends inside the allocated durations; they never move a boundary, so
/// start/end come from plain cumulative summation.
pub fn schedule(durations: &[f64], transition: f64, fade_max_ratio: f64) -> Vec<Slot> {
    let n = durations.len();
    let mut slots = Vec::with_capacity(n);

    let mut clock = 0.0;
    for (i, &d) in durations.iter().enumerate() {
        let fade_in = if i == 0 {
            0.0
        } else {
            overlap(durations[i - 1], d, transition, fade_max_ratio)
        };
        let fade_out = if i + 1 == n {
            0.0
        } else {
            overlap(d, durations[i + 1], transition, fade_max_ratio)
        };
        slots.push(Slot {
            start: clock,
            end: clock + d,
            fade_in,
            fade_out,
        });
        clock += d;
    }
    slots
}

fn overlap(a: f64, b: f64, transition: f64, fade_max_ratio: f64) -> f64 {
    transition
        .min(fade_max_ratio * a.min(b))
        .min(a / 2.0)
        .min(b / 2.0)
        .max(0.0)
}
