use crate::{
    config::TimelineConfig,
    error::{MontageError, MontageResult},
    media::{MediaItem, MediaKind},
};

/// Segments shorter than this are not representable; the allocator drops the
/// item and redistributes instead of emitting one.
pub const MIN_CLIP_SECONDS: f64 = 0.1;

const EPSILON: f64 = 1e-9;

/// Duration assigned to one surviving input item.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ClipBudget {
    /// Index into the scanned item list.
    pub item: usize,
    pub seconds: f64,
    /// Video raised past its base allocation by the all-items
    /// redistribution; playback may exceed the source's native duration.
    pub stretched: bool,
}

/// Assign a duration to every item so the total equals `cfg.duration`.
///
/// Base allocation: photos get `photo_seconds`; videos get their native
/// duration under preserve-videos, else `min(native, video_max_seconds)`.
/// A deficit is first spread across photos up to `photo_max_seconds`, then
/// proportionally across everything. A surplus scales everything down
/// uniformly, dropping items that would fall below [`MIN_CLIP_SECONDS`].
/// Residual rounding error is absorbed by the last item.
pub fn allocate(items: &[MediaItem], cfg: &TimelineConfig) -> MontageResult<Vec<ClipBudget>> {
    if items.is_empty() {
        return Err(MontageError::EmptyInput);
    }
    let target = cfg.duration;

    let base: Vec<f64> = items.iter().map(|it| base_seconds(it, cfg)).collect();
    let mut seconds = base.clone();
    let total: f64 = seconds.iter().sum();

    if total < target - EPSILON {
        let mut surplus = target - total;

        // Raise photos evenly toward their cap, round-robin so early caps
        // spill over to the remaining photos.
        let mut open: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(i, it)| {
                it.kind == MediaKind::Photo && seconds[*i] < cfg.photo_max_seconds - EPSILON
            })
            .map(|(i, _)| i)
            .collect();
        while surplus > EPSILON && !open.is_empty() {
            let per = surplus / open.len() as f64;
            let mut still_open = Vec::with_capacity(open.len());
            for i in open {
                let slack = cfg.photo_max_seconds - seconds[i];
                let add = per.min(slack);
                seconds[i] += add;
                surplus -= add;
                if slack > per + EPSILON {
                    still_open.push(i);
                }
            }
            open = still_open;
        }

        // Every photo capped (or none present): stretch all items
        // proportionally from their current value. This is the only path
        // where a video may be asked to outlast its source.
        if surplus > EPSILON {
            let current: f64 = seconds.iter().sum();
            if current > EPSILON {
                let factor = target / current;
                for s in seconds.iter_mut() {
                    *s *= factor;
                }
            } else {
                let per = target / seconds.len() as f64;
                seconds.fill(per);
            }
        }
    } else if total > target + EPSILON {
        let factor = target / total;
        for s in seconds.iter_mut() {
            *s *= factor;
        }
    }

    let mut kept: Vec<usize> = (0..items.len()).collect();
    enforce_floor(&mut kept, &mut seconds, target)?;

    // Absorb residual rounding into the last surviving item so the sum is
    // exact.
    let sum: f64 = kept.iter().map(|&i| seconds[i]).sum();
    let last = *kept.last().expect("enforce_floor keeps at least one item");
    seconds[last] += target - sum;

    Ok(kept
        .into_iter()
        .map(|i| ClipBudget {
            item: i,
            seconds: seconds[i],
            stretched: items[i].kind == MediaKind::Video && seconds[i] > base[i] + 1e-6,
        })
        .collect())
}

fn base_seconds(item: &MediaItem, cfg: &TimelineConfig) -> f64 {
    match item.kind {
        MediaKind::Photo => cfg.photo_seconds,
        MediaKind::Video => {
            let native = item.native_duration.filter(|d| *d > 0.0);
            if cfg.preserve_videos {
                native.unwrap_or(cfg.video_max_seconds)
            } else {
                native.map_or(cfg.video_max_seconds, |d| d.min(cfg.video_max_seconds))
            }
        }
    }
}

/// Drop items whose allocation fell below the floor, rescaling the remainder
/// to the target after each removal. Ties drop the later item first.
fn enforce_floor(kept: &mut Vec<usize>, seconds: &mut [f64], target: f64) -> MontageResult<()> {
    loop {
        let below = kept
            .iter()
            .enumerate()
            .filter(|&(_, &i)| seconds[i] < MIN_CLIP_SECONDS - EPSILON)
            .min_by(|&(_, &a), &(_, &b)| {
                seconds[a]
                    .partial_cmp(&seconds[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.cmp(&a))
            });
        let Some((pos, _)) = below else {
            return Ok(());
        };
        if kept.len() == 1 {
            return Err(MontageError::allocation(format!(
                "no item can fill the remaining {target:.3}s above the {MIN_CLIP_SECONDS}s floor"
            )));
        }
        kept.remove(pos);

        let sum: f64 = kept.iter().map(|&i| seconds[i]).sum();
        if sum > EPSILON {
            let factor = target / sum;
            for &i in kept.iter() {
                seconds[i] *= factor;
            }
        } else {
            let per = target / kept.len() as f64;
            for &i in kept.iter() {
                seconds[i] = per;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn photo(n: u32) -> MediaItem {
        MediaItem {
            path: PathBuf::from(format!("p{n}.jpg")),
            kind: MediaKind::Photo,
            width: 4000,
            height: 3000,
            native_duration: None,
            captured_at: Default::default(),
        }
    }

    fn video(n: u32, dur: f64) -> MediaItem {
        MediaItem {
            path: PathBuf::from(format!("v{n}.mp4")),
            kind: MediaKind::Video,
            width: 1920,
            height: 1080,
            native_duration: Some(dur),
            captured_at: Default::default(),
        }
    }

    fn total(budgets: &[ClipBudget]) -> f64 {
        budgets.iter().map(|b| b.seconds).sum()
    }

    #[test]
    fn empty_input_is_an_error() {
        let cfg = TimelineConfig::default();
        assert!(matches!(
            allocate(&[], &cfg),
            Err(MontageError::EmptyInput)
        ));
    }

    #[test]
    fn all_photos_deficit_raises_evenly_under_cap() {
        let cfg = TimelineConfig {
            duration: 12.0,
            photo_seconds: 2.5,
            photo_max_seconds: 6.0,
            ..TimelineConfig::default()
        };
        let items = vec![photo(0), photo(1), photo(2)];
        let budgets = allocate(&items, &cfg).unwrap();
        assert_eq!(budgets.len(), 3);
        for b in &budgets {
            assert!((b.seconds - 4.0).abs() < 1e-6);
            assert!(b.seconds <= 6.0 + 1e-6);
            assert!(!b.stretched);
        }
        assert!((total(&budgets) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn capped_photos_spill_into_proportional_stretch() {
        let cfg = TimelineConfig {
            duration: 20.0,
            photo_seconds: 2.5,
            photo_max_seconds: 6.0,
            ..TimelineConfig::default()
        };
        let items = vec![photo(0), photo(1), photo(2)];
        let budgets = allocate(&items, &cfg).unwrap();
        // 3 photos cap at 18s; the last 2s stretch all of them past the cap.
        assert!((total(&budgets) - 20.0).abs() < 1e-6);
        for b in &budgets {
            assert!((b.seconds - 20.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn single_long_video_is_capped_then_stretched_to_target() {
        let cfg = TimelineConfig {
            duration: 8.0,
            video_max_seconds: 5.0,
            ..TimelineConfig::default()
        };
        let items = vec![video(0, 90.0)];
        let budgets = allocate(&items, &cfg).unwrap();
        assert_eq!(budgets.len(), 1);
        assert!((budgets[0].seconds - 8.0).abs() < 1e-6);
        assert!(budgets[0].stretched);
    }

    #[test]
    fn preserve_videos_keeps_native_duration_as_base() {
        let cfg = TimelineConfig {
            duration: 20.0,
            preserve_videos: true,
            video_max_seconds: 5.0,
            ..TimelineConfig::default()
        };
        let items = vec![video(0, 12.0), photo(0), photo(1)];
        let budgets = allocate(&items, &cfg).unwrap();
        assert!((budgets[0].seconds - 12.0).abs() < 1e-6);
        assert!(!budgets[0].stretched);
        assert!((total(&budgets) - 20.0).abs() < 1e-6);
    }

    #[test]
    fn video_without_probe_falls_back_to_max() {
        let cfg = TimelineConfig {
            duration: 5.0,
            video_max_seconds: 5.0,
            ..TimelineConfig::default()
        };
        let mut v = video(0, 0.0);
        v.native_duration = None;
        let budgets = allocate(&[v], &cfg).unwrap();
        assert!((budgets[0].seconds - 5.0).abs() < 1e-6);
    }

    #[test]
    fn surplus_scales_everything_down_uniformly() {
        let cfg = TimelineConfig {
            duration: 5.0,
            photo_seconds: 2.5,
            ..TimelineConfig::default()
        };
        let items = vec![photo(0), photo(1), photo(2), photo(3)];
        let budgets = allocate(&items, &cfg).unwrap();
        assert_eq!(budgets.len(), 4);
        for b in &budgets {
            assert!((b.seconds - 1.25).abs() < 1e-6);
        }
        assert!((total(&budgets) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn below_floor_items_are_dropped_and_target_still_met() {
        let cfg = TimelineConfig {
            duration: 1.0,
            photo_seconds: 2.5,
            ..TimelineConfig::default()
        };
        // 30 photos at 2.5s scale to ~0.033s each, far below the floor.
        let items: Vec<_> = (0..30).map(photo).collect();
        let budgets = allocate(&items, &cfg).unwrap();
        assert!(budgets.len() < 30);
        assert!(!budgets.is_empty());
        for b in &budgets {
            assert!(b.seconds >= MIN_CLIP_SECONDS - 1e-9);
        }
        assert!((total(&budgets) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_when_even_one_item_cannot_fit() {
        let cfg = TimelineConfig {
            duration: 0.05,
            ..TimelineConfig::default()
        };
        let items = vec![photo(0), photo(1)];
        assert!(matches!(
            allocate(&items, &cfg),
            Err(MontageError::Allocation(_))
        ));
    }

    #[test]
    fn allocation_is_deterministic() {
        let cfg = TimelineConfig {
            duration: 33.0,
            ..TimelineConfig::default()
        };
        let items = vec![photo(0), video(0, 3.2), photo(1), video(1, 7.7), photo(2)];
        let a = allocate(&items, &cfg).unwrap();
        let b = allocate(&items, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mixed_deficit_prefers_photos_before_stretching_videos() {
        let cfg = TimelineConfig {
            duration: 12.0,
            photo_seconds: 2.5,
            photo_max_seconds: 6.0,
            video_max_seconds: 5.0,
            ..TimelineConfig::default()
        };
        let items = vec![photo(0), video(0, 4.0)];
        let budgets = allocate(&items, &cfg).unwrap();
        // Photo caps at 6; the remaining 2s stretch both proportionally.
        assert!((total(&budgets) - 12.0).abs() < 1e-6);
        assert!(budgets[1].seconds > 4.0);
        assert!(budgets[1].stretched);
        assert!(budgets[0].seconds >= 6.0 - 1e-6);
    }
}
