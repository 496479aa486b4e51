//! Hit timing for basic attacks.
//!
//! A unit's attack animation is authored at a fixed frame rate with a frame
//! on which the hit connects. When attacks come faster than the animation
//! plays, the whole animation is sped up, and the hit frame with it:
//!
//! ```text
//! animation_ms = ticks * (1000 / fps)
//! attack_ms    = 1000 / attack_speed
//! time_scale   = animation_ms / attack_ms   if animation_ms > attack_ms, else 1
//! hit_delay    = hit_tick * (1000 / fps) / time_scale
//! ```
//!
//! The result is rounded to whole milliseconds. Anything that does not
//! round to a positive value uses the configured fallback instead, so a
//! computed delay under 0.5 ms also falls back.

use crate::config::{AnimationDelay, ArenaConfig};
use crate::math::{Fixed, MS_PER_SECOND};

/// Delay in whole milliseconds between starting a basic attack and the hit.
#[must_use]
pub fn hit_delay_ms(
    animation: Option<AnimationDelay>,
    attack_speed: Fixed,
    config: &ArenaConfig,
) -> u32 {
    animation
        .and_then(|delay| scaled_hit_delay(delay, attack_speed, config.animation_fps))
        .map(|ms| ms.round())
        .and_then(|ms| ms.checked_to_num::<u32>())
        .filter(|ms| *ms > 0)
        .unwrap_or(config.fallback_hit_delay_ms)
}

fn scaled_hit_delay(delay: AnimationDelay, attack_speed: Fixed, fps: u32) -> Option<Fixed> {
    let frame_ms = MS_PER_SECOND.checked_div(Fixed::checked_from_num(fps)?)?;
    let animation_ms = Fixed::checked_from_num(delay.ticks)?.checked_mul(frame_ms)?;
    let attack_ms = MS_PER_SECOND.checked_div(attack_speed)?;

    let time_scale = if animation_ms > attack_ms {
        animation_ms.checked_div(attack_ms)?
    } else {
        Fixed::ONE
    };

    Fixed::checked_from_num(delay.hit_tick)?
        .checked_mul(frame_ms)?
        .checked_div(time_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(ticks: u32, hit_tick: u32, speed: f64) -> u32 {
        hit_delay_ms(
            Some(AnimationDelay::new(ticks, hit_tick)),
            Fixed::from_num(speed),
            &ArenaConfig::default(),
        )
    }

    #[test]
    fn test_unscaled_when_animation_fits() {
        // 18 frames at 36 fps = 500 ms, attack cycle 1000 ms.
        // Hit on frame 9 = 250 ms.
        assert_eq!(delay(18, 9, 1.0), 250);
    }

    #[test]
    fn test_scaled_when_attacks_outpace_animation() {
        // 36 frames = 1000 ms, attack cycle 500 ms, scale 2.
        // Hit on frame 18 = 500 ms, halved.
        assert_eq!(delay(36, 18, 2.0), 250);
    }

    #[test]
    fn test_missing_metadata_falls_back() {
        let config = ArenaConfig::default();
        assert_eq!(hit_delay_ms(None, Fixed::ONE, &config), 200);
    }

    #[test]
    fn test_degenerate_metadata_falls_back() {
        assert_eq!(delay(18, 0, 1.0), 200);
        assert_eq!(delay(0, 0, 1.0), 200);
    }

    #[test]
    fn test_zero_speed_falls_back() {
        let config = ArenaConfig::default();
        let animation = Some(AnimationDelay::new(18, 9));
        assert_eq!(hit_delay_ms(animation, Fixed::ZERO, &config), 200);
    }

    #[test]
    fn test_zero_fps_falls_back() {
        let config = ArenaConfig {
            animation_fps: 0,
            ..ArenaConfig::default()
        };
        let animation = Some(AnimationDelay::new(18, 9));
        assert_eq!(hit_delay_ms(animation, Fixed::ONE, &config), 200);
    }

    #[test]
    fn test_sub_millisecond_delay_falls_back() {
        let fast_frames = |fps| ArenaConfig {
            animation_fps: fps,
            ..ArenaConfig::default()
        };
        let animation = Some(AnimationDelay::new(1, 1));
        // 0.01 ms rounds to zero.
        assert_eq!(hit_delay_ms(animation, Fixed::ONE, &fast_frames(100_000)), 200);
        // 0.625 ms rounds up to one.
        assert_eq!(hit_delay_ms(animation, Fixed::ONE, &fast_frames(1_600)), 1);
    }

    #[test]
    fn test_fallback_is_configurable() {
        let config = ArenaConfig {
            fallback_hit_delay_ms: 120,
            ..ArenaConfig::default()
        };
        assert_eq!(hit_delay_ms(None, Fixed::ONE, &config), 120);
    }
}
