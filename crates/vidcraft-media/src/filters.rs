//! Video filter synthesis for clip effects.

use vidcraft_models::ClipEffect;

/// Format seconds the way filter arguments expect them (two decimals).
pub fn fmt_seconds(seconds: f64) -> String {
    format!("{:.2}", seconds)
}

/// Filter expression for a single effect on a clip of `clip_duration` seconds.
pub fn effect_filter(effect: &ClipEffect, clip_duration: f64) -> String {
    match *effect {
        ClipEffect::Grayscale => "hue=s=0".to_string(),
        ClipEffect::BoxBlur => "boxblur=2:1".to_string(),
        ClipEffect::Negate => "negate".to_string(),
        ClipEffect::FadeIn { duration } => {
            format!("fade=t=in:st=0:d={}", fmt_seconds(duration))
        }
        ClipEffect::FadeOut { duration } => {
            let start = (clip_duration - duration).max(0.0);
            format!("fade=t=out:st={}:d={}", fmt_seconds(start), fmt_seconds(duration))
        }
    }
}

/// Comma-joined filter chain for a clip, in effect order.
///
/// Returns `None` when the clip has no effects.
pub fn clip_filter_chain(effects: &[ClipEffect], clip_duration: f64) -> Option<String> {
    if effects.is_empty() {
        return None;
    }
    Some(
        effects
            .iter()
            .map(|e| effect_filter(e, clip_duration))
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_desaturates() {
        assert_eq!(effect_filter(&ClipEffect::Grayscale, 5.0), "hue=s=0");
    }

    #[test]
    fn test_fades_are_anchored_to_clip_edges() {
        assert_eq!(
            effect_filter(&ClipEffect::FadeIn { duration: 1.0 }, 6.0),
            "fade=t=in:st=0:d=1.00"
        );
        assert_eq!(
            effect_filter(&ClipEffect::FadeOut { duration: 1.5 }, 6.0),
            "fade=t=out:st=4.50:d=1.50"
        );
    }

    #[test]
    fn test_fade_out_longer_than_clip_starts_at_zero() {
        assert_eq!(
            effect_filter(&ClipEffect::FadeOut { duration: 3.0 }, 2.0),
            "fade=t=out:st=0.00:d=3.00"
        );
    }

    #[test]
    fn test_chain_preserves_order() {
        let chain = clip_filter_chain(
            &[ClipEffect::Negate, ClipEffect::Grayscale, ClipEffect::BoxBlur],
            4.0,
        );
        assert_eq!(chain.as_deref(), Some("negate,hue=s=0,boxblur=2:1"));
        assert_eq!(clip_filter_chain(&[], 4.0), None);
    }
}
