use serde::{Deserialize, Serialize};

/// Where a seek should land.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeekTarget {
    /// Offset in seconds from the current position.
    Relative(f64),
    /// Absolute position in seconds on the media timeline.
    Absolute(f64),
    /// Fraction of the total duration in `[0, 1]`.
    Factor(f64),
    /// Step back to just before the current frame (always very exact).
    Backstep,
}

/// How precisely a seek must land. Ordered from loosest to strictest:
/// a coalesced request keeps the strictest precision seen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SeekPrecision {
    /// Land on a keyframe, wherever the demuxer puts us.
    Keyframe,
    /// Use the configured default (hr-seek option decides).
    Default,
    /// Decode from the prior keyframe and drop up to the exact target.
    Exact,
    /// Like exact, but with extra demuxer slack and framedrop disabled.
    VeryExact,
}

/// Modifier flags carried by a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeekFlags {
    /// Defer execution briefly so a frame from the previous target can be
    /// shown during continuous seeking.
    pub delay: bool,
    /// Keep buffered audio; used by loop seeks to stay gapless.
    pub no_flush: bool,
}

impl SeekFlags {
    pub const NONE: SeekFlags = SeekFlags {
        delay: false,
        no_flush: false,
    };

    /// OR-combination used when coalescing queued requests.
    pub fn union(self, other: SeekFlags) -> SeekFlags {
        SeekFlags {
            delay: self.delay || other.delay,
            no_flush: self.no_flush || other.no_flush,
        }
    }
}

/// A fully specified seek request, as queued and as executed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekRequest {
    pub target: SeekTarget,
    pub precision: SeekPrecision,
    pub flags: SeekFlags,
}

impl SeekRequest {
    pub fn new(target: SeekTarget, precision: SeekPrecision, flags: SeekFlags) -> Self {
        Self {
            target,
            precision,
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_orders_loosest_to_strictest() {
        assert!(SeekPrecision::Keyframe < SeekPrecision::Default);
        assert!(SeekPrecision::Default < SeekPrecision::Exact);
        assert!(SeekPrecision::Exact < SeekPrecision::VeryExact);
    }

    #[test]
    fn flags_union_is_bitwise_or() {
        let delay = SeekFlags {
            delay: true,
            no_flush: false,
        };
        let no_flush = SeekFlags {
            delay: false,
            no_flush: true,
        };
        let both = delay.union(no_flush);
        assert!(both.delay && both.no_flush);
        assert_eq!(SeekFlags::NONE.union(SeekFlags::NONE), SeekFlags::NONE);
    }
}
