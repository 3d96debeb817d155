//! Flags freezing parameter groups during the fit.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bit set selecting which parameter groups stay at their seed values.
///
/// Frozen groups are implemented by zeroing their Jacobian columns, so the
/// optimizer simply never moves them. The shared camera height is always
/// free; freezing the rotation does not freeze it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FitFlags(u32);

impl FitFlags {
    pub const NONE: Self = Self(0);
    /// Keep `fy / fx` at the seed ratio.
    pub const FIX_ASPECT_RATIO: Self = Self(1);
    /// Keep the principal point at the seed location.
    pub const FIX_PRINCIPAL_POINT: Self = Self(2);
    /// Keep all five distortion coefficients at the seed values.
    pub const FIX_DISTORTION: Self = Self(4);
    /// Keep the rotation vector at the seed value.
    pub const FIX_ROTATION: Self = Self(8);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for FitFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FitFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_contains() {
        let f = FitFlags::FIX_ASPECT_RATIO | FitFlags::FIX_ROTATION;
        assert!(f.contains(FitFlags::FIX_ASPECT_RATIO));
        assert!(f.contains(FitFlags::FIX_ROTATION));
        assert!(!f.contains(FitFlags::FIX_DISTORTION));
        assert!(FitFlags::NONE.is_empty());
    }
}
