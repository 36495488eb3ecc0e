//! Si5351 Frequency Calculation
//!
//! Provides fractional-N PLL and multisynth divider calculations with
//! centihertz resolution. This module is testable on the host.
//!
//! # Theory of Operation
//!
//! The Si5351 uses a two-stage frequency synthesis:
//! 1. PLL stage: FVCO = FXTAL × (a + b/c) where 15 ≤ a ≤ 90
//! 2. Multisynth stage: FOUT = FVCO / (d + e/f) / R where 4 ≤ d ≤ 1800
//!
//! The multisynth is kept at an integer divisor (lowest jitter) and all
//! fine tuning happens in the PLL fraction. Keeping the divisor fixed also
//! means weak-signal tone steps only touch the PLL registers.

/// PLL parameters for frequency calculation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllParams {
    /// Integer part (15-90)
    pub a: u32,
    /// Numerator (0 to c-1)
    pub b: u32,
    /// Denominator (1-1048575)
    pub c: u32,
}

impl PllParams {
    /// Minimum PLL multiplier
    pub const MIN_A: u32 = 15;
    /// Maximum PLL multiplier
    pub const MAX_A: u32 = 90;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;

    /// Create integer PLL params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self { a, b: 0, c: 1 }
    }

    /// Create fractional PLL params
    #[must_use]
    pub const fn fractional(a: u32, b: u32, c: u32) -> Self {
        Self { a, b, c }
    }

    /// Calculate the VCO frequency given the reference frequency
    ///
    /// Works in whatever unit the reference is given in.
    #[must_use]
    pub fn vco_frequency(&self, xtal: u64) -> u64 {
        // FVCO = FXTAL × (a × c + b) / c
        (xtal * (u64::from(self.a) * u64::from(self.c) + u64::from(self.b))) / u64::from(self.c)
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.a >= Self::MIN_A
            && self.a <= Self::MAX_A
            && self.c >= 1
            && self.c <= Self::MAX_C
            && self.b < self.c
    }

    /// Calculate P1, P2, P3 register values for Si5351
    #[must_use]
    pub fn to_registers(&self) -> (u32, u32, u32) {
        encode_p(self.a, self.b, self.c)
    }
}

/// Multisynth divider parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsParams {
    /// Integer part (4, 6-1800)
    pub a: u32,
    /// Numerator
    pub b: u32,
    /// Denominator
    pub c: u32,
    /// R divider power of 2 (0-7 for 1, 2, 4, 8, 16, 32, 64, 128)
    pub r_div: u8,
}

impl MsParams {
    /// Minimum integer divisor
    pub const MIN_A: u32 = 4;
    /// Maximum integer divisor
    pub const MAX_A: u32 = 1800;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;

    /// Create integer multisynth params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self::integer_with_r(a, 0)
    }

    /// Create integer multisynth with R divider
    #[must_use]
    pub const fn integer_with_r(a: u32, r_div: u8) -> Self {
        Self {
            a,
            b: 0,
            c: 1,
            r_div,
        }
    }

    /// Calculate output frequency given VCO frequency (same unit in and out)
    #[must_use]
    pub fn output_frequency(&self, vco: u64) -> u64 {
        // FOUT = FVCO × c / (a × c + b) / R
        let divisor = u64::from(self.a) * u64::from(self.c) + u64::from(self.b);
        let r = 1u64 << self.r_div;
        (vco * u64::from(self.c)) / divisor / r
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        // Note: a=5 is not allowed
        let a_valid = self.a == 4 || (self.a >= 6 && self.a <= Self::MAX_A);
        let c_valid = self.c >= 1 && self.c <= Self::MAX_C;
        let b_valid = self.b < self.c;
        let r_valid = self.r_div <= 7;
        a_valid && c_valid && b_valid && r_valid
    }

    /// Calculate P1, P2, P3 register values
    #[must_use]
    pub fn to_registers(&self) -> (u32, u32, u32) {
        encode_p(self.a, self.b, self.c)
    }
}

/// P1 = 128 × a + floor(128 × b/c) - 512, P2 = 128 × b - c × floor(128 × b/c), P3 = c
fn encode_p(a: u32, b: u32, c: u32) -> (u32, u32, u32) {
    let floor_128b_c = ((128 * u64::from(b)) / u64::from(c)) as u32;
    let p1 = 128 * a + floor_128b_c - 512;
    let p2 = ((128 * u64::from(b)) - u64::from(c) * u64::from(floor_128b_c)) as u32;
    (p1, p2, c)
}

/// Result of a frequency plan search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrequencyPlan {
    /// PLL setting
    pub pll: PllParams,
    /// Multisynth setting
    pub ms: MsParams,
    /// Frequency actually produced, in centihertz
    pub actual_centihz: u64,
    /// Actual minus requested, in centihertz
    pub error_centihz: i64,
}

/// Minimum VCO frequency (600 MHz)
pub const VCO_MIN_HZ: u64 = 600_000_000;
/// Maximum VCO frequency (900 MHz)
pub const VCO_MAX_HZ: u64 = 900_000_000;

/// Default crystal frequency (25 MHz)
pub const DEFAULT_XTAL_HZ: u64 = 25_000_000;

const VCO_MIN_CENTIHZ: u64 = VCO_MIN_HZ * 100;
const VCO_MAX_CENTIHZ: u64 = VCO_MAX_HZ * 100;

/// Calculate frequency synthesis parameters for a target frequency
///
/// Returns `None` if the target cannot be synthesized.
#[must_use]
pub fn calculate_frequency(xtal_hz: u64, target_centihz: u64) -> Option<FrequencyPlan> {
    if target_centihz == 0 || xtal_hz == 0 {
        return None;
    }

    // Try increasing R divider values until the divisor fits
    for r_div in 0u8..=7 {
        let effective_target = target_centihz << r_div;
        let ms_min = (VCO_MIN_CENTIHZ / effective_target).max(u64::from(MsParams::MIN_A));
        let ms_max = (VCO_MAX_CENTIHZ / effective_target).min(u64::from(MsParams::MAX_A));

        if ms_min > u64::from(MsParams::MAX_A) {
            continue;
        }

        let mut best: Option<FrequencyPlan> = None;
        for ms_a in ms_min..=ms_max {
            if ms_a == 5 {
                continue;
            }
            let vco_required = effective_target * ms_a;
            if !(VCO_MIN_CENTIHZ..=VCO_MAX_CENTIHZ).contains(&vco_required) {
                continue;
            }

            let Some(pll) = calculate_pll_params(xtal_hz, vco_required) else {
                continue;
            };
            let ms = MsParams::integer_with_r(ms_a as u32, r_div);
            let actual = ms.output_frequency(pll.vco_frequency(xtal_hz * 100));
            let error = actual as i64 - target_centihz as i64;

            let should_update = match &best {
                None => true,
                Some(plan) => error.abs() < plan.error_centihz.abs(),
            };
            if should_update {
                best = Some(FrequencyPlan {
                    pll,
                    ms,
                    actual_centihz: actual,
                    error_centihz: error,
                });
                // Within a centihertz: keep the lowest divisor so nearby
                // tones share the same multisynth setting
                if error.abs() <= 1 {
                    break;
                }
            }
        }
        if best.is_some() {
            return best;
        }
    }

    None
}

/// Calculate PLL parameters to achieve a VCO frequency given in centihertz
fn calculate_pll_params(xtal_hz: u64, target_vco_centihz: u64) -> Option<PllParams> {
    let xtal = xtal_hz * 100;
    let a = target_vco_centihz / xtal;

    if a < u64::from(PllParams::MIN_A) || a > u64::from(PllParams::MAX_A) {
        return None;
    }

    let remainder = target_vco_centihz - a * xtal;
    if remainder == 0 {
        return Some(PllParams::integer(a as u32));
    }

    let (b, c) = rational_approximation(remainder, xtal, PllParams::MAX_C);
    if b >= c {
        // Fraction rounded up to one
        return PllParams::integer(a as u32 + 1)
            .is_valid()
            .then(|| PllParams::integer(a as u32 + 1));
    }

    Some(PllParams::fractional(a as u32, b, c))
}

/// Find the best rational approximation b/c ≈ num/den with c ≤ `max_c`
///
/// Walks the continued fraction expansion of `num/den` and, when the next
/// convergent's denominator would exceed `max_c`, tries the best
/// semiconvergent as well.
fn rational_approximation(num: u64, den: u64, max_c: u32) -> (u32, u32) {
    if num == 0 || den == 0 {
        return (0, 1);
    }

    let max_c = u64::from(max_c);
    let (mut h0, mut h1) = (0u64, 1u64);
    let (mut k0, mut k1) = (1u64, 0u64);
    let (mut n, mut d) = (num, den);

    while d != 0 {
        let q = n / d;
        let k2 = q.saturating_mul(k1).saturating_add(k0);
        if k2 > max_c {
            // k1 > 0 here: the first step always yields k = 1
            let t = (max_c - k0) / k1;
            let (hs, ks) = (t * h1 + h0, t * k1 + k0);
            if t > 0 && closer(num, den, (hs, ks), (h1, k1)) {
                h1 = hs;
                k1 = ks;
            }
            break;
        }
        let h2 = q.saturating_mul(h1).saturating_add(h0);
        h0 = h1;
        h1 = h2;
        k0 = k1;
        k1 = k2;
        let r = n - q * d;
        n = d;
        d = r;
    }

    (h1 as u32, k1 as u32)
}

/// Check if `a` approximates `num/den` strictly better than `b`
fn closer(num: u64, den: u64, a: (u64, u64), b: (u64, u64)) -> bool {
    let err = |(p, q): (u64, u64)| {
        let diff = (i128::from(p) * i128::from(den) - i128::from(num) * i128::from(q)).unsigned_abs();
        (diff, u128::from(q))
    };
    let (ea, qa) = err(a);
    let (eb, qb) = err(b);
    // ea/qa < eb/qb
    ea * qb < eb * qa
}
