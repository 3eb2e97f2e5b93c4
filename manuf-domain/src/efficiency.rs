/// Actual material quantity required for `runs` runs across `copies` copies at
/// the given material-efficiency level.
///
/// Materials with a per-run quantity of 1 are indivisible and never benefit
/// from ME; everything else is reduced per copy and rounded up per run batch.
pub fn calc_material(quantity: u64, copies: u32, runs: u32, material_efficiency: u8) -> u64 {
    if quantity == 1 {
        return quantity * runs as u64 * copies as u64;
    }

    let reduced = quantity as f64 * runs as f64 * (1.0 - material_efficiency as f64 / 100.0);
    reduced.ceil() as u64 * copies as u64
}

/// Actual duration in seconds for `runs` runs at the given time-efficiency level.
pub fn calc_time(base_seconds: u64, runs: u32, time_efficiency: u8) -> u64 {
    (base_seconds as f64 * runs as f64 * (1.0 - time_efficiency as f64 / 100.0)).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_unit_materials_ignore_material_efficiency() {
        for me in 0..=10 {
            assert_eq!(calc_material(1, 3, 7, me), 21);
        }
    }

    #[test]
    fn material_reduction_rounds_up_before_multiplying_copies() {
        // 5 per run, 10 runs, ME 10: ceil(50 * 0.9) = 45
        assert_eq!(calc_material(5, 1, 10, 10), 45);
        // rounding happens on the per-copy batch: ceil(3 * 0.9) = 3, times 4 copies
        assert_eq!(calc_material(3, 4, 1, 10), 12);
    }

    #[test]
    fn calc_material_is_monotone_in_me_runs_and_copies() {
        for me in 0..10 {
            assert!(calc_material(7, 2, 5, me) >= calc_material(7, 2, 5, me + 1));
        }
        for runs in 1..20 {
            assert!(calc_material(7, 2, runs + 1, 5) >= calc_material(7, 2, runs, 5));
        }
        for copies in 1..20 {
            assert!(calc_material(7, copies + 1, 5, 5) >= calc_material(7, copies, 5, 5));
        }
    }

    #[test]
    fn calc_time_applies_te_and_rounds_up() {
        assert_eq!(calc_time(100, 1, 0), 100);
        assert_eq!(calc_time(100, 1, 20), 80);
        assert_eq!(calc_time(33, 3, 10), 90); // ceil(99 * 0.9) = ceil(89.1)
    }
}
