#[cfg(test)]
mod tests {
    use crate::Flash::flash_api::{FlashError, FlashResult, FlashSpec};
    use crate::Flash::flash_solver::FlashSolver;
    use crate::Flash::model_cache::ModelCache;
    use crate::Flash::stability::StabilityTester;
    use crate::Thermodynamics::activity::{ActivityModel, Nrtl};
    use crate::Thermodynamics::phase_model_api::PhaseModel;
    use crate::Thermodynamics::phase_state::{PhaseKind, PhaseState};
    use crate::Thermodynamics::test_compounds::*;
    use crate::Thermodynamics::thermo_model::ThermoModel;
    use crate::settings::FlashSettings;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use std::sync::Arc;
    use std::thread;

    fn antoine_mmhg(a: f64, b: f64, c: f64, T: f64) -> f64 {
        133.322_368_421 * 10f64.powf(a - b / (T + c))
    }

    fn psat_benzene(T: f64) -> f64 {
        antoine_mmhg(6.90565, 1211.033, -52.36, T)
    }

    fn psat_toluene(T: f64) -> f64 {
        antoine_mmhg(6.95464, 1344.8, -53.668, T)
    }

    fn ideal_solver() -> FlashSolver {
        FlashSolver::new(
            mixture(vec![benzene(), toluene()]),
            ThermoModel::Ideal,
            FlashSettings::default(),
        )
        .unwrap()
    }

    fn nrtl_model() -> ThermoModel {
        ThermoModel::GammaPhi {
            activity: ActivityModel::NRTL(Nrtl::new(
                DMatrix::from_row_slice(2, 2, &[0.0, 3.0, 3.0, 0.0]),
                DMatrix::zeros(2, 2),
                DMatrix::from_element(2, 2, 0.2),
            )),
            poynting: false,
        }
    }

    fn lle_solver() -> FlashSolver {
        let (a, b) = lle_pair();
        FlashSolver::new(mixture(vec![a, b]), nrtl_model(), FlashSettings::default()).unwrap()
    }

    fn pr_solver() -> FlashSolver {
        FlashSolver::new(
            mixture(vec![propane(), n_butane()]),
            ThermoModel::PengRobinson { kij: None },
            FlashSettings::default(),
        )
        .unwrap()
    }

    fn assert_equal_fugacities(r: &FlashResult, tol: f64) {
        let reference = r.phases[0].ln_fugacities();
        for p in &r.phases[1..] {
            for (a, b) in reference.iter().zip(p.ln_fugacities()) {
                assert!((a - b).abs() < tol, "ln f {} vs {}", a, b);
            }
        }
    }

    fn assert_consistent(r: &FlashResult) {
        let total: f64 = r.phases.iter().map(|p| p.fraction).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        assert!(r.mass_balance_error() < 1e-9, "mass balance {}", r.mass_balance_error());
        for p in &r.phases {
            assert!((0.0..=1.0).contains(&p.fraction));
            assert_relative_eq!(p.composition().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_raoult_two_phase_matches_closed_form() {
        let solver = ideal_solver();
        let (T, P) = (368.0, 101325.0);
        let z = [0.5, 0.5];
        let r = solver.flash_tp(T, P, &z).unwrap();
        r.pretty_print();
        assert_eq!(r.phase_count(), 2);
        assert_eq!(r.phases[0].kind(), PhaseKind::Vapor);
        assert_eq!(r.phases[1].kind(), PhaseKind::Liquid);
        assert_consistent(&r);
        assert_equal_fugacities(&r, 1e-9);

        let (K1, K2) = (psat_benzene(T) / P, psat_toluene(T) / P);
        let x1 = (1.0 - K2) / (K1 - K2);
        let y1 = K1 * x1;
        let beta = (z[0] - x1) / (y1 - x1);
        assert_relative_eq!(r.vapor_fraction(), beta, max_relative = 1e-9);
        assert_relative_eq!(r.phases[1].composition()[0], x1, max_relative = 1e-9);
        assert_relative_eq!(r.phases[0].composition()[0], y1, max_relative = 1e-9);
    }

    #[test]
    fn test_single_phase_outside_the_envelope() {
        let solver = ideal_solver();
        let liquid = solver.flash_tp(330.0, 101325.0, &[0.5, 0.5]).unwrap();
        assert_eq!(liquid.phase_count(), 1);
        assert_eq!(liquid.phases[0].kind(), PhaseKind::Liquid);
        let vapor = solver.flash_tp(400.0, 101325.0, &[0.5, 0.5]).unwrap();
        assert_eq!(vapor.phase_count(), 1);
        assert_eq!(vapor.phases[0].kind(), PhaseKind::Vapor);
        assert_eq!(vapor.phases[0].composition(), &[0.5, 0.5]);
    }

    #[test]
    fn test_nrtl_liquid_liquid_split() {
        let solver = lle_solver();
        let r = solver.flash_tp(350.0, 101325.0, &[0.5, 0.5]).unwrap();
        r.pretty_print();
        assert_eq!(r.phase_count(), 2);
        assert!(r.phases.iter().all(|p| p.kind() == PhaseKind::Liquid));
        assert_consistent(&r);
        assert_equal_fugacities(&r, 1e-6);
        let mut rich: Vec<f64> = r.phases.iter().map(|p| p.composition()[0]).collect();
        rich.sort_by(f64::total_cmp);
        assert_relative_eq!(rich[0], 0.010887872249336053, max_relative = 1e-5);
        assert_relative_eq!(rich[1], 0.9891121277506639, max_relative = 1e-7);
        for p in &r.phases {
            assert_relative_eq!(p.fraction, 0.5, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_feed_on_the_tie_line_gives_the_same_phases() {
        let solver = lle_solver();
        let first = solver.flash_tp(350.0, 101325.0, &[0.5, 0.5]).unwrap();
        let (xa, xb) = (first.phases[0].composition(), first.phases[1].composition());
        let z: Vec<f64> = xa.iter().zip(xb).map(|(a, b)| 0.25 * a + 0.75 * b).collect();
        let second = solver.flash_tp(350.0, 101325.0, &z).unwrap();
        assert_eq!(second.phase_count(), 2);
        for p in &second.phases {
            let same = first
                .phases
                .iter()
                .find(|q| (q.composition()[0] - p.composition()[0]).abs() < 1e-3)
                .unwrap();
            assert_relative_eq!(p.composition()[0], same.composition()[0], epsilon = 1e-6);
            let expected = if std::ptr::eq(same, &first.phases[0]) { 0.25 } else { 0.75 };
            assert_relative_eq!(p.fraction, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_stability_tester_finds_the_miscibility_gap() {
        let solver = lle_solver();
        let tester = StabilityTester::new(solver.models(), &solver.settings().stability);
        let feed = PhaseState::new(PhaseKind::Liquid, 350.0, 101325.0, vec![0.5, 0.5], solver.mixture().names());
        let report = tester.analyze(&feed, &[]).unwrap();
        assert!(!report.stable);
        assert_eq!(report.trials_run, 6);
        let best = &report.stationary_points[0];
        println!("most negative stationary point: {:?}", best);
        assert_eq!(best.kind, PhaseKind::Liquid);
        assert!(best.tpd < -0.4 && best.tpd > -0.5);
        let split = tester.find_split(&feed).unwrap().unwrap();
        assert!(split.len() >= 2);

        // one of the two liquids is stable on its own
        let rich = PhaseState::new(
            PhaseKind::Liquid,
            350.0,
            101325.0,
            vec![0.9891121277506639, 0.010887872249336053],
            solver.mixture().names(),
        );
        assert!(tester.is_stable(&rich).unwrap());
    }

    #[test]
    fn test_peng_robinson_vle() {
        let solver = pr_solver();
        let r = solver.flash_tp(300.0, 5.0e5, &[0.5, 0.5]).unwrap();
        r.pretty_print();
        assert_eq!(r.phase_count(), 2);
        assert_consistent(&r);
        assert_equal_fugacities(&r, 1e-7);
        assert_relative_eq!(r.vapor_fraction(), 0.5123037, max_relative = 1e-3);
        let liquid = r.phases_of(PhaseKind::Liquid).next().unwrap();
        let vapor = r.phases_of(PhaseKind::Vapor).next().unwrap();
        assert_relative_eq!(liquid.composition()[0], 0.35301, max_relative = 1e-3);
        assert_relative_eq!(vapor.composition()[0], 0.63993, max_relative = 1e-3);
        assert!(vapor.V > liquid.V);
    }

    #[test]
    fn test_ph_and_ps_recover_the_tp_temperature() {
        let solver = ideal_solver();
        let (T, P) = (368.0, 101325.0);
        let z = [0.5, 0.5];
        let tp = solver.flash_tp(T, P, &z).unwrap();

        let ph = solver.flash(FlashSpec::PH { P, H: tp.H }, &z).unwrap();
        assert_relative_eq!(ph.T, T, epsilon = 1e-4);
        assert_relative_eq!(ph.vapor_fraction(), tp.vapor_fraction(), epsilon = 1e-5);
        assert!(ph.convergence.outer_iterations > 0);

        let ps = solver.flash(FlashSpec::PS { P, S: tp.S }, &z).unwrap();
        assert_relative_eq!(ps.T, T, epsilon = 1e-4);
        assert_eq!(ps.spec, FlashSpec::PS { P, S: tp.S });
    }

    #[test]
    fn test_tv_recovers_the_tp_pressure() {
        let solver = pr_solver();
        let z = [0.5, 0.5];
        let tp = solver.flash_tp(300.0, 1.5e5, &z).unwrap();
        assert_eq!(tp.phase_count(), 1);
        let tv = solver.flash(FlashSpec::TV { T: 300.0, V: tp.V }, &z).unwrap();
        assert_relative_eq!(tv.P, 1.5e5, max_relative = 1e-6);
    }

    #[test]
    fn test_th_and_ts_recover_the_tp_pressure() {
        let solver = ideal_solver();
        let (T, P) = (368.0, 101325.0);
        let z = [0.5, 0.5];
        let tp = solver.flash_tp(T, P, &z).unwrap();
        println!("TP vapor fraction {}", tp.vapor_fraction());

        let th = solver.flash(FlashSpec::TH { T, H: tp.H }, &z).unwrap();
        assert_relative_eq!(th.P, P, max_relative = 1e-6);
        assert_relative_eq!(th.vapor_fraction(), tp.vapor_fraction(), epsilon = 1e-6);
        assert_consistent(&th);

        let ts = solver.flash(FlashSpec::TS { T, S: tp.S }, &z).unwrap();
        assert_relative_eq!(ts.P, P, max_relative = 1e-6);
        assert_relative_eq!(ts.vapor_fraction(), tp.vapor_fraction(), epsilon = 1e-6);
        assert_eq!(ts.T, T);
    }

    #[test]
    fn test_pv_recovers_the_tp_temperature() {
        let solver = ideal_solver();
        let (T, P) = (368.0, 101325.0);
        let z = [0.5, 0.5];
        let tp = solver.flash_tp(T, P, &z).unwrap();
        let pv = solver.flash(FlashSpec::PV { P, V: tp.V }, &z).unwrap();
        assert_relative_eq!(pv.T, T, epsilon = 1e-4);
        assert_relative_eq!(pv.vapor_fraction(), tp.vapor_fraction(), epsilon = 1e-5);
        assert_eq!(pv.phase_count(), 2);
    }

    #[test]
    fn test_three_phase_vapor_liquid_liquid_split() {
        let (a, b) = lle_pair();
        let tau = DMatrix::from_row_slice(3, 3, &[0.0, 3.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let model = ThermoModel::GammaPhi {
            activity: ActivityModel::NRTL(Nrtl::new(tau, DMatrix::zeros(3, 3), DMatrix::from_element(3, 3, 0.2))),
            poynting: false,
        };
        let solver = FlashSolver::new(mixture(vec![a, b, light_solvent()]), model, FlashSettings::default()).unwrap();
        let z = [0.45, 0.45, 0.1];
        let r = solver.flash_tp(350.0, 62_000.0, &z).unwrap();
        r.pretty_print();
        assert_eq!(r.phase_count(), 3);
        assert_eq!(r.phases_of(PhaseKind::Vapor).count(), 1);
        assert_eq!(r.phases_of(PhaseKind::Liquid).count(), 2);
        assert!(!r.convergence.phase_limit_reached);
        assert_consistent(&r);
        assert_equal_fugacities(&r, 1e-7);

        assert_relative_eq!(r.vapor_fraction(), 0.42975291945812877, max_relative = 1e-5);
        let vapor = r.phases_of(PhaseKind::Vapor).next().unwrap();
        assert_relative_eq!(vapor.composition()[2], 0.12132773115989241, max_relative = 1e-5);
        let mut a_rich: Vec<f64> = r.phases_of(PhaseKind::Liquid).map(|p| p.composition()[0]).collect();
        a_rich.sort_by(f64::total_cmp);
        assert_relative_eq!(a_rich[0], 0.01878216933483259, max_relative = 1e-5);
        assert_relative_eq!(a_rich[1], 0.8972909593915107, max_relative = 1e-6);
    }

    #[test]
    fn test_pure_compound_ph_inside_the_two_phase_region() {
        let solver = FlashSolver::new(mixture(vec![benzene()]), ThermoModel::Ideal, FlashSettings::default()).unwrap();
        let P: f64 = 101325.0;
        let Tsat: f64 = 1211.033 / (6.90565 - (P / 133.322_368_421).log10()) + 52.36;
        let models = solver.models();
        let H_l = models.liquid.molar_enthalpy(Tsat, P, &[1.0]).unwrap();
        let H_v = models.vapor.molar_enthalpy(Tsat, P, &[1.0]).unwrap();
        let H = H_l + 0.3 * (H_v - H_l);
        let r = solver.flash(FlashSpec::PH { P, H }, &[1.0]).unwrap();
        r.pretty_print();
        assert_eq!(r.phase_count(), 2);
        assert_relative_eq!(r.T, Tsat, epsilon = 1e-4);
        assert_relative_eq!(r.vapor_fraction(), 0.3, epsilon = 1e-4);
        assert_relative_eq!(r.H, H, max_relative = 1e-6);
    }

    #[test]
    fn test_bubble_and_dew_points_of_an_ideal_mixture() {
        let solver = ideal_solver();
        let T = 368.0;
        let z = [0.4, 0.6];
        let (p1, p2) = (psat_benzene(T), psat_toluene(T));
        let bubble = solver.bubble_pressure(T, &z).unwrap();
        assert_relative_eq!(bubble, z[0] * p1 + z[1] * p2, max_relative = 1e-6);
        let dew = solver.dew_pressure(T, &z).unwrap();
        assert_relative_eq!(dew, 1.0 / (z[0] / p1 + z[1] / p2), max_relative = 1e-6);

        let r = solver.flash(FlashSpec::TVF { T, VF: 0.0 }, &z).unwrap();
        assert_eq!(r.phase_count(), 2);
        assert_eq!(r.vapor_fraction(), 0.0);
        let liquid = r.phases_of(PhaseKind::Liquid).next().unwrap();
        assert_relative_eq!(liquid.composition()[0], 0.4, max_relative = 1e-9);

        let P = 101325.0;
        let Tb = solver.bubble_temperature(P, &z).unwrap();
        assert_relative_eq!(z[0] * psat_benzene(Tb) + z[1] * psat_toluene(Tb), P, max_relative = 1e-6);
        let Td = solver.dew_temperature(P, &z).unwrap();
        assert!(Td > Tb);
        assert_relative_eq!(z[0] / psat_benzene(Td) + z[1] / psat_toluene(Td), 1.0 / P, max_relative = 1e-6);
    }

    #[test]
    fn test_vapor_fraction_flash_inside_the_envelope() {
        let solver = ideal_solver();
        let z = [0.5, 0.5];
        let r = solver.flash(FlashSpec::PVF { P: 101325.0, VF: 0.4 }, &z).unwrap();
        assert_relative_eq!(r.vapor_fraction(), 0.4, epsilon = 1e-12);
        let tp = solver.flash_tp(r.T, 101325.0, &z).unwrap();
        assert_relative_eq!(tp.vapor_fraction(), 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_phase_limit() {
        let settings = FlashSettings {
            max_phases: 1,
            ..FlashSettings::default()
        };
        let solver = FlashSolver::new(mixture(vec![benzene(), toluene()]), ThermoModel::Ideal, settings).unwrap();
        let r = solver.flash_tp(368.0, 101325.0, &[0.5, 0.5]).unwrap();
        assert_eq!(r.phase_count(), 1);
        assert!(r.convergence.phase_limit_reached);
    }

    #[test]
    fn test_supersaturated_solid_is_reported() {
        let solver = FlashSolver::new(mixture(vec![water()]), ThermoModel::Ideal, FlashSettings::default()).unwrap();
        let cold = solver.flash_tp(265.0, 101325.0, &[1.0]).unwrap();
        assert_eq!(cold.phases[0].kind(), PhaseKind::Liquid);
        assert_eq!(cold.convergence.supersaturated_solids, vec!["water".to_string()]);
        let warm = solver.flash_tp(300.0, 101325.0, &[1.0]).unwrap();
        assert!(warm.convergence.supersaturated_solids.is_empty());
    }

    #[test]
    fn test_invalid_requests() {
        let solver = ideal_solver();
        assert!(matches!(
            solver.flash_tp(368.0, 101325.0, &[0.5, 0.3, 0.2]),
            Err(FlashError::InvalidComposition(_))
        ));
        assert!(matches!(
            solver.flash_tp(-1.0, 101325.0, &[0.5, 0.5]),
            Err(FlashError::InvalidSpecification(_))
        ));
        assert!(matches!(
            solver.flash(FlashSpec::TVF { T: 368.0, VF: 2.0 }, &[0.5, 0.5]),
            Err(FlashError::InvalidSpecification(_))
        ));
    }

    #[test]
    fn test_flashes_are_deterministic() {
        let solver = lle_solver();
        let a = solver.flash_tp(350.0, 101325.0, &[0.3, 0.7]).unwrap();
        let b = solver.flash_tp(350.0, 101325.0, &[0.3, 0.7]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_reuses_solvers_and_results() {
        let cache = ModelCache::new();
        let mix = mixture(vec![benzene(), toluene()]);
        let first = cache
            .get_or_build(mix.clone(), ThermoModel::Ideal, FlashSettings::default())
            .unwrap();
        let second = cache
            .get_or_build(mix.clone(), ThermoModel::Ideal, FlashSettings::default())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        let spec = FlashSpec::TP { T: 368.0, P: 101325.0 };
        let r1 = cache.flash_cached(&first, spec, &[0.5, 0.5]).unwrap();
        let r2 = cache.flash_cached(&second, spec, &[0.5, 0.5]).unwrap();
        assert!(Arc::ptr_eq(&r1, &r2));
        assert_eq!(cache.cached_results(), 1);
        let r3 = cache.flash_cached(&first, spec, &[0.4, 0.6]).unwrap();
        assert!(!Arc::ptr_eq(&r1, &r3));

        cache.clear();
        assert!(cache.is_empty());
        let third = cache.get_or_build(mix, ThermoModel::Ideal, FlashSettings::default()).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_threads_share_one_solver() {
        let cache = Arc::new(ModelCache::new());
        let solver = cache
            .get_or_build(mixture(vec![benzene(), toluene()]), ThermoModel::Ideal, FlashSettings::default())
            .unwrap();
        let temperatures = [360.0, 364.0, 368.0, 372.0];
        let expected: Vec<FlashResult> = temperatures
            .iter()
            .map(|T| solver.flash_tp(*T, 101325.0, &[0.5, 0.5]).unwrap())
            .collect();
        let handles: Vec<_> = temperatures
            .iter()
            .map(|T| {
                let solver = solver.clone();
                let cache = cache.clone();
                let T = *T;
                thread::spawn(move || {
                    let spec = FlashSpec::TP { T, P: 101325.0 };
                    cache.flash_cached(&solver, spec, &[0.5, 0.5]).unwrap()
                })
            })
            .collect();
        for (h, e) in handles.into_iter().zip(&expected) {
            assert_eq!(*h.join().unwrap(), *e);
        }
        assert_eq!(cache.cached_results(), 4);
    }
}
