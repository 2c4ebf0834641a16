#[cfg(test)]
mod tests {
    use crate::Thermodynamics::R;
    use crate::Thermodynamics::activity::Nrtl;
    use crate::Thermodynamics::cubic::CubicPhase;
    use crate::Thermodynamics::phase_model_api::{ModelDomainError, PhaseModel, PhaseModelEnum};
    use crate::Thermodynamics::phase_state::PhaseKind;
    use crate::Thermodynamics::test_compounds::*;
    use crate::Thermodynamics::thermo_model::ThermoModel;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use std::f64::consts::LN_10;

    fn antoine_mmhg(a: f64, b: f64, c: f64, T: f64) -> f64 {
        133.322_368_421 * 10f64.powf(a - b / (T + c))
    }

    #[test]
    fn test_raoult_liquid_and_ideal_gas() {
        let models = ThermoModel::Ideal.build(mixture(vec![benzene(), toluene()])).unwrap();
        let (T, P) = (360.0, 101325.0);
        let x = [0.4, 0.6];
        let ln_phi_l = models.liquid.ln_fugacity_coefficients(T, P, &x).unwrap();
        let ln_phi_v = models.vapor.ln_fugacity_coefficients(T, P, &x).unwrap();
        let psat_b = antoine_mmhg(6.90565, 1211.033, -52.36, T);
        let psat_t = antoine_mmhg(6.95464, 1344.8, -53.668, T);
        assert_relative_eq!(ln_phi_l[0], (psat_b / P).ln(), max_relative = 1e-12);
        assert_relative_eq!(ln_phi_l[1], (psat_t / P).ln(), max_relative = 1e-12);
        assert_eq!(ln_phi_v, vec![0.0, 0.0]);
        assert_relative_eq!(models.vapor.molar_volume(T, P, &x).unwrap(), R * T / P);
        let phi = models.liquid.fugacity_coefficients_map(T, P, &x).unwrap();
        assert_relative_eq!(phi["benzene"], psat_b / P, max_relative = 1e-12);
        assert_eq!(models.liquid.kind(), PhaseKind::Liquid);
        assert!(models.solids.is_empty());
    }

    #[test]
    fn test_heat_of_vaporization_from_clausius_clapeyron() {
        let models = ThermoModel::Ideal.build(mixture(vec![benzene(), toluene()])).unwrap();
        let (T, P) = (350.0, 101325.0);
        let x = [1.0, 0.0];
        let dH = models.vapor.molar_enthalpy(T, P, &x).unwrap()
            - models.liquid.molar_enthalpy(T, P, &x).unwrap();
        let dlnP = LN_10 * 1211.033 / (T - 52.36_f64).powi(2);
        assert_relative_eq!(dH, R * T * T * dlnP, max_relative = 1e-9);
        println!("benzene ΔHvap at {} K = {} J/mol", T, dH);
        assert!(dH > 25_000.0 && dH < 40_000.0);
    }

    /// `G_L - G_V = RT Σ x ln φ_L` when the vapor is ideal
    #[test]
    fn test_gamma_phi_gibbs_is_consistent_with_fugacity() {
        let nrtl = Nrtl::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 0.6, 0.9, 0.0]),
            DMatrix::from_row_slice(2, 2, &[0.0, -40.0, 25.0, 0.0]),
            DMatrix::from_row_slice(2, 2, &[0.0, 0.3, 0.3, 0.0]),
        );
        for model in [
            ThermoModel::Ideal,
            ThermoModel::GammaPhi {
                activity: nrtl.into(),
                poynting: false,
            },
        ] {
            let models = model.build(mixture(vec![benzene(), toluene()])).unwrap();
            let (T, P) = (355.0, 90_000.0);
            let x = [0.35, 0.65];
            let gl = models.liquid.molar_gibbs(T, P, &x).unwrap();
            let gv = models.vapor.molar_gibbs(T, P, &x).unwrap();
            let ln_phi = models.liquid.ln_fugacity_coefficients(T, P, &x).unwrap();
            let rhs: f64 = R * T * x.iter().zip(&ln_phi).map(|(xi, l)| xi * l).sum::<f64>();
            assert_relative_eq!(gl - gv, rhs, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_poynting_correction_raises_liquid_fugacity_at_high_pressure() {
        let plain = ThermoModel::Ideal.build(mixture(vec![benzene(), toluene()])).unwrap();
        let corrected = ThermoModel::GammaPhi {
            activity: crate::Thermodynamics::activity::IdealSolution.into(),
            poynting: true,
        }
        .build(mixture(vec![benzene(), toluene()]))
        .unwrap();
        let x = [0.5, 0.5];
        let a = plain.liquid.ln_fugacity_coefficients(330.0, 5e6, &x).unwrap();
        let b = corrected.liquid.ln_fugacity_coefficients(330.0, 5e6, &x).unwrap();
        assert!(b[0] > a[0] && b[1] > a[1]);
        // V ≈ 9e-5 m³/mol, ΔP ≈ 5 MPa: the correction is of order 0.15
        assert!(b[0] - a[0] < 0.3);
    }

    fn pr_models() -> (PhaseModelEnum, PhaseModelEnum) {
        let models = ThermoModel::PengRobinson { kij: None }
            .build(mixture(vec![propane(), n_butane()]))
            .unwrap();
        (models.vapor, models.liquid)
    }

    #[test]
    fn test_peng_robinson_departure_functions_are_consistent() {
        let mix = mixture(vec![propane(), n_butane()]);
        let x = [0.3, 0.7];
        for (kind, T, P) in [
            (PhaseKind::Vapor, 350.0, 5e5),
            (PhaseKind::Liquid, 300.0, 2e6),
        ] {
            let phase = CubicPhase::new(mix.clone(), kind, None).unwrap();
            let ln_phi = phase.ln_fugacity_coefficients(T, P, &x).unwrap();
            let g_dep: f64 = R * T * x.iter().zip(&ln_phi).map(|(xi, l)| xi * l).sum::<f64>();
            let h_dep = phase.enthalpy_departure(T, P, &x).unwrap();
            let s_dep = phase.entropy_departure(T, P, &x).unwrap();
            assert_relative_eq!(g_dep, h_dep - T * s_dep, max_relative = 1e-8);
            // H_dep = -R T² ∂(Σ x ln φ)/∂T
            let sum_ln_phi = |t: f64| -> f64 {
                let l = phase.ln_fugacity_coefficients(t, P, &x).unwrap();
                x.iter().zip(&l).map(|(xi, li)| xi * li).sum()
            };
            let h = 1e-3;
            let numeric = -R * T * T * (sum_ln_phi(T + h) - sum_ln_phi(T - h)) / (2.0 * h);
            assert_relative_eq!(h_dep, numeric, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_peng_robinson_root_selection() {
        let (vapor, liquid) = pr_models();
        let x = [0.0, 1.0];
        let (T, P) = (300.0, 3e5);
        let v_l = liquid.molar_volume(T, P, &x).unwrap();
        let v_v = vapor.molar_volume(T, P, &x).unwrap();
        println!("n-butane at 300 K, 3 bar: V_L = {}, V_V = {}", v_l, v_v);
        assert!(v_l < 2e-4);
        assert!(v_v >= v_l);
        // nearly ideal gas at low pressure
        let ln_phi = vapor.ln_fugacity_coefficients(400.0, 1e3, &[0.5, 0.5]).unwrap();
        assert!(ln_phi.iter().all(|l| l.abs() < 1e-3));
    }

    #[test]
    fn test_kij_shape_is_validated() {
        let err = ThermoModel::PengRobinson {
            kij: Some(DMatrix::zeros(3, 3)),
        }
        .build(mixture(vec![propane(), n_butane()]))
        .unwrap_err();
        assert!(matches!(err, ModelDomainError::ParameterShape { .. }));
        let err = ThermoModel::GammaPhi {
            activity: Nrtl::new(DMatrix::zeros(3, 3), DMatrix::zeros(0, 0), DMatrix::zeros(3, 3)).into(),
            poynting: false,
        }
        .build(mixture(vec![benzene(), toluene()]))
        .unwrap_err();
        assert!(matches!(err, ModelDomainError::ParameterShape { .. }));
    }

    #[test]
    fn test_pure_solid_model() {
        let models = ThermoModel::Ideal.build(mixture(vec![water(), benzene()])).unwrap();
        assert_eq!(models.solids.len(), 1);
        let ice = &models.solids[0];
        assert_eq!(ice.index(), 0);
        let (T, P) = (263.15, 101325.0);
        let x = [1.0, 0.0];
        let ln_phi_s = ice.ln_fugacity_coefficients(T, P, &x).unwrap();
        let ln_phi_l = models.liquid.ln_fugacity_coefficients(T, P, &x).unwrap();
        let shift = -6010.0 / R * (1.0 / T - 1.0 / 273.15);
        assert_relative_eq!(ln_phi_s[0], ln_phi_l[0] + shift, max_relative = 1e-12);
        assert!(ln_phi_s[0] < ln_phi_l[0]);
        assert!(ln_phi_s[1].is_infinite());
        let dH = models.liquid.molar_enthalpy(T, P, &x).unwrap() - ice.molar_enthalpy(T, P, &x).unwrap();
        assert_relative_eq!(dH, 6010.0, max_relative = 1e-10);
        let dS = models.liquid.molar_entropy(T, P, &x).unwrap() - ice.molar_entropy(T, P, &x).unwrap();
        assert_relative_eq!(dS, 6010.0 / 273.15, max_relative = 1e-10);
        assert_relative_eq!(ice.molar_volume(T, P, &x).unwrap(), 1.0 / 50_900.0);
    }

    #[test]
    fn test_identify_phase() {
        assert_eq!(water().identify_phase(250.0, 101325.0), Some(PhaseKind::Solid));
        assert_eq!(benzene().identify_phase(300.0, 101325.0), Some(PhaseKind::Liquid));
        assert_eq!(benzene().identify_phase(400.0, 101325.0), Some(PhaseKind::Vapor));
        assert_eq!(propane().identify_phase(400.0, 101325.0), Some(PhaseKind::Vapor));
        assert_eq!(propane().identify_phase(300.0, 101325.0), None);
    }

    #[test]
    fn test_domain_errors() {
        let models = ThermoModel::Ideal.build(mixture(vec![benzene(), toluene()])).unwrap();
        assert_eq!(
            models.liquid.ln_fugacity_coefficients(-1.0, 1e5, &[0.5, 0.5]),
            Err(ModelDomainError::InvalidTemperature(-1.0))
        );
        assert_eq!(
            models.vapor.molar_volume(300.0, 1e5, &[1.0]),
            Err(ModelDomainError::CompositionLength { expected: 2, got: 1 })
        );
        assert!(matches!(
            models.vapor.molar_volume(300.0, 1e5, &[1.2, -0.2]),
            Err(ModelDomainError::InvalidComposition(_))
        ));
        assert!(matches!(
            models.liquid.ln_fugacity_coefficients(580.0, 1e5, &[0.5, 0.5]),
            Err(ModelDomainError::Supercritical { .. })
        ));
        // toluene alone is still subcritical at 580 K
        assert!(models.liquid.ln_fugacity_coefficients(580.0, 1e5, &[0.0, 1.0]).is_ok());
        // no critical constants, no cubic
        let mut no_pc = propane();
        no_pc.constants.Pc = None;
        let err = ThermoModel::PengRobinson { kij: None }
            .build(mixture(vec![no_pc, n_butane()]))
            .unwrap_err();
        assert_eq!(
            err,
            ModelDomainError::MissingConstant {
                compound: "propane".to_string(),
                constant: "Pc".to_string()
            }
        );
        // propane has no vapor pressure correlation for a Raoult liquid
        let models = ThermoModel::Ideal.build(mixture(vec![propane(), n_butane()])).unwrap();
        assert!(matches!(
            models.liquid.ln_fugacity_coefficients(300.0, 1e5, &[0.5, 0.5]),
            Err(ModelDomainError::MissingCorrelation { .. })
        ));
    }
}
