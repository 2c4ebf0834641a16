use super::flash_api::FlashResult;
use prettytable::{Cell, Row, Table, row};
use std::fmt;

impl FlashResult {
    /// One row per phase and a row for the mixture. Compositions get one column per
    /// compound.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        let mut header: Vec<Cell> = ["phase", "fraction"].iter().map(|h| Cell::new(h)).collect();
        header.extend(self.names.iter().map(|n| Cell::new(n)));
        header.extend(["H, J/mol", "S, J/(mol K)", "V, m3/mol"].iter().map(|h| Cell::new(h)));
        table.add_row(Row::new(header));

        let mut add = |label: String, fraction: f64, x: &[f64], H: f64, S: f64, V: f64| {
            let mut cells = vec![Cell::new(&label), Cell::new(&format!("{:.6}", fraction))];
            cells.extend(x.iter().map(|xi| Cell::new(&format!("{:.6}", xi))));
            cells.push(Cell::new(&format!("{:.2}", H)));
            cells.push(Cell::new(&format!("{:.4}", S)));
            cells.push(Cell::new(&format!("{:.4e}", V)));
            table.add_row(Row::new(cells));
        };
        for p in &self.phases {
            add(p.kind().to_string(), p.fraction, p.composition(), p.H, p.S, p.V);
        }
        add("overall".to_string(), 1.0, &self.z, self.H, self.S, self.V);
        table
    }

    pub fn convergence_table(&self) -> Table {
        let c = &self.convergence;
        let mut table = Table::new();
        table.add_row(row!["specification", self.spec.to_string()]);
        table.add_row(row!["T, K", format!("{:.4}", self.T)]);
        table.add_row(row!["P, Pa", format!("{:.2}", self.P)]);
        table.add_row(row!["inner iterations", c.inner_iterations]);
        table.add_row(row!["outer iterations", c.outer_iterations]);
        table.add_row(row!["residual", format!("{:.3e}", c.residual)]);
        table.add_row(row!["stage transitions", c.stage_transitions]);
        table.add_row(row!["inconclusive trials", c.stability_inconclusive.len()]);
        if c.phase_limit_reached {
            table.add_row(row!["phase limit", "reached"]);
        }
        if !c.supersaturated_solids.is_empty() {
            table.add_row(row!["supersaturated solids", c.supersaturated_solids.join(", ")]);
        }
        table
    }

    pub fn pretty_print(&self) {
        self.to_table().printstd();
        self.convergence_table().printstd();
    }
}

impl fmt::Display for FlashResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_table())?;
        write!(f, "{}", self.convergence_table())
    }
}

#[cfg(test)]
mod tests {
    use crate::Flash::flash_solver::FlashSolver;
    use crate::Thermodynamics::test_compounds::{benzene, mixture, toluene};
    use crate::Thermodynamics::thermo_model::ThermoModel;
    use crate::settings::FlashSettings;

    #[test]
    fn test_table_layout() {
        let solver = FlashSolver::new(
            mixture(vec![benzene(), toluene()]),
            ThermoModel::Ideal,
            FlashSettings::default(),
        )
        .unwrap();
        let result = solver.flash_tp(368.0, 101325.0, &[0.5, 0.5]).unwrap();
        let table = result.to_table();
        // header, two phases, overall
        assert_eq!(table.len(), 4);
        let text = result.to_string();
        assert!(text.contains("benzene"));
        assert!(text.contains("vapor"));
        assert!(text.contains("liquid"));
        assert!(text.contains("overall"));
        result.pretty_print();
    }
}
