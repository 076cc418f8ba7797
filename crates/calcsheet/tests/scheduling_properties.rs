//! Property tests over randomly generated acyclic worksheets

use calcsheet::{CalculationOptions, CalculationStats, Calculator, ScheduleStrategy, Worksheet};
use proptest::prelude::*;

/// Literals in column A, formulas in column B
///
/// A formula in `Bi` reads column A freely but only B cells below it, so
/// the sheet is acyclic and address order is never dependency order.
fn acyclic_sheet() -> impl Strategy<Value = Worksheet> {
    (1usize..8)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(-100i32..100, n),
                proptest::collection::vec(
                    proptest::collection::vec((any::<bool>(), 0..n), 0..4),
                    n,
                ),
            )
        })
        .prop_map(|(literals, picks)| {
            let mut sheet = Worksheet::new();
            for (i, value) in literals.iter().enumerate() {
                sheet
                    .set_cell_value(&format!("A{}", i + 1), f64::from(*value))
                    .unwrap();
            }
            for (i, refs) in picks.iter().enumerate() {
                let mut formula = format!("={}", i);
                for &(formula_ref, j) in refs {
                    if formula_ref && j > i {
                        formula.push_str(&format!(" + B{}", j + 1));
                    } else {
                        formula.push_str(&format!(" + A{}", j + 1));
                    }
                }
                sheet
                    .set_cell_formula(&format!("B{}", i + 1), &formula)
                    .unwrap();
            }
            sheet
        })
}

fn calculate(sheet: Worksheet, schedule: ScheduleStrategy) -> (Worksheet, CalculationStats) {
    let mut calc =
        Calculator::with_options(CalculationOptions::default().with_schedule(schedule));
    calc.set_worksheet(sheet);
    let (sheet, stats) = calc.calculate_with_stats().unwrap();
    (sheet.clone(), stats)
}

proptest! {
    #[test]
    fn fixed_point_agrees_with_topological(sheet in acyclic_sheet()) {
        let (topological, _) = calculate(sheet.clone(), ScheduleStrategy::Topological);
        let (fixed, stats) = calculate(sheet, ScheduleStrategy::FixedPoint { max_sweeps: 16 });

        prop_assert!(stats.converged);
        prop_assert_eq!(topological, fixed);
    }

    #[test]
    fn every_formula_settles(sheet in acyclic_sheet()) {
        let formulas = sheet.pending_cells().len();
        let (result, stats) = calculate(sheet, ScheduleStrategy::Topological);

        prop_assert_eq!(stats.formula_count, formulas);
        prop_assert_eq!(stats.cells_calculated, formulas);
        prop_assert!(result.pending_cells().is_empty());
    }

    #[test]
    fn literals_survive_and_second_pass_is_a_no_op(sheet in acyclic_sheet()) {
        let (once, _) = calculate(sheet.clone(), ScheduleStrategy::Topological);
        for (addr, cell) in sheet.iter() {
            if cell.formula.is_none() {
                prop_assert_eq!(once.cell_at(addr), Some(cell));
            }
        }

        let (twice, stats) = calculate(once.clone(), ScheduleStrategy::Topological);
        prop_assert_eq!(stats.formula_count, 0);
        prop_assert_eq!(once, twice);
    }
}
