//! Per-calculator adapters: which charts and summary lines each page shows.

#![allow(unused_imports)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::chart::{band, Chart, ChartError, Series};
use super::format::{currency, percent, rounded, thousands};
use super::view::{Present, SummaryLine};

fn labels<T: ToString>(items: impl Iterator<Item = T>) -> Vec<String> {
    items.map(|i| i.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[cfg(feature = "finance")]
mod finance_pages {
    use super::*;
    use crate::finance::compound_interest::CompoundInterestOutput;
    use crate::finance::loan::{yearly_summary, FixedPaymentOutput, LoanOutput, YearSummary};
    use crate::finance::mortgage::MortgageOutput;

    fn balance_line(title: &str, years: &[YearSummary]) -> Result<Chart, ChartError> {
        Chart::line(
            title,
            "Year",
            "Balance",
            years.iter().map(|y| Decimal::from(y.year)).collect(),
            vec![Series::new(
                "Remaining balance",
                years.iter().map(|y| y.ending_balance).collect(),
            )],
        )
    }

    fn yearly_bars(years: &[YearSummary]) -> Result<Chart, ChartError> {
        Chart::bar(
            "Principal and interest by year",
            labels(years.iter().map(|y| y.year)),
            vec![
                Series::new("Principal", years.iter().map(|y| y.principal_paid).collect()),
                Series::new("Interest", years.iter().map(|y| y.interest_paid).collect()),
            ],
            true,
        )
    }

    impl Present for LoanOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            let principal = self.total_paid - self.total_interest;
            let mut charts = vec![Chart::pie(
                "Total cost",
                vec![
                    ("Principal".into(), principal),
                    ("Interest".into(), self.total_interest),
                ],
            )?];
            if !self.yearly.is_empty() {
                charts.push(balance_line("Balance over time", &self.yearly)?);
                charts.push(yearly_bars(&self.yearly)?);
            }
            Ok(charts)
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let mut lines = vec![
                SummaryLine::new("Monthly payment", currency(self.monthly_payment)),
                SummaryLine::new("Total interest", currency(self.total_interest)),
                SummaryLine::new("Total paid", currency(self.total_paid)),
                SummaryLine::new("Number of payments", self.payoff_periods.to_string()),
            ];
            if self.periods_saved > 0 {
                lines.push(SummaryLine::new(
                    "Monthly payment with extra",
                    currency(self.total_monthly_payment),
                ));
                lines.push(SummaryLine::new("Interest saved", currency(self.interest_saved)));
                lines.push(SummaryLine::new("Payments saved", self.periods_saved.to_string()));
            }
            if let Some(date) = self.payoff_date {
                lines.push(SummaryLine::new("Payoff date", date.format("%B %Y").to_string()));
            }
            lines
        }
    }

    impl Present for FixedPaymentOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            let years = yearly_summary(&self.schedule);
            if years.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![balance_line("Balance over time", &years)?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let mut lines = vec![
                SummaryLine::new("Monthly payment", currency(self.monthly_payment)),
                SummaryLine::new("Interest-only payment", currency(self.interest_only_threshold)),
                SummaryLine::new("Months to pay off", self.payoff_periods.to_string()),
                SummaryLine::new("Total interest", currency(self.total_interest)),
            ];
            if !self.converged {
                lines.push(SummaryLine::new(
                    "Balance remaining",
                    currency(self.final_balance),
                ));
            }
            lines
        }
    }

    impl Present for MortgageOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            let mut slices = vec![
                ("Principal & interest".to_string(), self.principal_and_interest),
                ("Property tax".to_string(), self.monthly_property_tax),
                ("Insurance".to_string(), self.monthly_insurance),
            ];
            if !self.monthly_hoa.is_zero() {
                slices.push(("HOA".into(), self.monthly_hoa));
            }
            if !self.monthly_pmi.is_zero() {
                slices.push(("PMI".into(), self.monthly_pmi));
            }
            let mut charts = vec![Chart::pie("Monthly payment breakdown", slices)?];
            let years = yearly_summary(&self.schedule);
            if !years.is_empty() {
                charts.push(balance_line("Loan balance", &years)?);
            }
            Ok(charts)
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let mut lines = vec![
                SummaryLine::new("Total monthly payment", currency(self.total_monthly_payment)),
                SummaryLine::new("Principal & interest", currency(self.principal_and_interest)),
                SummaryLine::new("Loan amount", currency(self.loan_amount)),
                SummaryLine::new("Down payment", currency(self.down_payment)),
                SummaryLine::new("Loan-to-value", percent(self.loan_to_value_percent, 1)),
                SummaryLine::new("Total interest", currency(self.total_interest)),
                SummaryLine::new("Total cost", currency(self.total_cost)),
            ];
            if self.pmi_months > 0 {
                lines.push(SummaryLine::new(
                    "PMI",
                    format!("{} for {} months", currency(self.monthly_pmi), self.pmi_months),
                ));
            }
            lines
        }
    }

    impl Present for CompoundInterestOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            let mut charts = vec![Chart::pie(
                "Final balance",
                vec![
                    ("Contributions".into(), self.total_contributions),
                    ("Interest".into(), self.total_interest.max(Decimal::ZERO)),
                ],
            )?];
            if !self.yearly.is_empty() {
                // Starts from the opening principal.
                let mut deposits = self.total_contributions
                    - self.yearly.iter().map(|y| y.deposits).sum::<Decimal>();
                let cumulative: Vec<Decimal> = self
                    .yearly
                    .iter()
                    .map(|y| {
                        deposits += y.deposits;
                        deposits
                    })
                    .collect();
                charts.push(Chart::line(
                    "Growth",
                    "Year",
                    "Balance",
                    self.yearly.iter().map(|y| Decimal::from(y.year)).collect(),
                    vec![
                        Series::new("Balance", self.yearly.iter().map(|y| y.balance).collect()),
                        Series::new("Deposits", cumulative),
                    ],
                )?);
            }
            Ok(charts)
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("Future value", currency(self.future_value)),
                SummaryLine::new("Total contributions", currency(self.total_contributions)),
                SummaryLine::new("Total interest", currency(self.total_interest)),
                SummaryLine::new(
                    "Effective annual rate",
                    percent(self.effective_annual_rate_percent, 3),
                ),
            ]
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[cfg(feature = "health")]
mod health_pages {
    use super::*;
    use crate::health::bmi::{BmiCategory, BmiOutput};
    use crate::health::body_fat::BodyFatOutput;
    use crate::health::metabolic::EnergyOutput;

    impl Present for EnergyOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            let g = &self.goals;
            Ok(vec![
                Chart::pie(
                    "Macronutrients (kcal)",
                    vec![
                        ("Protein".into(), self.macros.protein.calories),
                        ("Carbs".into(), self.macros.carbs.calories),
                        ("Fat".into(), self.macros.fat.calories),
                    ],
                )?,
                Chart::bar(
                    "Daily calories by goal",
                    vec![
                        "Extreme loss".into(),
                        "Loss".into(),
                        "Mild loss".into(),
                        "Maintain".into(),
                        "Mild gain".into(),
                        "Gain".into(),
                    ],
                    vec![Series::new(
                        "kcal/day",
                        vec![g.extreme_loss, g.loss, g.mild_loss, g.maintain, g.mild_gain, g.gain],
                    )],
                    false,
                )?,
            ])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("BMR", format!("{} kcal/day", thousands(self.bmr_rounded, 0))),
                SummaryLine::new("TDEE", format!("{} kcal/day", thousands(self.tdee_rounded, 0))),
                SummaryLine::new("Protein", format!("{} g", rounded(self.macros.protein.grams, 0))),
                SummaryLine::new("Carbs", format!("{} g", rounded(self.macros.carbs.grams, 0))),
                SummaryLine::new("Fat", format!("{} g", rounded(self.macros.fat.grams, 0))),
            ]
        }
    }

    impl Present for BmiOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::gauge_clamped(
                "BMI",
                self.bmi,
                dec!(10),
                dec!(45),
                vec![
                    band("Underweight", dec!(10), dec!(18.5)),
                    band("Normal", dec!(18.5), dec!(25)),
                    band("Overweight", dec!(25), dec!(30)),
                    band("Obese", dec!(30), dec!(45)),
                ],
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let mut lines = vec![
                SummaryLine::new("BMI", rounded(self.bmi_rounded, 1)),
                SummaryLine::new("Category", self.category.label()),
                SummaryLine::new("BMI Prime", rounded(self.bmi_prime, 2)),
                SummaryLine::new(
                    "Healthy weight",
                    format!(
                        "{} – {} kg",
                        rounded(self.healthy_weight_min_kg, 1),
                        rounded(self.healthy_weight_max_kg, 1)
                    ),
                ),
            ];
            if self.category != BmiCategory::Normal && !self.weight_to_healthy_kg.is_zero() {
                let verb = if self.weight_to_healthy_kg > Decimal::ZERO { "Lose" } else { "Gain" };
                lines.push(SummaryLine::new(
                    "To reach a healthy BMI",
                    format!("{verb} {} kg", rounded(self.weight_to_healthy_kg.abs(), 1)),
                ));
            }
            lines
        }
    }

    impl Present for BodyFatOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![
                Chart::gauge_clamped("Body fat %", self.body_fat_percent, Decimal::ZERO, dec!(50), Vec::new())?,
                Chart::pie(
                    "Body composition (kg)",
                    vec![
                        ("Fat mass".into(), self.fat_mass_kg),
                        ("Lean mass".into(), self.lean_mass_kg),
                    ],
                )?,
            ])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("Body fat", percent(self.body_fat_rounded, 1)),
                SummaryLine::new("Category", self.category.label()),
                SummaryLine::new("Fat mass", format!("{} kg", rounded(self.fat_mass_kg, 1))),
                SummaryLine::new("Lean mass", format!("{} kg", rounded(self.lean_mass_kg, 1))),
            ]
        }
    }
}

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

#[cfg(feature = "math")]
mod math_pages {
    use super::*;
    use crate::math::gcf::GcfOutput;
    use crate::math::half_life::DecayOutput;
    use crate::math::percentage::PercentageOutput;
    use crate::math::statistics::{CorrelationOutput, DescriptiveStats};

    impl Present for DecayOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::line(
                "Decay curve",
                "Time",
                "Amount",
                self.curve.iter().map(|p| p.time).collect(),
                vec![Series::new("Amount", self.curve.iter().map(|p| p.amount).collect())],
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("Initial amount", rounded(self.initial_amount, 4)),
                SummaryLine::new("Remaining amount", rounded(self.remaining_amount, 4)),
                SummaryLine::new("Half-life", rounded(self.half_life, 4)),
                SummaryLine::new("Elapsed time", rounded(self.elapsed_time, 4)),
                SummaryLine::new("Decay constant λ", rounded(self.decay_constant, 6)),
                SummaryLine::new("Mean lifetime τ", rounded(self.mean_lifetime, 4)),
                SummaryLine::new("Remaining", percent(self.percent_remaining, 2)),
            ]
        }
    }

    impl Present for GcfOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::bar(
                "Number of factors",
                labels(self.numbers.iter().map(|n| n.number)),
                vec![Series::new(
                    "Factors",
                    self.numbers.iter().map(|n| Decimal::from(n.factors.len())).collect(),
                )],
                false,
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let mut lines = vec![
                SummaryLine::new("GCF", self.gcf.to_string()),
                SummaryLine::new(
                    "LCM",
                    self.lcm.map(|l| l.to_string()).unwrap_or_else(|| "too large".into()),
                ),
                SummaryLine::new(
                    "Common factors",
                    labels(self.common_factors.iter()).join(", "),
                ),
            ];
            for n in &self.numbers {
                lines.push(SummaryLine::new(n.number.to_string(), n.factorization.clone()));
            }
            for step in &self.euclid_trace {
                lines.push(SummaryLine::new("Euclid", step.clone()));
            }
            lines
        }
    }

    impl Present for DescriptiveStats {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![
                Chart::bar(
                    "Five-number summary",
                    vec![
                        "Min".into(),
                        "Q1".into(),
                        "Median".into(),
                        "Q3".into(),
                        "Max".into(),
                    ],
                    vec![Series::new(
                        "Value",
                        vec![self.min, self.q1, self.median, self.q3, self.max],
                    )],
                    false,
                )?,
                Chart::line(
                    "Sorted values",
                    "Rank",
                    "Value",
                    (1..=self.sorted.len()).map(Decimal::from).collect(),
                    vec![Series::new("Value", self.sorted.clone())],
                )?,
            ])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let opt = |v: Option<Decimal>, dp| v.map(|v| rounded(v, dp)).unwrap_or_else(|| "n/a".into());
            let modes = if self.modes.is_empty() {
                "none".to_string()
            } else {
                labels(self.modes.iter().map(|m| m.normalize())).join(", ")
            };
            vec![
                SummaryLine::new("Count", self.count.to_string()),
                SummaryLine::new("Mean", rounded(self.mean, 4)),
                SummaryLine::new("Median", rounded(self.median, 4)),
                SummaryLine::new("Mode", modes),
                SummaryLine::new("Range", rounded(self.range, 4)),
                SummaryLine::new("Std dev (population)", rounded(self.population_std_dev, 4)),
                SummaryLine::new("Std dev (sample)", opt(self.sample_std_dev, 4)),
                SummaryLine::new("Q1 / Q3", format!("{} / {}", rounded(self.q1, 4), rounded(self.q3, 4))),
                SummaryLine::new("IQR", rounded(self.iqr, 4)),
                SummaryLine::new("Skewness", opt(self.skewness, 4)),
                SummaryLine::new("Excess kurtosis", opt(self.excess_kurtosis, 4)),
            ]
        }
    }

    impl Present for CorrelationOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::gauge(
                "Pearson r",
                self.pearson_r,
                -Decimal::ONE,
                Decimal::ONE,
                vec![
                    band("Negative", -Decimal::ONE, Decimal::ZERO),
                    band("Positive", Decimal::ZERO, Decimal::ONE),
                ],
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("Pearson r", rounded(self.pearson_r, 4)),
                SummaryLine::new("R²", rounded(self.r_squared, 4)),
                SummaryLine::new("Strength", self.strength.label()),
                SummaryLine::new(
                    "Best fit",
                    format!("y = {}x + {}", rounded(self.slope, 4), rounded(self.intercept, 4)),
                ),
            ]
        }
    }

    impl Present for PercentageOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(Vec::new())
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("Answer", rounded(self.answer, 4)),
                SummaryLine::new("Working", self.explanation.clone()),
            ]
        }
    }
}

// ---------------------------------------------------------------------------
// Automotive
// ---------------------------------------------------------------------------

#[cfg(feature = "automotive")]
mod automotive_pages {
    use super::*;
    use crate::automotive::horsepower::PowerOutput;
    use crate::automotive::tire::{TireComparisonOutput, TireGeometry};

    impl Present for PowerOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::bar(
                "Power",
                vec!["hp".into(), "kW".into(), "PS".into()],
                vec![Series::new(
                    "Output",
                    vec![self.horsepower, self.kilowatts, self.metric_horsepower],
                )],
                false,
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            vec![
                SummaryLine::new("Horsepower", format!("{} hp", rounded(self.horsepower, 1))),
                SummaryLine::new("Kilowatts", format!("{} kW", rounded(self.kilowatts, 1))),
                SummaryLine::new("Metric horsepower", format!("{} PS", rounded(self.metric_horsepower, 1))),
                SummaryLine::new("Torque", format!("{} lb·ft", rounded(self.torque_lbft, 1))),
                SummaryLine::new("Torque", format!("{} N·m", rounded(self.torque_nm, 1))),
                SummaryLine::new("Engine speed", format!("{} rpm", thousands(self.rpm, 0))),
            ]
        }
    }

    fn geometry_lines(prefix: &str, g: &TireGeometry) -> Vec<SummaryLine> {
        vec![
            SummaryLine::new(format!("{prefix}Size"), g.size.clone()),
            SummaryLine::new(
                format!("{prefix}Diameter"),
                format!("{} mm ({} in)", rounded(g.diameter_mm, 1), rounded(g.diameter_in, 2)),
            ),
            SummaryLine::new(
                format!("{prefix}Sidewall"),
                format!("{} mm ({} in)", rounded(g.sidewall_mm, 1), rounded(g.sidewall_in, 2)),
            ),
            SummaryLine::new(
                format!("{prefix}Circumference"),
                format!("{} mm ({} in)", rounded(g.circumference_mm, 1), rounded(g.circumference_in, 2)),
            ),
            SummaryLine::new(format!("{prefix}Revolutions per mile"), rounded(g.revolutions_per_mile, 1)),
        ]
    }

    impl Present for TireGeometry {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::bar(
                "Dimensions (mm)",
                vec!["Sidewall".into(), "Diameter".into()],
                vec![Series::new("mm", vec![self.sidewall_mm, self.diameter_mm])],
                false,
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            geometry_lines("", self)
        }
    }

    impl Present for TireComparisonOutput {
        fn charts(&self) -> Result<Vec<Chart>, ChartError> {
            Ok(vec![Chart::bar(
                "Original vs replacement (mm)",
                vec!["Sidewall".into(), "Diameter".into()],
                vec![
                    Series::new(
                        self.original.size.clone(),
                        vec![self.original.sidewall_mm, self.original.diameter_mm],
                    ),
                    Series::new(
                        self.replacement.size.clone(),
                        vec![self.replacement.sidewall_mm, self.replacement.diameter_mm],
                    ),
                ],
                false,
            )?])
        }

        fn summary(&self) -> Vec<SummaryLine> {
            let mut lines = geometry_lines("Original ", &self.original);
            lines.extend(geometry_lines("New ", &self.replacement));
            lines.push(SummaryLine::new(
                "Diameter difference",
                percent(self.diameter_difference_percent, 2),
            ));
            lines.push(SummaryLine::new(
                "Speedometer",
                format!(
                    "reads {} when actually going {}",
                    rounded(self.speedometer_reading, 1),
                    rounded(self.actual_speed, 1)
                ),
            ));
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::view::{render, PageView};

    #[cfg(feature = "finance")]
    #[test]
    fn test_loan_page_renders() {
        use crate::finance::loan::{calculate_loan, LoanInput};

        let input = LoanInput {
            principal: dec!(100000),
            annual_rate_percent: dec!(6),
            term_years: dec!(30),
            extra_payment: None,
            start_date: None,
        };
        let PageView::Ready { charts, summary, .. } = render(calculate_loan(&input)) else {
            panic!("expected a rendered page");
        };
        assert_eq!(charts.len(), 3);
        assert_eq!(summary[0].value, "$599.55");
    }

    #[cfg(feature = "health")]
    #[test]
    fn test_invalid_input_becomes_message() {
        use crate::health::bmi::{calculate_bmi, BmiInput};

        let view = render(calculate_bmi(&BmiInput {
            weight_kg: dec!(70),
            height_cm: Decimal::ZERO,
        }));
        match view {
            PageView::Invalid { field, message } => {
                assert_eq!(field.as_deref(), Some("height_cm"));
                assert!(message.contains("height_cm"));
            }
            PageView::Ready { .. } => panic!("zero height must not render"),
        }
    }

    #[cfg(feature = "health")]
    #[test]
    fn test_bmi_gauge_is_clamped() {
        use crate::health::bmi::{calculate_bmi, BmiInput};

        let view = render(calculate_bmi(&BmiInput {
            weight_kg: dec!(250),
            height_cm: dec!(160),
        }));
        let PageView::Ready { charts, .. } = view else {
            panic!("expected a rendered page");
        };
        let Chart::Gauge(g) = &charts[0] else {
            panic!("expected a gauge");
        };
        assert_eq!(g.value, dec!(45));
    }

    #[cfg(feature = "math")]
    #[test]
    fn test_domain_error_message_passes_through() {
        use crate::math::gcf::{calculate_gcf, GcfInput};

        let view = render(calculate_gcf(&GcfInput { numbers: vec![0, 0] }));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["message"], "both numbers cannot be zero");
        assert!(json.get("field").is_none());
    }
}
