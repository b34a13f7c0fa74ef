//! Period statistics: revenue, write-off loss and profit per configured type.

use crate::domain::entities::{AggregatedStats, DateRange, PeriodAggregate, PriceTable};

#[derive(Debug, Clone, PartialEq)]
pub struct ProductStats {
    pub pie_type: String,
    pub price: f64,
    pub manufactured: i64,
    pub sold: i64,
    pub written_off: i64,
    pub revenue: f64,
    pub loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStats {
    pub period: DateRange,
    /// In configured type order.
    pub products: Vec<ProductStats>,
    pub total_revenue: f64,
    pub total_written_off: i64,
    pub expenses: f64,
    pub loss_from_write_off: f64,
    pub profit: f64,
}

/// Combine prices with store-side aggregates. Types outside `known_types` are ignored;
/// known types with no activity count as zeros.
pub fn compute_stats(
    period: DateRange,
    prices: &PriceTable,
    aggregates: &AggregatedStats,
    known_types: &[String],
) -> PeriodStats {
    let mut products = Vec::with_capacity(known_types.len());
    let mut total_revenue = 0.0;
    let mut total_written_off = 0;
    let mut loss_from_write_off = 0.0;

    for pie_type in known_types {
        let totals = aggregates
            .per_type
            .get(pie_type)
            .copied()
            .unwrap_or_default();
        let PeriodAggregate {
            manufactured,
            sold,
            written_off,
        } = totals;
        let price = prices.price_of(pie_type);
        let revenue = sold as f64 * price;
        let loss = written_off as f64 * price;

        total_revenue += revenue;
        total_written_off += written_off;
        loss_from_write_off += loss;

        products.push(ProductStats {
            pie_type: pie_type.clone(),
            price,
            manufactured,
            sold,
            written_off,
            revenue,
            loss,
        });
    }

    PeriodStats {
        period,
        products,
        total_revenue,
        total_written_off,
        expenses: aggregates.expenses,
        loss_from_write_off,
        profit: total_revenue - aggregates.expenses - loss_from_write_off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> DateRange {
        DateRange::single_day(NaiveDate::from_ymd_opt(2024, 8, 9).unwrap())
    }

    fn types(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compute_stats_totals() {
        let prices: PriceTable = [("Meat".to_string(), 100.0), ("Potato".to_string(), 80.0)]
            .into_iter()
            .collect();
        let mut aggregates = AggregatedStats {
            expenses: 5000.0,
            ..Default::default()
        };
        aggregates.per_type.insert(
            "Meat".into(),
            PeriodAggregate {
                manufactured: 25,
                sold: 20,
                written_off: 0,
            },
        );
        aggregates.per_type.insert(
            "Potato".into(),
            PeriodAggregate {
                manufactured: 15,
                sold: 11,
                written_off: 1,
            },
        );

        let stats = compute_stats(today(), &prices, &aggregates, &types(&["Meat", "Potato"]));

        assert_eq!(stats.total_revenue, 2880.0);
        assert_eq!(stats.loss_from_write_off, 80.0);
        assert_eq!(stats.total_written_off, 1);
        assert_eq!(stats.expenses, 5000.0);
        assert_eq!(stats.profit, -2200.0);
        assert_eq!(stats.products[0].revenue, 2000.0);
        assert_eq!(stats.products[1].loss, 80.0);
    }

    #[test]
    fn test_missing_types_are_zero_and_unknown_types_ignored() {
        let prices = PriceTable::new();
        let mut aggregates = AggregatedStats::default();
        aggregates.per_type.insert(
            "Cherry".into(),
            PeriodAggregate {
                manufactured: 10,
                sold: 10,
                written_off: 0,
            },
        );
        aggregates.per_type.insert(
            "Meat".into(),
            PeriodAggregate {
                manufactured: 5,
                sold: 4,
                written_off: 1,
            },
        );

        let stats = compute_stats(today(), &prices, &aggregates, &types(&["Potato", "Meat"]));

        assert_eq!(
            stats
                .products
                .iter()
                .map(|p| p.pie_type.as_str())
                .collect::<Vec<_>>(),
            vec!["Potato", "Meat"]
        );
        assert_eq!(stats.products[0].manufactured, 0);
        // unpriced type still counts sold units but earns nothing
        assert_eq!(stats.products[1].sold, 4);
        assert_eq!(stats.products[1].revenue, 0.0);
        assert_eq!(stats.total_revenue, 0.0);
        assert_eq!(stats.profit, 0.0);
    }
}
