//! Supplier price comparison for one material

use uuid::Uuid;

use crate::models::{SupplierComparison, SupplierPrice, SupplierQuote};

/// Rank quotes cheapest first and flag the best in-stock price.
///
/// Unavailable quotes are listed after the available ones and never count as
/// best. Every quote sharing the lowest available price is flagged.
pub fn compare(material_id: Uuid, prices: Vec<SupplierPrice>) -> SupplierComparison {
    let mut prices = prices;
    prices.sort_by(|a, b| {
        b.is_available
            .cmp(&a.is_available)
            .then(a.price.total_cmp(&b.price))
            .then_with(|| a.supplier_name.cmp(&b.supplier_name))
    });

    let available: Vec<f64> = prices
        .iter()
        .filter(|p| p.is_available)
        .map(|p| p.price)
        .collect();
    let best_price = available.iter().copied().reduce(f64::min);
    let highest = available.iter().copied().reduce(f64::max);

    let potential_savings = match (best_price, highest) {
        (Some(low), Some(high)) => high - low,
        _ => 0.0,
    };

    let quotes = prices
        .into_iter()
        .map(|price| {
            let is_best_price = price.is_available && Some(price.price) == best_price;
            SupplierQuote { price, is_best_price }
        })
        .collect();

    SupplierComparison {
        material_id,
        quotes,
        best_price,
        potential_savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(material_id: Uuid, supplier: &str, price: f64, available: bool) -> SupplierPrice {
        SupplierPrice {
            id: Uuid::new_v4(),
            material_id,
            supplier_name: supplier.to_string(),
            price,
            location: None,
            quality_rating: None,
            delivery_time_days: None,
            is_available: available,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cheapest_available_is_best() {
        let id = Uuid::new_v4();
        let comparison = compare(
            id,
            vec![
                quote(id, "Builders", 250.0, true),
                quote(id, "Timber City", 90.0, false),
                quote(id, "Leroy", 180.0, true),
            ],
        );

        let names: Vec<&str> = comparison
            .quotes
            .iter()
            .map(|q| q.price.supplier_name.as_str())
            .collect();
        assert_eq!(names, vec!["Leroy", "Builders", "Timber City"]);
        assert_eq!(comparison.best_price, Some(180.0));
        assert_eq!(comparison.potential_savings, 70.0);
        assert!(comparison.quotes[0].is_best_price);
        assert!(!comparison.quotes[2].is_best_price, "out of stock never wins");
    }

    #[test]
    fn test_ties_all_flagged() {
        let id = Uuid::new_v4();
        let comparison = compare(
            id,
            vec![quote(id, "B", 100.0, true), quote(id, "A", 100.0, true)],
        );
        assert!(comparison.quotes.iter().all(|q| q.is_best_price));
        assert_eq!(comparison.quotes[0].price.supplier_name, "A");
    }

    #[test]
    fn test_no_quotes() {
        let comparison = compare(Uuid::new_v4(), Vec::new());
        assert!(comparison.quotes.is_empty());
        assert_eq!(comparison.best_price, None);
        assert_eq!(comparison.potential_savings, 0.0);
    }
}
