use chrono::{NaiveTime, Timelike};
use serde::Serialize;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Merchandise category tracked by the store, with its maximum stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub name: &'static str,
    pub max_stock: u32,
}

pub const CATEGORIES: [Category; 5] = [
    Category { name: "Bottle", max_stock: 100 },
    Category { name: "Pen", max_stock: 1000 },
    Category { name: "Footwear", max_stock: 50 },
    Category { name: "Drink", max_stock: 100 },
    Category { name: "Clothing", max_stock: 500 },
];

pub fn is_tracked(name: &str) -> bool {
    CATEGORIES.iter().any(|c| c.name == name)
}

/// Fraction of the day elapsed since midnight, in `[0, 1)`.
pub fn portion_of_day(time: NaiveTime) -> f64 {
    // chrono encodes a leap second as nanos >= 1e9
    let nanos = time.nanosecond().min(999_999_999);
    let seconds = time.num_seconds_from_midnight() as f64 + nanos as f64 / 1e9;
    seconds / SECONDS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub category: &'static str,
    pub max_stock: u32,
    pub current: u32,
}

/// Synthetic stock per category: the max stock scaled by how much of the day has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSnapshot {
    pub stock: Vec<StockLevel>,
}

impl StockSnapshot {
    pub fn at(time: NaiveTime) -> Self {
        let portion = portion_of_day(time);
        let stock = CATEGORIES
            .iter()
            .map(|c| StockLevel {
                category: c.name,
                max_stock: c.max_stock,
                current: (c.max_stock as f64 * portion) as u32,
            })
            .collect();
        Self { stock }
    }

    pub fn current(&self, category: &str) -> Option<u32> {
        self.stock.iter().find(|s| s.category == category).map(|s| s.current)
    }
}
