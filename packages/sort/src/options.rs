use crate::error::{SortError, SortResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wildcard slot in an `order` list
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    /// Unlisted siblings keep their declaration order
    #[default]
    Configure,
    /// Unlisted siblings fall back to natural-order comparison
    #[serde(alias = "alpha")]
    Alphabetical,
}

/// One slot of an `order` list: a name, or the sub-order for the name
/// immediately before it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderItem {
    Name(String),
    Nested(Vec<OrderItem>),
}

impl From<&str> for OrderItem {
    fn from(name: &str) -> Self {
        OrderItem::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorySortOptions {
    pub method: SortMethod,
    pub order: Vec<OrderItem>,
    /// Accepted for configuration compatibility; collation is locale-independent
    pub locales: Option<String>,
    pub include_names: bool,
    /// Per-segment weights; heavier segments sort first
    pub weights: BTreeMap<String, f64>,
}

impl StorySortOptions {
    pub fn alphabetical() -> Self {
        Self {
            method: SortMethod::Alphabetical,
            ..Default::default()
        }
    }

    pub fn with_order(mut self, order: Vec<OrderItem>) -> Self {
        self.order = order;
        self
    }

    pub fn with_weight(mut self, segment: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(segment.into(), weight);
        self
    }

    pub fn validate(&self) -> SortResult<()> {
        for (segment, weight) in &self.weights {
            if !weight.is_finite() {
                return Err(SortError::InvalidWeight {
                    segment: segment.clone(),
                    weight: *weight,
                });
            }
        }
        Ok(())
    }
}

/// Position of `name` in an order list
pub(crate) fn position(order: &[OrderItem], name: &str) -> Option<usize> {
    order
        .iter()
        .position(|item| matches!(item, OrderItem::Name(n) if n == name))
}

/// The nested order following the slot for `name` (or the wildcard)
pub(crate) fn nested<'a>(order: &'a [OrderItem], name: &str) -> &'a [OrderItem] {
    let index = position(order, name).or_else(|| position(order, WILDCARD));
    match index.and_then(|i| order.get(i + 1)) {
        Some(OrderItem::Nested(items)) => items,
        _ => &[],
    }
}
