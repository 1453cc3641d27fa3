// src/core/reconciler.rs
use crate::types::{OpenOrder, OrderSpec, Position};
use rust_decimal::Decimal;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct ReconcilePolicy {
    pub order_timeout_ms: i64,
    pub position_stale_ms: i64,
    /// Positions with `|notional|` at or below this are left alone.
    pub noise_floor: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Cancel a resting order that did not fill in time.
    CancelStale(OpenOrder),
    /// Reduce-only market order closing a position.
    Flatten(OrderSpec),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub actions: Vec<Action>,
    pub stale_orders: usize,
    pub fresh_orders: usize,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Cancels come first. A symbol that had a stale order is then flattened whatever
/// the age of its position, since the cancelled leg left it unhedged.
pub fn reconcile(
    open_orders: &[OpenOrder],
    positions: &[Position],
    policy: &ReconcilePolicy,
    now_ms: i64,
) -> Reconciliation {
    let mut result = Reconciliation::default();
    let mut touched: HashSet<&str> = HashSet::new();

    for order in open_orders {
        if now_ms - order.update_time > policy.order_timeout_ms {
            result.stale_orders += 1;
            touched.insert(order.symbol.as_str());
            result.actions.push(Action::CancelStale(order.clone()));
        } else {
            result.fresh_orders += 1;
        }
    }

    for position in positions {
        let stale = now_ms - position.update_time > policy.position_stale_ms;
        if !stale && !touched.contains(position.symbol.as_str()) {
            continue;
        }
        if let Some(order) = flatten_order(position, policy.noise_floor) {
            result.actions.push(Action::Flatten(order));
        }
    }

    result
}

/// Flatten orders for every non-trivial position, whatever its age.
pub fn flatten_all(positions: &[Position], noise_floor: Decimal) -> Vec<OrderSpec> {
    positions
        .iter()
        .filter_map(|p| flatten_order(p, noise_floor))
        .collect()
}

fn flatten_order(position: &Position, noise_floor: Decimal) -> Option<OrderSpec> {
    if position.notional.abs() <= noise_floor {
        return None;
    }
    let side = position.side()?.opposite();
    Some(OrderSpec::market(&position.symbol, side, position.amount.abs()).reduce_only())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderType, Side};
    use std::str::FromStr;

    const NOW: i64 = 1_700_000_000_000;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn policy() -> ReconcilePolicy {
        ReconcilePolicy {
            order_timeout_ms: 300_000,
            position_stale_ms: 60_000,
            noise_floor: d("1"),
        }
    }

    fn order(symbol: &str, side: Side, age_ms: i64) -> OpenOrder {
        OpenOrder {
            symbol: symbol.into(),
            order_id: 9,
            client_order_id: "c9".into(),
            side,
            price: d("100"),
            orig_qty: d("0.5"),
            executed_qty: d("0.2"),
            update_time: NOW - age_ms,
        }
    }

    fn position(symbol: &str, amount: &str, notional: &str, age_ms: i64) -> Position {
        Position {
            symbol: symbol.into(),
            amount: d(amount),
            notional: d(notional),
            update_time: NOW - age_ms,
        }
    }

    #[test]
    fn order_timeout_boundary_is_strict() {
        let at_limit = reconcile(&[order("BTCUSDT", Side::Buy, 300_000)], &[], &policy(), NOW);
        assert!(at_limit.is_noop());
        assert_eq!(at_limit.fresh_orders, 1);

        let past_limit = reconcile(&[order("BTCUSDT", Side::Buy, 300_001)], &[], &policy(), NOW);
        assert_eq!(past_limit.stale_orders, 1);
        assert_eq!(
            past_limit.actions,
            vec![Action::CancelStale(order("BTCUSDT", Side::Buy, 300_001))]
        );
    }

    #[test]
    fn position_staleness_boundary_is_strict() {
        let at_limit = reconcile(&[], &[position("BTCUSDT", "0.01", "1000", 60_000)], &policy(), NOW);
        assert!(at_limit.is_noop());

        let past_limit =
            reconcile(&[], &[position("BTCUSDT", "0.01", "1000", 60_001)], &policy(), NOW);
        assert_eq!(past_limit.actions.len(), 1);
        assert!(matches!(&past_limit.actions[0], Action::Flatten(o) if o.side == Side::Sell));
    }

    #[test]
    fn stale_positions_are_flattened_reduce_only_against_their_sign() {
        let positions = vec![
            position("BTCUSDT", "0.01", "1000", 120_000),
            position("ETHUSDT", "-0.5", "-1000", 120_000),
        ];
        let result = reconcile(&[], &positions, &policy(), NOW);

        let orders: Vec<_> = result
            .actions
            .iter()
            .map(|a| match a {
                Action::Flatten(o) => o.clone(),
                other => panic!("unexpected action {:?}", other),
            })
            .collect();
        assert_eq!(orders.len(), 2);
        assert_eq!((orders[0].side, orders[0].quantity), (Side::Sell, d("0.01")));
        assert_eq!((orders[1].side, orders[1].quantity), (Side::Buy, d("0.5")));
        assert!(orders.iter().all(|o| o.reduce_only && o.price.is_none()));
    }

    #[test]
    fn fresh_dust_and_flat_positions_are_left_alone() {
        let positions = vec![
            position("BTCUSDT", "0.01", "1000", 10_000),
            position("ETHUSDT", "0.0001", "0.2", 120_000),
            position("SOLUSDT", "0", "0", 120_000),
        ];
        assert!(reconcile(&[], &positions, &policy(), NOW).is_noop());
    }

    #[test]
    fn stale_order_is_cancelled_then_its_symbol_flattened_reduce_only() {
        let result = reconcile(
            &[order("BTCUSDT", Side::Sell, 400_000)],
            &[
                position("BTCUSDT", "0.2", "20", 1_000),
                position("ETHUSDT", "0.2", "20", 1_000),
            ],
            &policy(),
            NOW,
        );
        assert_eq!(result.actions.len(), 2);
        assert!(matches!(result.actions[0], Action::CancelStale(_)));
        let Action::Flatten(flatten) = &result.actions[1] else {
            panic!("expected a flatten, got {:?}", result.actions);
        };
        assert_eq!(flatten.symbol, "BTCUSDT");
        assert_eq!((flatten.side, flatten.quantity), (Side::Sell, d("0.2")));
        assert_eq!(flatten.order_type, OrderType::Market);
        assert!(flatten.reduce_only);
    }

    #[test]
    fn stale_order_on_a_flat_account_only_cancels() {
        let result = reconcile(
            &[order("BTCUSDT", Side::Buy, 400_000)],
            &[position("BTCUSDT", "0", "0", 400_000)],
            &policy(),
            NOW,
        );
        assert_eq!(
            result.actions,
            vec![Action::CancelStale(order("BTCUSDT", Side::Buy, 400_000))]
        );
    }

    #[test]
    fn reconciling_twice_with_nothing_stale_is_a_noop() {
        let orders = vec![order("BTCUSDT", Side::Buy, 1_000)];
        let positions = vec![position("BTCUSDT", "0", "0", 0)];
        let first = reconcile(&orders, &positions, &policy(), NOW);
        let second = reconcile(&orders, &positions, &policy(), NOW);
        assert!(first.is_noop());
        assert_eq!(first, second);
    }

    #[test]
    fn flatten_all_ignores_age() {
        let positions = vec![position("BTCUSDT", "-0.01", "-1000", 0)];
        let orders = flatten_all(&positions, d("1"));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
    }
}
