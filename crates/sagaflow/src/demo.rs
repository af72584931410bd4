//! Built-in `order` saga used by the command line.
//!
//! `reserve_inventory` → `charge_payment` → `await_approval` → `ship_order`.
//! Orders above [`CHARGE_LIMIT_CENTS`] are declined and compensated, and
//! unapproved orders suspend at `await_approval` until resumed.

use std::sync::Arc;
use std::time::Duration;

use sagaflow_saga::{
    CompensateAction, DefinitionError, Start, StateDefinition, StateDefinitions, StepAction,
};
use serde::{Deserialize, Serialize};

pub(crate) const SAGA_NAME: &str = "order";
pub(crate) const TRIGGER_EVENT: &str = "OrderPlaced";
pub(crate) const CHARGE_LIMIT_CENTS: u64 = 100_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Order {
    pub(crate) order_id: String,
    pub(crate) amount_cents: u64,
    pub(crate) approved: bool,
    pub(crate) reserved: bool,
    pub(crate) charged: bool,
    pub(crate) shipped: bool,
    pub(crate) released: bool,
    pub(crate) refunded: bool,
}

pub(crate) fn definitions() -> Result<Arc<StateDefinitions<Order>>, DefinitionError> {
    let definitions = StateDefinitions::builder(SAGA_NAME, TRIGGER_EVENT)
        .start(|event| {
            let order: Order = serde_json::from_value(event.clone())?;
            if order.order_id.is_empty() {
                return Err("order event has no order_id".into());
            }
            Ok(Start::new("reserve_inventory", order))
        })
        .step(
            StateDefinition::new(
                "reserve_inventory",
                |mut order: Order, action: &mut StepAction<Order>| {
                    order.reserved = true;
                    action.next("charge_payment", order);
                },
            )
            .compensate_with(|mut order: Order, action: &mut CompensateAction<Order>| {
                order.reserved = false;
                order.released = true;
                action.back(order);
            }),
        )
        .step(
            StateDefinition::new(
                "charge_payment",
                |mut order: Order, action: &mut StepAction<Order>| {
                    if order.amount_cents > CHARGE_LIMIT_CENTS {
                        action.compensate(
                            format!("payment of {} cents declined", order.amount_cents),
                            order,
                        );
                        return;
                    }
                    order.charged = true;
                    action.next("await_approval", order);
                },
            )
            .compensate_with(|mut order: Order, action: &mut CompensateAction<Order>| {
                if order.charged {
                    order.refunded = true;
                }
                action.back(order);
            })
            .retry(2, Duration::from_millis(250), 2.0),
        )
        .step(StateDefinition::new(
            "await_approval",
            |order: Order, action: &mut StepAction<Order>| {
                if order.approved {
                    action.next("ship_order", order);
                } else {
                    action.stop(order);
                }
            },
        ))
        .step(StateDefinition::new(
            "ship_order",
            |mut order: Order, action: &mut StepAction<Order>| {
                order.shipped = true;
                action.end(order);
            },
        ))
        .build()?;
    Ok(Arc::new(definitions))
}
