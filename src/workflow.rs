//! Order lifecycle rules: which status edges exist, and who may take them.
//!
//! Every transition goes through [`validate_transition`] before anything is
//! written. The write itself is a compare-and-swap on the current status
//! (`db::orders::transition`), so a concurrent writer racing from the same
//! source status loses with a `Conflict` instead of silently overwriting.

use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::models::{Order, OrderStatus};

/// The authenticated identity attempting a transition.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl From<&AuthUser> for Actor {
    fn from(auth: &AuthUser) -> Self {
        Actor {
            user_id: auth.user_id,
            is_admin: auth.is_admin,
        }
    }
}

/// Whether an edge exists in the transition table, ignoring who asks.
pub fn transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (New, Processing)
            | (New, Cancelled)
            | (Processing, Confirmed)
            | (Processing, Rejected)
            | (Processing, Cancelled)
            | (Confirmed, Completed)
            | (Confirmed, Cancelled)
    )
}

/// Validate a requested transition against the current order state and the
/// acting identity. Returns `Ok(())` only if the compare-and-swap write may
/// proceed; otherwise the error to surface, with no side effects.
pub fn validate_transition(
    order: &Order,
    actor: &Actor,
    target: OrderStatus,
    notes: Option<&str>,
) -> Result<(), AppError> {
    // An actor with no relationship to the order never learns more than
    // "forbidden", regardless of the requested edge.
    if !actor.is_admin && order.user_id != actor.user_id {
        return Err(AppError::Forbidden(
            "You do not have access to this order".to_string(),
        ));
    }

    if order.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Order is {} and cannot be transitioned",
            order.status.as_str()
        )));
    }

    if !transition_allowed(order.status, target) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot transition from {} to {}",
            order.status.as_str(),
            target.as_str()
        )));
    }

    match target {
        OrderStatus::Processing | OrderStatus::Confirmed | OrderStatus::Completed => {
            if !actor.is_admin {
                return Err(AppError::Forbidden("Admin access required".to_string()));
            }
        }
        OrderStatus::Rejected => {
            if !actor.is_admin {
                return Err(AppError::Forbidden("Admin access required".to_string()));
            }
            if notes.map(str::trim).filter(|n| !n.is_empty()).is_none() {
                return Err(AppError::Validation(
                    "Admin notes are required when rejecting an order".to_string(),
                ));
            }
        }
        OrderStatus::Cancelled => {
            // Owners may withdraw their own request while it is still NEW or
            // PROCESSING; admins may cancel from any non-terminal state.
            if !actor.is_admin
                && !matches!(order.status, OrderStatus::New | OrderStatus::Processing)
            {
                return Err(AppError::Forbidden(
                    "Only an admin can cancel an order at this stage".to_string(),
                ));
            }
        }
        OrderStatus::New => unreachable!("no edge leads back to NEW"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderKind;
    use chrono::Utc;

    fn order(status: OrderStatus, owner: Uuid) -> Order {
        Order {
            id: Uuid::now_v7(),
            order_number: "HT-2024-0001".to_string(),
            kind: OrderKind::Hotel,
            user_id: owner,
            employee_id: "EMP001".to_string(),
            full_name: "Test Crew Member".to_string(),
            status,
            departure_city: None,
            arrival_city: None,
            departure_date: None,
            departure_time: None,
            arrival_date: None,
            arrival_time: None,
            flight_number: None,
            airline: None,
            purpose: None,
            priority: None,
            passengers: None,
            luggage_info: None,
            special_requests: None,
            city: Some("Dubai".to_string()),
            check_in_date: None,
            check_in_time: None,
            check_out_date: None,
            check_out_time: None,
            flight_date: None,
            processed_by: None,
            processed_at: None,
            admin_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn admin() -> Actor {
        Actor {
            user_id: Uuid::now_v7(),
            is_admin: true,
        }
    }

    fn owner_of(o: &Order) -> Actor {
        Actor {
            user_id: o.user_id,
            is_admin: false,
        }
    }

    fn stranger() -> Actor {
        Actor {
            user_id: Uuid::now_v7(),
            is_admin: false,
        }
    }

    #[test]
    fn transition_table_edges() {
        use OrderStatus::*;
        let allowed = [
            (New, Processing),
            (New, Cancelled),
            (Processing, Confirmed),
            (Processing, Rejected),
            (Processing, Cancelled),
            (Confirmed, Completed),
            (Confirmed, Cancelled),
        ];
        let all = [New, Processing, Confirmed, Rejected, Completed, Cancelled];
        for from in all {
            for to in all {
                assert_eq!(
                    transition_allowed(from, to),
                    allowed.contains(&(from, to)),
                    "edge {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn no_edges_out_of_terminal_states() {
        use OrderStatus::*;
        for from in [Completed, Rejected, Cancelled] {
            for to in [New, Processing, Confirmed, Rejected, Completed, Cancelled] {
                assert!(!transition_allowed(from, to));
            }
        }
    }

    #[test]
    fn admin_moves_new_to_processing() {
        let o = order(OrderStatus::New, Uuid::now_v7());
        assert!(validate_transition(&o, &admin(), OrderStatus::Processing, None).is_ok());
    }

    #[test]
    fn owner_cannot_move_to_processing() {
        let o = order(OrderStatus::New, Uuid::now_v7());
        let err = validate_transition(&o, &owner_of(&o), OrderStatus::Processing, None);
        assert!(matches!(err, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn stranger_always_forbidden() {
        use OrderStatus::*;
        for status in [New, Processing, Confirmed] {
            let o = order(status, Uuid::now_v7());
            for target in [New, Processing, Confirmed, Rejected, Completed, Cancelled] {
                let err = validate_transition(&o, &stranger(), target, Some("notes"));
                assert!(
                    matches!(err, Err(AppError::Forbidden(_))),
                    "{status:?} -> {target:?}"
                );
            }
        }
    }

    #[test]
    fn reject_requires_notes() {
        let o = order(OrderStatus::Processing, Uuid::now_v7());
        let err = validate_transition(&o, &admin(), OrderStatus::Rejected, None);
        assert!(matches!(err, Err(AppError::Validation(_))));

        let err = validate_transition(&o, &admin(), OrderStatus::Rejected, Some("   "));
        assert!(matches!(err, Err(AppError::Validation(_))));

        assert!(
            validate_transition(&o, &admin(), OrderStatus::Rejected, Some("no seats left")).is_ok()
        );
    }

    #[test]
    fn confirm_does_not_require_notes() {
        let o = order(OrderStatus::Processing, Uuid::now_v7());
        assert!(validate_transition(&o, &admin(), OrderStatus::Confirmed, None).is_ok());
    }

    #[test]
    fn owner_cancels_while_new_or_processing() {
        for status in [OrderStatus::New, OrderStatus::Processing] {
            let o = order(status, Uuid::now_v7());
            assert!(validate_transition(&o, &owner_of(&o), OrderStatus::Cancelled, None).is_ok());
        }
    }

    #[test]
    fn owner_cannot_cancel_confirmed() {
        let o = order(OrderStatus::Confirmed, Uuid::now_v7());
        let err = validate_transition(&o, &owner_of(&o), OrderStatus::Cancelled, None);
        assert!(matches!(err, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn admin_cancels_confirmed() {
        let o = order(OrderStatus::Confirmed, Uuid::now_v7());
        assert!(validate_transition(&o, &admin(), OrderStatus::Cancelled, None).is_ok());
    }

    #[test]
    fn completed_is_terminal() {
        let o = order(OrderStatus::Completed, Uuid::now_v7());
        let err = validate_transition(&o, &admin(), OrderStatus::Processing, None);
        assert!(matches!(err, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn back_edge_to_new_is_invalid() {
        let o = order(OrderStatus::Processing, Uuid::now_v7());
        let err = validate_transition(&o, &admin(), OrderStatus::New, None);
        assert!(matches!(err, Err(AppError::InvalidTransition(_))));
    }
}
