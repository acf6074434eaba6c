use crate::errors::{PaymentError, Result};
use crate::state::Customer;
use crate::types::{Actor, Role};

/// kind of access requested on a customer's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// check that `actor` may touch `customer`'s payments
///
/// Admins see everything. Resellers are limited to customers assigned to
/// them. Customers may read their own records and never write.
pub fn authorize(actor: &Actor, customer: &Customer, access: Access) -> Result<()> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Reseller => customer.reseller_id == Some(actor.id),
        Role::Customer => access == Access::Read && customer.id == actor.id,
    };

    if allowed {
        Ok(())
    } else {
        tracing::warn!(
            actor_id = actor.id,
            role = ?actor.role,
            customer_id = customer.id,
            ?access,
            "access denied"
        );
        Err(PaymentError::PermissionDenied {
            message: format!(
                "{:?} {} may not {} payments of customer {}",
                actor.role,
                actor.id,
                match access {
                    Access::Read => "read",
                    Access::Write => "write",
                },
                customer.id
            ),
        })
    }
}

/// global operations are admin-only
pub fn require_admin(actor: &Actor, operation: &str) -> Result<()> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(PaymentError::PermissionDenied {
            message: format!("{} requires ADMIN, caller is {:?}", operation, actor.role),
        })
    }
}
