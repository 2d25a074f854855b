//! The type-erased capability the original exposes as a single function
//! pointer signature (`pthread_permitX_grant_func`) so that any permit
//! variant can be handed to a third party that only needs to complete it.

use crate::error::PermitResult;

pub trait Grantable: Send + Sync {
    /// Grants the permit. Equivalent across all three variants.
    fn grant(&self) -> PermitResult<()>;
}
