//! Recursive field-level authorization over a requested query.
//!
//! # Purpose
//! Decide, before any resolver runs, whether the caller may execute the whole
//! selection. The walk is pure and lock-free; it only reads the immutable
//! field tree and the per-request [`AuthContext`].
//!
//! # Key invariants
//! - Public (introspection) fields are always allowed and their children are
//!   not inspected.
//! - A field's own requirement replaces the inherited one; with neither, the
//!   field is denied.
//! - A requirement is satisfied when the caller satisfies any listed role.
//! - Every sibling is evaluated in document order; the first denial wins.
use crate::{AuthContext, Decision, QueryField, Role};

/// Field names exempt from authorization.
pub const PUBLIC_FIELDS: &[&str] = &["__schema", "__type", "_service", "_entities", "__typename"];

pub fn is_public_field(name: &str) -> bool {
    PUBLIC_FIELDS.contains(&name)
}

/// Top-level policy: missing context, expired credential, then the tree walk.
pub fn authorize(ctx: Option<&AuthContext>, selection: &[QueryField]) -> Decision {
    let Some(ctx) = ctx else {
        tracing::info!("user is not authenticated");
        return Decision::Unauthenticated;
    };
    if ctx.is_expired {
        tracing::info!("expired token");
        return Decision::Expired;
    }
    match evaluate_selection(selection, ctx.role, &[]) {
        Ok(()) => Decision::Allow,
        Err(field) => {
            tracing::info!(field, role = %ctx.role, "user is not authorized for this operation");
            Decision::Forbidden
        }
    }
}

/// Evaluate a sibling set against `role`, returning the first denied field name.
pub fn evaluate_selection<'a>(
    fields: &'a [QueryField],
    role: Role,
    inherited: &[Role],
) -> Result<(), &'a str> {
    for field in fields {
        if is_public_field(&field.name) {
            continue;
        }

        let own = field.required_roles();
        let required: &[Role] = if own.is_empty() { inherited } else { &own };

        if required.is_empty() {
            tracing::info!(
                field = %field.name,
                "field has no role requirement and no annotated ancestor"
            );
            return Err(&field.name);
        }

        if !required.iter().any(|needed| role.is_authorized(*needed)) {
            return Err(&field.name);
        }

        evaluate_selection(&field.children, role, required)?;
    }
    Ok(())
}
