//! # Validation Module
//!
//! Pre-transaction input validation.
//!
//! ## Validation Strategy
//! ```text
//! Layer 1: HTTP layer (external) - type checks on deserialization
//! Layer 2: THIS MODULE           - business rule validation, runs before
//!                                  any transaction is opened
//! Layer 3: Database              - CHECK / UNIQUE / FK constraints as the
//!                                  last line of defense
//! ```
//!
//! A request rejected here produces a [`ValidationError`] and leaves the
//! data store untouched.

use crate::error::ValidationError;
use crate::types::{LineTarget, NewMovement, NewSale, NewSaleItem};
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement or sale line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (9999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0); zero is allowed (free receipt)
pub fn validate_unit_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "unitPrice".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Id Validators
// =============================================================================

/// Validates an entity id: non-empty, valid UUID format.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates an inventory movement request.
///
/// The unit price is checked for any movement that carries one, but only
/// IN movements ever apply it.
pub fn validate_movement(movement: &NewMovement) -> ValidationResult<()> {
    validate_id("productId", &movement.product_id)?;
    validate_quantity(movement.quantity)?;

    // An OUT may carry a unit price; it is validated here and ignored by
    // the recorder.
    if let Some(cents) = movement.unit_price_cents {
        validate_unit_price_cents(cents)?;
    }

    Ok(())
}

/// Resolves a requested sale line into its [`LineTarget`].
///
/// ## Rules
/// - Exactly one of productId/serviceId must be set
/// - Quantity must be positive
pub fn resolve_sale_item(item: &NewSaleItem) -> ValidationResult<LineTarget> {
    validate_quantity(item.quantity)?;

    match (&item.product_id, &item.service_id) {
        (Some(product_id), None) => {
            validate_id("productId", product_id)?;
            Ok(LineTarget::Product(product_id.clone()))
        }
        (None, Some(service_id)) => {
            validate_id("serviceId", service_id)?;
            Ok(LineTarget::Service(service_id.clone()))
        }
        _ => Err(ValidationError::AmbiguousLineTarget),
    }
}

/// Validates a sale request and resolves every line target.
///
/// Returns targets in request order, paired with their quantities.
pub fn resolve_sale_items(sale: &NewSale) -> ValidationResult<Vec<(LineTarget, i64)>> {
    if sale.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    sale.items
        .iter()
        .map(|item| Ok((resolve_sale_item(item)?, item.quantity)))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MovementType;

    const PRODUCT_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
    const SERVICE_ID: &str = "550e8400-e29b-41d4-a716-446655440001";

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10000).is_err());
    }

    #[test]
    fn test_validate_unit_price_cents() {
        assert!(validate_unit_price_cents(0).is_ok());
        assert!(validate_unit_price_cents(1099).is_ok());
        assert!(validate_unit_price_cents(-1).is_err());
    }

    #[test]
    fn test_validate_movement() {
        let movement = NewMovement {
            product_id: PRODUCT_ID.to_string(),
            kind: MovementType::In,
            quantity: 10,
            unit_price_cents: Some(700),
            reason: Some("monthly purchase".to_string()),
        };
        assert!(validate_movement(&movement).is_ok());

        let bad_qty = NewMovement {
            quantity: 0,
            ..movement.clone()
        };
        assert!(validate_movement(&bad_qty).is_err());

        let bad_price = NewMovement {
            unit_price_cents: Some(-5),
            ..movement.clone()
        };
        assert!(validate_movement(&bad_price).is_err());

        let bad_id = NewMovement {
            product_id: "not-a-uuid".to_string(),
            ..movement
        };
        assert!(validate_movement(&bad_id).is_err());
    }

    #[test]
    fn test_resolve_sale_item_exactly_one_target() {
        let product_line = NewSaleItem {
            product_id: Some(PRODUCT_ID.to_string()),
            service_id: None,
            quantity: 2,
        };
        assert_eq!(
            resolve_sale_item(&product_line).unwrap(),
            LineTarget::Product(PRODUCT_ID.to_string())
        );

        let service_line = NewSaleItem {
            product_id: None,
            service_id: Some(SERVICE_ID.to_string()),
            quantity: 1,
        };
        assert_eq!(
            resolve_sale_item(&service_line).unwrap(),
            LineTarget::Service(SERVICE_ID.to_string())
        );

        let both = NewSaleItem {
            product_id: Some(PRODUCT_ID.to_string()),
            service_id: Some(SERVICE_ID.to_string()),
            quantity: 1,
        };
        assert!(matches!(
            resolve_sale_item(&both),
            Err(ValidationError::AmbiguousLineTarget)
        ));

        let neither = NewSaleItem {
            product_id: None,
            service_id: None,
            quantity: 1,
        };
        assert!(matches!(
            resolve_sale_item(&neither),
            Err(ValidationError::AmbiguousLineTarget)
        ));
    }

    #[test]
    fn test_resolve_sale_items_rejects_empty() {
        let sale = NewSale {
            items: vec![],
            customer_id: None,
            notes: None,
            apply_tax: false,
        };
        assert!(matches!(
            resolve_sale_items(&sale),
            Err(ValidationError::Required { .. })
        ));
    }
}
