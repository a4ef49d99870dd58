use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// The actions the pipeline records. A closed set keeps the `action`
/// column queryable instead of accumulating free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    OrderPlaced,
    OrderStatusChanged,
    CartAdd,
    CartUpdate,
    CartRemove,
    InventoryAdjust,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::OrderPlaced => "order_placed",
            AuditAction::OrderStatusChanged => "order_status_changed",
            AuditAction::CartAdd => "cart_add",
            AuditAction::CartUpdate => "cart_update",
            AuditAction::CartRemove => "cart_remove",
            AuditAction::InventoryAdjust => "inventory_adjust",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_are_stable_and_distinct() {
        let all = [
            AuditAction::OrderPlaced,
            AuditAction::OrderStatusChanged,
            AuditAction::CartAdd,
            AuditAction::CartUpdate,
            AuditAction::CartRemove,
            AuditAction::InventoryAdjust,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
        // Row filters in dashboards key on these exact strings.
        assert_eq!(AuditAction::OrderPlaced.as_str(), "order_placed");
        assert_eq!(AuditAction::OrderStatusChanged.as_str(), "order_status_changed");
    }
}
