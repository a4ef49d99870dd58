use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox};

use crate::{
    config::SmtpConfig,
    db::DbPool,
    events::{DispatchError, Dispatcher, OrderEvent},
    models::{OrderStatus, format_amount},
};

/// Outbound mail transport. SMTP in production, a logging stand-in when no
/// SMTP credentials are configured and in tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address).parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        let to: Mailbox = to
            .parse()
            .map_err(|_| DispatchError::Mail(format!("invalid recipient address {to}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|err| DispatchError::Mail(err.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|err| DispatchError::Mail(err.to_string()))?;
        Ok(())
    }
}

/// Writes the message to the log instead of the wire.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        tracing::info!(to, subject, body_len = body.len(), "mail (log transport)");
        Ok(())
    }
}

pub struct EmailDispatcher {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
}

impl EmailDispatcher {
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    async fn recipient(&self, user_id: uuid::Uuid) -> Result<String, DispatchError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(email,)| email)
            .ok_or(DispatchError::UnknownRecipient(user_id))
    }
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn dispatch(&self, event: &OrderEvent) -> Result<(), DispatchError> {
        let Some((subject, body)) = render(event) else {
            return Ok(());
        };
        let to = self.recipient(event.user_id()).await?;
        self.mailer.send(&to, &subject, &body).await
    }
}

/// Build subject and plain-text body for an event, or `None` when the event
/// warrants no mail.
fn render(event: &OrderEvent) -> Option<(String, String)> {
    match event {
        OrderEvent::Placed { order, items, .. } => {
            let mut body = format!(
                "Thank you for your order!\n\nInvoice: {}\n\nItems:\n",
                order.invoice_number
            );
            for item in items {
                body.push_str(&format!(
                    "  {} x {} = {}\n",
                    item.quantity,
                    format_amount(item.price),
                    format_amount(item.price * item.quantity as i64)
                ));
            }
            body.push_str(&format!("\nTotal: {}\n", format_amount(order.total_amount)));
            Some((
                format!("Order confirmation {}", order.invoice_number),
                body,
            ))
        }
        OrderEvent::StatusChanged {
            order,
            new: OrderStatus::Shipped,
            ..
        } => {
            let tracking = order.tracking_number.as_deref().unwrap_or("unavailable");
            Some((
                format!("Your order {} has shipped", order.invoice_number),
                format!(
                    "Good news! Order {} is on its way.\nTracking number: {}\n",
                    order.invoice_number, tracking
                ),
            ))
        }
        OrderEvent::StatusChanged {
            order, old, new, ..
        } => Some((
            format!("Order {} update", order.invoice_number),
            format!(
                "The status of order {} changed from {} to {}.\n",
                order.invoice_number, old, new
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderItem};
    use chrono::Utc;
    use uuid::Uuid;

    fn order(status: OrderStatus, tracking: Option<&str>) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_amount: 3998,
            status,
            tracking_number: tracking.map(str::to_string),
            invoice_number: "INV-20260830-0a1b2c3d".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmation_lists_items_and_total() {
        let o = order(OrderStatus::Pending, None);
        let items = vec![OrderItem {
            id: Uuid::new_v4(),
            order_id: o.id,
            product_id: Uuid::new_v4(),
            quantity: 2,
            price: 1999,
            created_at: Utc::now(),
        }];
        let (subject, body) = render(&OrderEvent::placed(o, items)).unwrap();
        assert!(subject.contains("INV-20260830-0a1b2c3d"));
        assert!(body.contains("2 x 19.99 = 39.98"));
        assert!(body.contains("Total: 39.98"));
    }

    #[test]
    fn shipment_mail_carries_tracking_number() {
        let o = order(OrderStatus::Shipped, Some("TRACK-42"));
        let (subject, body) = render(&OrderEvent::status_changed(
            o,
            OrderStatus::Pending,
            OrderStatus::Shipped,
        ))
        .unwrap();
        assert!(subject.contains("has shipped"));
        assert!(body.contains("TRACK-42"));
    }

    #[test]
    fn status_mail_names_both_states() {
        let o = order(OrderStatus::Completed, None);
        let (_, body) = render(&OrderEvent::status_changed(
            o,
            OrderStatus::Pending,
            OrderStatus::Completed,
        ))
        .unwrap();
        assert!(body.contains("from pending to completed"));
    }
}
