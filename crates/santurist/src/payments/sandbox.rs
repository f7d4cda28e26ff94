use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::info;

use super::{
    PaymentError, PaymentGateway, PaymentLink, PaymentRecord, PaymentReference, PaymentStatus,
    PreferenceRequest,
};

/// Gateway used when no Mercado Pago credentials are configured.
///
/// Payments only exist once [`SandboxGateway::settle`] records them, so webhook
/// notifications are verified the same way as against the real provider.
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    checkout_base: String,
    payments: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl SandboxGateway {
    pub fn new(checkout_base: impl Into<String>) -> Self {
        Self {
            checkout_base: checkout_base.into(),
            payments: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Records a payment outcome as the hosted checkout would.
    pub fn settle(
        &self,
        payment_id: impl Into<String>,
        external_reference: PaymentReference,
        status: PaymentStatus,
    ) -> Result<(), PaymentError> {
        let payment_id = payment_id.into();
        let mut payments = self
            .payments
            .write()
            .map_err(|_| PaymentError::Transport("sandbox ledger poisoned".to_string()))?;
        info!(%payment_id, reference = %external_reference, ?status, "sandbox payment settled");
        payments.insert(
            payment_id.clone(),
            PaymentRecord {
                payment_id,
                external_reference,
                status,
            },
        );
        Ok(())
    }
}

impl Default for SandboxGateway {
    fn default() -> Self {
        Self::new("http://localhost:3000/checkout/sandbox")
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PaymentLink, PaymentError> {
        let preference_id = format!("sandbox-{}", request.external_reference)
            .replace(':', "-");
        info!(%preference_id, "sandbox payment preference created");
        Ok(PaymentLink {
            init_point: format!("{}?pref_id={}", self.checkout_base, preference_id),
            preference_id,
        })
    }

    async fn refund(&self, payment_id: &str, amount: u64) -> Result<(), PaymentError> {
        info!(payment_id, amount, "sandbox refund recorded");
        Ok(())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        let payments = self
            .payments
            .read()
            .map_err(|_| PaymentError::Transport("sandbox ledger poisoned".to_string()))?;
        payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownPayment(payment_id.to_string()))
    }
}
