use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{
    PaymentError, PaymentGateway, PaymentLink, PaymentRecord, PaymentStatus, PreferenceRequest,
    CURRENCY,
};

/// Checkout Pro client creating preferences and refunds over the REST API.
#[derive(Clone, Debug)]
pub struct MercadoPagoGateway {
    http_client: Client,
    access_token: String,
    api_base: String,
    back_url: String,
}

#[derive(Serialize)]
struct PreferenceBody<'a> {
    items: Vec<ItemBody<'a>>,
    external_reference: String,
    payer: PayerBody<'a>,
    back_urls: BackUrls<'a>,
    auto_return: &'static str,
}

#[derive(Serialize)]
struct ItemBody<'a> {
    title: &'a str,
    quantity: u32,
    unit_price: u64,
    currency_id: &'static str,
}

#[derive(Serialize)]
struct PayerBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct BackUrls<'a> {
    success: &'a str,
    failure: &'a str,
    pending: &'a str,
}

#[derive(Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

#[derive(Deserialize)]
struct PaymentResponse {
    status: String,
    #[serde(default)]
    external_reference: Option<String>,
}

impl PaymentResponse {
    fn into_record(self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        let status = PaymentStatus::from_provider(&self.status).ok_or_else(|| {
            PaymentError::InvalidResponse(format!("unknown payment status '{}'", self.status))
        })?;
        let external_reference = self
            .external_reference
            .ok_or_else(|| PaymentError::InvalidResponse("missing external_reference".to_string()))?
            .parse()?;
        Ok(PaymentRecord {
            payment_id: payment_id.to_string(),
            external_reference,
            status,
        })
    }
}

impl MercadoPagoGateway {
    pub fn new(
        access_token: String,
        api_base: String,
        back_url: String,
    ) -> Result<Self, PaymentError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        Ok(Self {
            http_client,
            access_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            back_url,
        })
    }

    async fn rejected(response: reqwest::Response) -> PaymentError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|err| format!("unreadable body: {err}"));
        warn!(status, "mercado pago rejected request");
        PaymentError::Rejected { status, message }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PaymentLink, PaymentError> {
        let body = PreferenceBody {
            items: request
                .items
                .iter()
                .map(|item| ItemBody {
                    title: &item.title,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    currency_id: CURRENCY,
                })
                .collect(),
            external_reference: request.external_reference.to_string(),
            payer: PayerBody {
                email: &request.payer_email,
            },
            back_urls: BackUrls {
                success: &self.back_url,
                failure: &self.back_url,
                pending: &self.back_url,
            },
            auto_return: "approved",
        };

        let response = self
            .http_client
            .post(format!("{}/checkout/preferences", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let preference: PreferenceResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::InvalidResponse(err.to_string()))?;
        let init_point = preference
            .init_point
            .or(preference.sandbox_init_point)
            .ok_or_else(|| PaymentError::InvalidResponse("missing init_point".to_string()))?;

        info!(preference_id = %preference.id, reference = %request.external_reference, "payment preference created");
        Ok(PaymentLink {
            preference_id: preference.id,
            init_point,
        })
    }

    async fn refund(&self, payment_id: &str, amount: u64) -> Result<(), PaymentError> {
        let response = self
            .http_client
            .post(format!("{}/v1/payments/{payment_id}/refunds", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        info!(payment_id, amount, "refund issued");
        Ok(())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        let response = self
            .http_client
            .get(format!("{}/v1/payments/{payment_id}", self.api_base))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::UnknownPayment(payment_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::InvalidResponse(err.to_string()))?;
        payment.into_record(payment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::PaymentReference;

    #[test]
    fn payment_lookup_maps_reference_and_status() {
        let payment: PaymentResponse = serde_json::from_str(
            r#"{"id":1234,"status":"approved","external_reference":"booking:b-1","transaction_amount":90000}"#,
        )
        .expect("payload");
        let record = payment.into_record("1234").expect("record");
        assert_eq!(
            record.external_reference,
            PaymentReference::TourBooking("b-1".to_string())
        );
        assert_eq!(record.status, PaymentStatus::Approved);
    }

    #[test]
    fn payment_without_reference_is_invalid() {
        let payment: PaymentResponse =
            serde_json::from_str(r#"{"id":1,"status":"approved"}"#).expect("payload");
        assert!(matches!(
            payment.into_record("1"),
            Err(PaymentError::InvalidResponse(_))
        ));
    }
}
