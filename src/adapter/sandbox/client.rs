//! HTTP client for a remote paper-trading endpoint.
//!
//! Endpoints:
//! - `GET  /v1/price?venue=..&symbol=..`
//! - `GET  /v1/balance?venue=..`
//! - `POST /v1/orders`
//! - `POST /v1/withdrawals`

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::dto::{
    BalanceResponse, ErrorResponse, OrderRequest, OrderResponse, PriceResponse, WithdrawalRequest,
    WithdrawalResponse,
};
use crate::config::SandboxConfig;
use crate::domain::{Amount, Symbol, VenueId};
use crate::error::{GatewayError, Result};
use crate::port::{ExchangeGateway, OrderFill, OrderSide, Quote, WithdrawReceipt};

/// Sandbox gateway over HTTP + JSON.
pub struct SandboxClient {
    http: HttpClient,
    base_url: Url,
    api_key: Option<String>,
}

impl SandboxClient {
    /// Build a client from the `[sandbox]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &SandboxConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let http = HttpClient::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Exchange(format!("bad endpoint {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Exchange(format!("invalid response: {e}")))
    }
}

/// Translate a non-2xx response into a typed gateway error.
pub(crate) fn map_error(status: StatusCode, body: &str) -> GatewayError {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return GatewayError::Auth(parsed.text());
    }
    if parsed.error.as_deref() == Some("insufficient_funds") {
        return GatewayError::InsufficientFunds {
            required: parsed.required.unwrap_or(Decimal::ZERO),
            available: parsed.available.unwrap_or(Decimal::ZERO),
        };
    }
    let detail = if parsed.error.is_some() || parsed.message.is_some() {
        parsed.text()
    } else if body.is_empty() {
        "empty body".to_string()
    } else {
        body.chars().take(200).collect()
    };
    GatewayError::Exchange(format!("HTTP {}: {detail}", status.as_u16()))
}

#[async_trait]
impl ExchangeGateway for SandboxClient {
    async fn get_price(
        &self,
        venue: &VenueId,
        symbol: &Symbol,
    ) -> std::result::Result<Quote, GatewayError> {
        let url = self.endpoint("v1/price")?;
        let request = self
            .http
            .get(url)
            .query(&[("venue", venue.as_str()), ("symbol", symbol.as_str())]);
        let price: PriceResponse = self.send(request).await?;
        debug!(venue = %venue, symbol = %symbol, bid = %price.bid, ask = %price.ask, "Sandbox quote");
        Ok(Quote {
            bid: price.bid,
            ask: price.ask,
        })
    }

    async fn get_balance(&self, venue: &VenueId) -> std::result::Result<Amount, GatewayError> {
        let url = self.endpoint("v1/balance")?;
        let request = self.http.get(url).query(&[("venue", venue.as_str())]);
        let balance: BalanceResponse = self.send(request).await?;
        Ok(balance.balance)
    }

    async fn place_market_order(
        &self,
        venue: &VenueId,
        symbol: &Symbol,
        side: OrderSide,
        amount: Amount,
    ) -> std::result::Result<OrderFill, GatewayError> {
        let url = self.endpoint("v1/orders")?;
        let body = OrderRequest {
            venue: venue.as_str(),
            symbol: symbol.as_str(),
            side,
            order_type: "market",
            amount,
        };
        let fill: OrderResponse = self.send(self.http.post(url).json(&body)).await?;
        debug!(venue = %venue, side = %side, filled = %fill.filled_amount, price = %fill.avg_price, "Sandbox order filled");
        Ok(OrderFill {
            filled_amount: fill.filled_amount,
            avg_price: fill.avg_price,
            fee: fill.fee,
        })
    }

    async fn withdraw(
        &self,
        venue: &VenueId,
        currency: &str,
        amount: Amount,
        destination: &VenueId,
    ) -> std::result::Result<WithdrawReceipt, GatewayError> {
        let url = self.endpoint("v1/withdrawals")?;
        let body = WithdrawalRequest {
            venue: venue.as_str(),
            currency,
            amount,
            destination: destination.as_str(),
        };
        let receipt: WithdrawalResponse = self.send(self.http.post(url).json(&body)).await?;
        Ok(WithdrawReceipt { fee: receipt.fee })
    }

    fn name(&self) -> &'static str {
        "sandbox"
    }
}

impl std::fmt::Debug for SandboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = map_error(StatusCode::UNAUTHORIZED, r#"{"message": "bad key"}"#);
        assert_eq!(err, GatewayError::Auth("bad key".into()));
    }

    #[test]
    fn insufficient_funds_is_typed() {
        let err = map_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": "insufficient_funds", "required": "100", "available": "40"}"#,
        );
        assert_eq!(
            err,
            GatewayError::InsufficientFunds {
                required: Decimal::ONE_HUNDRED,
                available: Decimal::from(40),
            }
        );
    }

    #[test]
    fn other_statuses_are_exchange_errors() {
        let err = map_error(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
        assert_eq!(
            err,
            GatewayError::Exchange("HTTP 500: upstream exploded".into())
        );
        assert_eq!(err.kind(), "exchange");
    }

    #[test]
    fn endpoints_join_onto_base_path() {
        let client = SandboxClient::from_config(&SandboxConfig {
            base_url: "http://paper.local/api/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("v1/orders").unwrap().as_str(),
            "http://paper.local/api/v1/orders"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let client = SandboxClient::from_config(&SandboxConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_ms: 500,
            api_key: None,
        })
        .unwrap();
        let err = client
            .get_balance(&VenueId::from("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)), "{err:?}");
    }
}
