//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the engine's ports, so the endpoint tests can run them against stub platform and
//! chain implementations. Actix cannot register generic handlers through the attribute macros, so everything
//! except `health` is registered with `web::resource().to()` in [`crate::server`].
use actix_web::{get, web, HttpRequest, HttpResponse};
use log::*;
use pi_market_engine::{
    order_objects::CancellationOutcome,
    traits::{ChainVerifier, LedgerStore, PaymentPlatform},
    CheckoutApi,
    ReconciliationApi,
};

use crate::{
    config::ProxyConfig,
    data_objects::{
        ApprovePaymentRequest,
        CancelPaymentRequest,
        CompletePaymentRequest,
        IncompletePaymentNotification,
        JsonResponse,
    },
    errors::ServerError,
    helpers::{authenticated_user, get_remote_ip, WebhookValidator},
};

#[get("/health")]
pub async fn health() -> HttpResponse {
    trace!("💓️ Heartbeat check");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for the approve endpoint. The caller is the signed-in user committing to a platform payment.
pub async fn approve_payment<B, P, C>(
    req: HttpRequest,
    body: web::Json<ApprovePaymentRequest>,
    api: web::Data<ReconciliationApi<B, P, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    P: PaymentPlatform,
    C: ChainVerifier,
{
    let user_id = authenticated_user(&req)?;
    let payment_id = body.into_inner().payment_id;
    debug!("🛂️ POST /payments/approve for {payment_id} by {user_id}");
    let approval = api.approve_payment(&payment_id, &user_id).await?;
    if !approval.acknowledged {
        info!("🛂️ Payment {payment_id} approved locally; the platform acknowledgement will ride the next retry");
    }
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Approved the payment {payment_id}"))))
}

/// Route handler for the platform's completion callback.
pub async fn complete_payment<B, P, C>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, P, C>>,
    validator: web::Data<WebhookValidator>,
    proxy: web::Data<ProxyConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    P: PaymentPlatform,
    C: ChainVerifier,
{
    validator.check(&req, &body)?;
    log_webhook_peer(&req, &proxy, "complete");
    let request: CompletePaymentRequest =
        serde_json::from_slice(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let payment_id = request.payment_id;
    let message = match api.complete_payment(&payment_id, &request.txid).await? {
        Some(s) if s.newly_settled => format!("Completed the payment {payment_id}"),
        Some(_) => format!("Payment {payment_id} was already completed"),
        // Unknown payments are replay noise, not an error worth a platform retry storm.
        None => format!("No order is bound to payment {payment_id}. Nothing to do"),
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

/// Route handler for the platform's incomplete-payment callback: a payment it believes settled on-chain without
/// the gateway recording it.
pub async fn incomplete_payment<B, P, C>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, P, C>>,
    validator: web::Data<WebhookValidator>,
    proxy: web::Data<ProxyConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    P: PaymentPlatform,
    C: ChainVerifier,
{
    validator.check(&req, &body)?;
    log_webhook_peer(&req, &proxy, "incomplete");
    let notification: IncompletePaymentNotification =
        serde_json::from_slice(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let payment = notification.into_incomplete_payment()?;
    let payment_id = payment.payment_id.clone();
    api.reconcile_incomplete(payment).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Handled the incomplete payment {payment_id}"))))
}

/// Route handler for the platform's cancellation callback.
pub async fn cancel_payment<B, P, C>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, P, C>>,
    validator: web::Data<WebhookValidator>,
    proxy: web::Data<ProxyConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    P: PaymentPlatform,
    C: ChainVerifier,
{
    validator.check(&req, &body)?;
    log_webhook_peer(&req, &proxy, "cancelled_payment");
    let request: CancelPaymentRequest =
        serde_json::from_slice(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let payment_id = request.payment_id;
    let message = match api.cancel_payment(&payment_id).await? {
        CancellationOutcome::Cancelled(_) => format!("Cancelled the payment {payment_id}"),
        CancellationOutcome::AlreadyCancelled(_) => format!("Payment {payment_id} was already cancelled"),
        CancellationOutcome::UnknownPayment(_) => format!("No order is bound to payment {payment_id}. Nothing to do"),
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

/// Route handler for checkout. Converts the signed-in user's cart into a pending order and returns it.
pub async fn checkout<B>(req: HttpRequest, api: web::Data<CheckoutApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerStore {
    let user_id = authenticated_user(&req)?;
    debug!("🛒️ POST /cart/checkout by {user_id}");
    let order = api.checkout(&user_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

fn log_webhook_peer(req: &HttpRequest, proxy: &ProxyConfig, endpoint: &str) {
    let peer = get_remote_ip(req, proxy.use_x_forwarded_for, proxy.use_forwarded);
    debug!("🛰️ Platform callback on /payments/{endpoint} from {peer:?}");
}
