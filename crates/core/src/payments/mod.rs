//! Payments module - gateway checkouts, webhooks and the duplicate-payment guard.

mod payments_model;
mod payments_service;
mod payments_traits;


pub use payments_model::{
    Checkout, CheckoutRequest, CheckoutSession, CheckoutStatus, Gateway, GatewayCheckoutRequest,
    GatewayEvent, NewCheckout, PaymentNotice, PaymentOutcome, WebhookPayload,
};
pub use payments_service::PaymentService;
pub use payments_traits::{PaymentGatewayClient, PaymentRepositoryTrait, PaymentServiceTrait};
