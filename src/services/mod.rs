// Checkout-side services
pub mod checkout;
pub mod gateway;
pub mod normalize;
pub mod redirect;

// Landing-side services
pub mod reconcile;

// External collaborators
pub mod events_api;
