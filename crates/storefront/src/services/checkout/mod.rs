//! Checkout orchestration.
//!
//! A linear state machine over the cart:
//!
//! ```text
//! Address -> Review -> Payment -> (submit) -> Complete
//! ```
//!
//! Forward moves validate; backward moves never do. A successful submission
//! clears the current identity's cart and ends the machine. A failed one
//! records an error, stays on `Payment`, and leaves the cart alone.

mod error;

pub use error::{CheckoutError, ValidationError};

use std::future::Future;

use tracing::{info, instrument, warn};

use creamery_core::{Email, PaymentDetails, PaymentMethod};

use crate::models::{
    DeliveryAddress, OrderConfirmation, OrderItem, OrderRequest, UserProfile,
};
use crate::services::api::ApiError;
use crate::services::cart::CartStore;
use crate::services::identity::TokenClaims;

/// Where the buyer is in checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStep {
    Address,
    Review,
    Payment,
    /// Order placed; terminal.
    Complete,
}

impl CheckoutStep {
    /// Step heading shown to the buyer.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Address => "Delivery Address",
            Self::Review => "Order Summary",
            Self::Payment => "Payment",
            Self::Complete => "Order Placed",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::Address => Self::Review,
            Self::Review | Self::Payment => Self::Payment,
            Self::Complete => Self::Complete,
        }
    }

    const fn previous(self) -> Self {
        match self {
            Self::Address | Self::Review => Self::Address,
            Self::Payment => Self::Review,
            Self::Complete => Self::Complete,
        }
    }
}

/// Sends a finished order somewhere.
///
/// [`crate::services::ApiClient`] is the production implementation.
pub trait OrderSubmitter {
    /// Submit `order` and return the server's confirmation.
    fn submit_order(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderConfirmation, ApiError>> + Send;
}

/// The delivery form as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl DeliveryDetails {
    /// `(form name, value)` for every required field, in form order.
    fn required(&self) -> [(&'static str, &str); 8] {
        [
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("address", self.address.as_str()),
            ("city", self.city.as_str()),
            ("state", self.state.as_str()),
            ("pincode", self.pincode.as_str()),
        ]
    }

    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.required()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Check the form and build the address sent with the order.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingFields` if any required field is
    /// blank, otherwise `ValidationError::InvalidEmail` if the email does
    /// not parse.
    pub fn validate(&self) -> Result<DeliveryAddress, ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        let email = Email::parse(&self.email).map_err(ValidationError::InvalidEmail)?;

        Ok(DeliveryAddress {
            name: format!("{} {}", self.first_name.trim(), self.last_name.trim()),
            email: email.into_inner(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
        })
    }

    /// Fill blank fields from `profile`. Typed input is never overwritten.
    pub fn fill_from(&mut self, profile: &UserProfile) {
        let sources = [
            (&mut self.first_name, &profile.first_name),
            (&mut self.last_name, &profile.last_name),
            (&mut self.email, &profile.email),
            (&mut self.phone, &profile.phone),
            (&mut self.address, &profile.address),
            (&mut self.city, &profile.city),
            (&mut self.state, &profile.state),
            (&mut self.pincode, &profile.pincode),
        ];
        for (field, source) in sources {
            if field.trim().is_empty()
                && let Some(value) = source
            {
                field.clone_from(value);
            }
        }
    }
}

/// An error recorded against the step it happened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub step: CheckoutStep,
    pub message: String,
}

/// Checkout state machine for one buyer session.
#[derive(Debug)]
pub struct Checkout<S> {
    cart: CartStore,
    submitter: S,
    step: CheckoutStep,
    delivery: DeliveryDetails,
    payment_method: PaymentMethod,
    payment_details: PaymentDetails,
    last_error: Option<StepError>,
    confirmation: Option<OrderConfirmation>,
}

impl<S: OrderSubmitter> Checkout<S> {
    /// Start checkout at the address step.
    #[must_use]
    pub fn new(cart: CartStore, submitter: S) -> Self {
        Self {
            cart,
            submitter,
            step: CheckoutStep::Address,
            delivery: DeliveryDetails::default(),
            payment_method: PaymentMethod::default(),
            payment_details: PaymentDetails::default(),
            last_error: None,
            confirmation: None,
        }
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn delivery(&self) -> &DeliveryDetails {
        &self.delivery
    }

    pub const fn delivery_mut(&mut self) -> &mut DeliveryDetails {
        &mut self.delivery
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub const fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub const fn payment_details_mut(&mut self) -> &mut PaymentDetails {
        &mut self.payment_details
    }

    /// The most recent error, until dismissed or the step changes.
    #[must_use]
    pub const fn last_error(&self) -> Option<&StepError> {
        self.last_error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// The placed order, once `submit` has succeeded.
    #[must_use]
    pub const fn confirmation(&self) -> Option<&OrderConfirmation> {
        self.confirmation.as_ref()
    }

    /// Fill blank delivery fields.
    ///
    /// Sources in order: the freshly fetched profile, the profile cached at
    /// sign-in, then the email claim of the session token.
    pub fn prefill(&mut self, fetched: Option<&UserProfile>, claims: Option<&TokenClaims>) {
        if let Some(profile) = fetched {
            self.delivery.fill_from(profile);
        }
        if let Some(cached) = self.cart.identity().profile() {
            self.delivery.fill_from(&cached);
        }
        if self.delivery.email.trim().is_empty()
            && let Some(email) = claims.and_then(|c| c.email.as_ref())
        {
            self.delivery.email.clone_from(email);
        }
    }

    /// Move forward one step.
    ///
    /// At `Payment` this is a no-op; submission is separate.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` if the delivery form is
    /// incomplete, `CheckoutError::EmptyCart` if the cart has no visible
    /// items, or `CheckoutError::AlreadyComplete` after an order is placed.
    pub fn advance(&mut self) -> Result<CheckoutStep, CheckoutError> {
        match self.step {
            CheckoutStep::Complete => return Err(CheckoutError::AlreadyComplete),
            CheckoutStep::Payment => return Ok(CheckoutStep::Payment),
            CheckoutStep::Address => {
                if let Err(e) = self.delivery.validate() {
                    return Err(self.record(e.into()));
                }
                self.ensure_cart()?;
            }
            CheckoutStep::Review => self.ensure_cart()?,
        }
        self.move_to(self.step.next());
        Ok(self.step)
    }

    /// Move back one step. Never validates; stays put at `Address`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadyComplete` after an order is placed.
    pub fn back(&mut self) -> Result<CheckoutStep, CheckoutError> {
        if self.step == CheckoutStep::Complete {
            return Err(CheckoutError::AlreadyComplete);
        }
        self.move_to(self.step.previous());
        Ok(self.step)
    }

    /// Place the order.
    ///
    /// On success the current identity's cart is cleared and checkout is
    /// complete. On failure the error is recorded and nothing else changes.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotAtPayment` before the payment step,
    /// `CheckoutError::Unauthenticated` for an anonymous session,
    /// `CheckoutError::EmptyCart`, `CheckoutError::Validation` if the
    /// delivery form was emptied since, or `CheckoutError::Submission` if
    /// the API rejected the order.
    #[instrument(skip_all)]
    pub async fn submit(&mut self) -> Result<OrderConfirmation, CheckoutError> {
        match self.step {
            CheckoutStep::Payment => {}
            CheckoutStep::Complete => return Err(CheckoutError::AlreadyComplete),
            other => return Err(CheckoutError::NotAtPayment(other)),
        }

        let snapshot = self.cart.snapshot();
        let Some(user_id) = snapshot.owner.clone() else {
            return Err(self.record(CheckoutError::Unauthenticated));
        };
        if snapshot.is_empty() {
            return Err(self.record(CheckoutError::EmptyCart));
        }
        let delivery_address = match self.delivery.validate() {
            Ok(address) => address,
            Err(e) => return Err(self.record(e.into())),
        };

        let order = OrderRequest {
            user_id,
            items: snapshot.items.iter().map(OrderItem::from).collect(),
            total: snapshot.total,
            delivery_address,
            payment_method: self.payment_method,
            payment_details: self.payment_details.for_method(self.payment_method),
        };

        match self.submitter.submit_order(&order).await {
            Ok(confirmation) => {
                info!(
                    order_id = %confirmation.id,
                    user_id = %order.user_id,
                    total = %order.total,
                    payment_method = order.payment_method.code(),
                    "Order placed"
                );
                self.cart.clear();
                self.last_error = None;
                self.step = CheckoutStep::Complete;
                self.confirmation = Some(confirmation.clone());
                Ok(confirmation)
            }
            Err(e) => Err(self.record(CheckoutError::Submission(e))),
        }
    }

    fn ensure_cart(&mut self) -> Result<(), CheckoutError> {
        if self.cart.visible_items().is_empty() {
            return Err(self.record(CheckoutError::EmptyCart));
        }
        Ok(())
    }

    fn move_to(&mut self, step: CheckoutStep) {
        if step != self.step {
            self.last_error = None;
        }
        self.step = step;
    }

    fn record(&mut self, error: CheckoutError) -> CheckoutError {
        warn!(step = self.step.label(), error = %error, "Checkout step failed");
        self.last_error = Some(StepError {
            step: self.step,
            message: error.user_message(),
        });
        error
    }
}
